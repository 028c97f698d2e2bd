use crate::{notification::Notification, notification::Transition, task::Task};
use serde::Serialize;
use std::collections::BTreeMap;

/// Content of a push notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn for_transition(transition: Transition, task: &Task, notification: &Notification) -> Self {
        let (title, body) = match transition {
            Transition::BeforeDue => ("Upcoming task", format!("{} is due soon", task.title)),
            Transition::Due => ("Task due", format!("{} is due now", task.title)),
        };
        let mut data = BTreeMap::new();
        data.insert("taskId".to_string(), task.id.as_string());
        data.insert("notificationId".to_string(), notification.id.as_string());
        data.insert("kind".to_string(), transition.kind().to_string());

        Self {
            title: title.to_string(),
            body,
            data,
        }
    }
}

/// Per target outcome of a multicast send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MulticastReport {
    pub success_count: usize,
    pub failure_count: usize,
}
