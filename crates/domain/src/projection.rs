use crate::{
    audience::{Audience, ProjectionShape},
    date::format_timestamp,
    notification::{Occurrence, SendState, Transition},
    shared::entity::ID,
};
use serde::Serialize;
use std::{collections::BTreeMap, fmt::Display};

/// Location of the projection document in the document mirror
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectionPath {
    /// `Notifications/{ownerEmail}/Tasks/{taskId}`
    Personal { owner_email: String, task_id: ID },
    /// `BoardTasks/{taskId}/Notifications/{notificationId}`
    Group { task_id: ID, notification_id: ID },
}

impl Display for ProjectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Personal {
                owner_email,
                task_id,
            } => write!(f, "Notifications/{}/Tasks/{}", owner_email, task_id),
            Self::Group {
                task_id,
                notification_id,
            } => write!(f, "BoardTasks/{}/Notifications/{}", task_id, notification_id),
        }
    }
}

/// Whose visibility flags an update touches
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionTarget {
    /// Scalar flags on a personal document
    Owner,
    /// Per member flags on a shared document
    Members(Vec<ID>),
}

impl ProjectionTarget {
    pub fn for_audience(audience: &Audience) -> Self {
        match audience.shape() {
            ProjectionShape::Personal => Self::Owner,
            ProjectionShape::Group => Self::Members(audience.recipients()),
        }
    }
}

/// The exact set of fields a pass merges into a projection document
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionUpdate {
    /// A reminder was sent and the ledger advanced to the transition's state
    Reminded {
        transition: Transition,
        target: ProjectionTarget,
    },
    /// A recurring notification was moved to its next occurrence
    Rescheduled {
        occurrence: Occurrence,
        target: ProjectionTarget,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityFlags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_show: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_noti_remind_show: Option<bool>,
}

/// Serialized form of a `ProjectionUpdate`. Absent fields are left untouched
/// by the merge write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionFields {
    pub is_send: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// `Some(None)` clears the field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_due_date: Option<Option<String>>,
    #[serde(flatten)]
    pub flags: Option<VisibilityFlags>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub members: BTreeMap<String, VisibilityFlags>,
}

impl ProjectionUpdate {
    pub fn fields(&self) -> ProjectionFields {
        match self {
            Self::Reminded { transition, target } => {
                let flags = match transition {
                    Transition::BeforeDue => VisibilityFlags {
                        is_show: None,
                        is_noti_remind_show: Some(true),
                    },
                    Transition::Due => VisibilityFlags {
                        is_show: Some(true),
                        is_noti_remind_show: None,
                    },
                };
                Self::with_flags(transition.next_state(), None, None, flags, target)
            }
            Self::Rescheduled { occurrence, target } => {
                let flags = VisibilityFlags {
                    is_show: Some(false),
                    is_noti_remind_show: Some(false),
                };
                Self::with_flags(
                    SendState::Pending,
                    format_timestamp(occurrence.due_date),
                    Some(occurrence.before_due_date.and_then(format_timestamp)),
                    flags,
                    target,
                )
            }
        }
    }

    fn with_flags(
        is_send: SendState,
        due_date: Option<String>,
        before_due_date: Option<Option<String>>,
        flags: VisibilityFlags,
        target: &ProjectionTarget,
    ) -> ProjectionFields {
        match target {
            ProjectionTarget::Owner => ProjectionFields {
                is_send: is_send.as_i16(),
                due_date,
                before_due_date,
                flags: Some(flags),
                members: BTreeMap::new(),
            },
            ProjectionTarget::Members(members) => ProjectionFields {
                is_send: is_send.as_i16(),
                due_date,
                before_due_date,
                flags: None,
                members: members
                    .iter()
                    .map(|m| (m.as_string(), flags.clone()))
                    .collect(),
            },
        }
    }

    /// Field map handed to the document mirror's merge write
    pub fn to_document(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self.fields()) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}
