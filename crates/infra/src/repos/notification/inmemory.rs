use super::{ILedgerTransaction, INotificationRepo};
use crate::repos::shared::inmemory_repo::*;
use planner_notify_domain::{Notification, SendState, ID};
use std::sync::{Arc, Mutex};

pub struct InMemoryNotificationRepo {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationRepo {
    pub fn new() -> Self {
        Self {
            notifications: Arc::new(Mutex::new(vec![])),
        }
    }
}

#[async_trait::async_trait]
impl INotificationRepo for InMemoryNotificationRepo {
    async fn insert(&self, notification: &Notification) -> anyhow::Result<()> {
        insert(notification, &self.notifications);
        Ok(())
    }

    async fn find(&self, notification_id: &ID) -> anyhow::Result<Option<Notification>> {
        Ok(find(notification_id, &self.notifications))
    }

    async fn find_due(&self, now: i64) -> anyhow::Result<Vec<Notification>> {
        Ok(find_by(&self.notifications, |n| match n.is_send {
            SendState::Pending => match n.before_due_date {
                Some(before_due_date) => before_due_date <= now,
                None => n.due_date <= now,
            },
            SendState::BeforeDueSent => n.due_date <= now,
            SendState::DueSent => false,
        }))
    }

    async fn find_recurring_sent(&self) -> anyhow::Result<Vec<Notification>> {
        Ok(find_by(&self.notifications, |n| {
            n.is_send == SendState::DueSent
                && n.recurring_pattern != "onetime"
                && !n.recurring_pattern.is_empty()
        }))
    }

    async fn update_send_state(
        &self,
        notification_id: &ID,
        expected: SendState,
        next: SendState,
    ) -> anyhow::Result<bool> {
        let updated = update_many(
            &self.notifications,
            |n| n.id == *notification_id && n.is_send == expected,
            |n| n.is_send = next,
        );
        Ok(updated > 0)
    }

    async fn begin(&self) -> anyhow::Result<Box<dyn ILedgerTransaction>> {
        Ok(Box::new(InMemoryLedgerTransaction {
            notifications: self.notifications.clone(),
            staged: Vec::new(),
        }))
    }
}

/// Buffers writes until commit
pub struct InMemoryLedgerTransaction {
    notifications: Arc<Mutex<Vec<Notification>>>,
    staged: Vec<Notification>,
}

#[async_trait::async_trait]
impl ILedgerTransaction for InMemoryLedgerTransaction {
    async fn reschedule(&mut self, notification: &Notification) -> anyhow::Result<()> {
        self.staged.push(notification.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        for staged in &self.staged {
            update_many(
                &self.notifications,
                |n| n.id == staged.id,
                |n| {
                    n.due_date = staged.due_date;
                    n.before_due_date = staged.before_due_date;
                    n.is_send = staged.is_send;
                },
            );
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}
