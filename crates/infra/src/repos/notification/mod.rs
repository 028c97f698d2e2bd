mod inmemory;
mod postgres;

pub use inmemory::InMemoryNotificationRepo;
use planner_notify_domain::{Notification, SendState, ID};
pub use postgres::PostgresNotificationRepo;

/// The notification ledger. Source of truth for the send state of every task reminder.
#[async_trait::async_trait]
pub trait INotificationRepo: Send + Sync {
    async fn insert(&self, notification: &Notification) -> anyhow::Result<()>;
    async fn find(&self, notification_id: &ID) -> anyhow::Result<Option<Notification>>;
    /// Notifications for which a reminder should be sent at `now`
    async fn find_due(&self, now: i64) -> anyhow::Result<Vec<Notification>>;
    /// Notifications whose due reminder has been sent and that have a
    /// recurring pattern other than `onetime` or empty
    async fn find_recurring_sent(&self) -> anyhow::Result<Vec<Notification>>;
    /// Moves the notification from `expected` to `next`. Returns `false` when
    /// the row was not in the `expected` state anymore.
    async fn update_send_state(
        &self,
        notification_id: &ID,
        expected: SendState,
        next: SendState,
    ) -> anyhow::Result<bool>;
    /// Starts a transaction scoped to a single candidate of a recurrence pass
    async fn begin(&self) -> anyhow::Result<Box<dyn ILedgerTransaction>>;
}

/// Writes staged inside a ledger transaction are only visible after `commit`
#[async_trait::async_trait]
pub trait ILedgerTransaction: Send {
    /// Persists `due_date`, `before_due_date` and `is_send` of the given notification
    async fn reschedule(&mut self, notification: &Notification) -> anyhow::Result<()>;
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}
