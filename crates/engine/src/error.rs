use crate::shared::pass_lock::PassKind;
use planner_notify_domain::{InvalidPatternError, ID};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single candidate. Never aborts the pass it happened in.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Unable to resolve the recipients of task {task_id}. Error message: `{message}`")]
    TransientResolution { task_id: ID, message: String },
    #[error("No push token found for any recipient of task {task_id}")]
    NoRecipients { task_id: ID },
    #[error("Push gateway failed for notification {notification_id}. Error message: `{message}`")]
    GatewaySend { notification_id: ID, message: String },
    #[error("Ledger update failed for notification {notification_id}. Error message: `{message}`")]
    LedgerUpdate { notification_id: ID, message: String },
    #[error("Projection write to {path} failed. Error message: `{message}`")]
    ProjectionWrite { path: String, message: String },
    #[error("Notification {notification_id} has an unusable recurring pattern: {source}")]
    UnsupportedPattern {
        notification_id: ID,
        source: InvalidPatternError,
    },
    #[error("Notification {notification_id} was abandoned after {limit:?}")]
    CandidateTimeout { notification_id: ID, limit: Duration },
}

impl NotifyError {
    /// A candidate without any reachable recipient is left for a later pass
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NoRecipients { .. })
    }
}

/// Failure of a whole pass, returned to whoever triggered it
#[derive(Error, Debug, PartialEq)]
pub enum PassError {
    #[error("The notification ledger could not be queried. Error message: `{0}`")]
    LedgerUnavailable(String),
    #[error("A {0} pass is already running")]
    AlreadyRunning(PassKind),
}
