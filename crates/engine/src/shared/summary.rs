use crate::error::NotifyError;
use planner_notify_domain::{RunSummary, ID};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// What happened to a candidate that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    Completed,
    /// Nothing to do for this candidate in this pass
    Skipped,
}

/// Counters of a pass, shared by its workers
#[derive(Debug)]
pub struct SummaryAccumulator {
    summary: Mutex<RunSummary>,
}

impl SummaryAccumulator {
    pub fn new(total: usize, ran_at: i64) -> Self {
        Self {
            summary: Mutex::new(RunSummary {
                total,
                ran_at,
                ..Default::default()
            }),
        }
    }

    pub fn record(&self, notification_id: &ID, res: Result<CandidateOutcome, NotifyError>) {
        let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        match res {
            Ok(CandidateOutcome::Completed) => summary.success += 1,
            Ok(CandidateOutcome::Skipped) => summary.skipped += 1,
            Err(e) if e.is_skip() => {
                info!(notification_id = %notification_id, "Skipping notification: {}", e);
                summary.skipped += 1;
            }
            Err(e) => {
                warn!(notification_id = %notification_id, "Notification failed: {}", e);
                summary.error += 1;
            }
        }
    }

    /// Candidates that were never started because the pass ran out of time
    pub fn add_skipped(&self, count: usize) {
        let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        summary.skipped += count;
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
