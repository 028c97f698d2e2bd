use super::summary::CandidateOutcome;
use crate::error::NotifyError;
use planner_notify_domain::ID;
use std::{future::Future, time::Duration};

/// Runs the pipeline of one candidate, abandoning it once `limit` has passed
pub async fn within_limit<F>(
    notification_id: &ID,
    limit: Duration,
    pipeline: F,
) -> Result<CandidateOutcome, NotifyError>
where
    F: Future<Output = Result<CandidateOutcome, NotifyError>>,
{
    match tokio::time::timeout(limit, pipeline).await {
        Ok(res) => res,
        Err(_) => Err(NotifyError::CandidateTimeout {
            notification_id: notification_id.clone(),
            limit,
        }),
    }
}
