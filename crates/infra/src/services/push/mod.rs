mod fcm;
mod inmemory;

pub use fcm::FcmPushGateway;
use futures::{stream, StreamExt};
pub use inmemory::{InMemoryPushGateway, SentPush};
use planner_notify_domain::{MulticastReport, PushMessage};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PushError {
    #[error("Push gateway transport error: {0}")]
    Transport(String),
    #[error("Push gateway rejected the message with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Push messaging provider. Delivery is best effort per target and may
/// happen more than once; retries are left to the caller's next pass.
#[async_trait::async_trait]
pub trait IPushGateway: Send + Sync {
    async fn send_one(&self, token: &str, message: &PushMessage) -> Result<(), PushError>;
    /// Failing targets are reported in the `MulticastReport`. Only a transport
    /// failure reaching none of the targets is an error.
    async fn send_many(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushError>;
}

/// Calls `send` once per token with at most `limit` calls outstanding and
/// folds the outcomes into a `MulticastReport`
pub async fn fan_out<'a, F, Fut>(
    tokens: &'a [String],
    limit: usize,
    send: F,
) -> Result<MulticastReport, PushError>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<(), PushError>>,
{
    let calls: Vec<Fut> = tokens.iter().map(|token| send(token.as_str())).collect();
    let results = stream::iter(calls)
        .buffer_unordered(std::cmp::max(limit, 1))
        .collect::<Vec<_>>()
        .await;

    let mut report = MulticastReport::default();
    let mut transport_error = None;
    for result in results {
        match result {
            Ok(()) => report.success_count += 1,
            Err(e) => {
                report.failure_count += 1;
                if let PushError::Transport(_) = e {
                    transport_error = Some(e);
                }
            }
        }
    }

    match transport_error {
        Some(e) if report.success_count == 0 => Err(e),
        _ => Ok(report),
    }
}
