use super::{IPushGateway, PushError};
use planner_notify_domain::{MulticastReport, PushMessage};
use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex, PoisonError,
};
use std::time::Duration;

/// A call that delivered to at least one token, with the tokens it reached
#[derive(Debug, Clone, PartialEq)]
pub struct SentPush {
    pub tokens: Vec<String>,
    pub message: PushMessage,
}

/// Records every call instead of delivering it. Tracks how many calls are in
/// flight at the same time so that concurrency limits can be asserted.
pub struct InMemoryPushGateway {
    sent: Mutex<Vec<SentPush>>,
    latency: Duration,
    failing: AtomicBool,
    rejected_tokens: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryPushGateway {
    pub fn new() -> Self {
        Self::with_latency(Duration::from_millis(0))
    }

    /// Every call takes at least `latency` before it returns
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            sent: Mutex::new(vec![]),
            latency,
            failing: AtomicBool::new(false),
            rejected_tokens: Mutex::new(HashSet::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Makes every following call fail with a transport error until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every following message to `token` is rejected, like an unregistered device
    pub fn reject_token(&self, token: &str) {
        self.rejected_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string());
    }

    pub fn sent(&self) -> Vec<SentPush> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Delivers to every token that is not rejected and reports how many were
    async fn call(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let res = if self.failing.load(Ordering::SeqCst) {
            Err(PushError::Transport("gateway unavailable".into()))
        } else {
            let delivered = {
                let rejected = self
                    .rejected_tokens
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                tokens
                    .iter()
                    .filter(|token| !rejected.contains(*token))
                    .cloned()
                    .collect::<Vec<_>>()
            };
            let report = MulticastReport {
                success_count: delivered.len(),
                failure_count: tokens.len() - delivered.len(),
            };
            if !delivered.is_empty() {
                self.sent
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(SentPush {
                        tokens: delivered,
                        message: message.clone(),
                    });
            }
            Ok(report)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }
}

#[async_trait::async_trait]
impl IPushGateway for InMemoryPushGateway {
    async fn send_one(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        let report = self.call(&[token.to_string()], message).await?;
        if report.success_count == 0 {
            return Err(PushError::Rejected {
                status: 404,
                message: "Requested entity was not found.".into(),
            });
        }
        Ok(())
    }

    async fn send_many(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushError> {
        self.call(tokens, message).await
    }
}
