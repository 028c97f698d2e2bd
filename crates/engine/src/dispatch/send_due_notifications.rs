use crate::{
    error::{NotifyError, PassError},
    projection_writer::ProjectionWriter,
    resolver::{resolve_recipients, resolve_tokens, PassCache},
    shared::{
        candidate_limit::within_limit,
        summary::{CandidateOutcome, SummaryAccumulator},
        usecase::{Subscriber, UseCase},
        worker_pool::WorkerPool,
    },
};
use planner_notify_domain::{
    Notification, ProjectionTarget, ProjectionUpdate, PushMessage, RunSummary,
};
use planner_notify_infra::NotifyContext;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn};
use tracing_futures::Instrument;

/// Sends the reminders that are due and advances the ledger accordingly
#[derive(Debug)]
pub struct SendDueNotificationsUseCase {
    /// No candidate is started after this instant
    pub deadline: Instant,
}

#[async_trait::async_trait]
impl UseCase for SendDueNotificationsUseCase {
    type Response = RunSummary;
    type Errors = PassError;

    async fn execute(&mut self, ctx: &NotifyContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let candidates = ctx
            .repos
            .notifications
            .find_due(now)
            .await
            .map_err(|e| PassError::LedgerUnavailable(e.to_string()))?;

        let stats = Arc::new(SummaryAccumulator::new(candidates.len(), now));
        let cache = Arc::new(PassCache::new());
        let writer = Arc::new(ProjectionWriter::new(ctx));
        let pool = WorkerPool::new(ctx.config.worker_pool_size, ctx.config.worker_queue_capacity);
        let limit = ctx.config.candidate_timeout;

        let report = {
            let ctx = ctx.clone();
            let stats = stats.clone();
            pool.run(candidates, self.deadline, move |notification: Notification| {
                let ctx = ctx.clone();
                let stats = stats.clone();
                let cache = cache.clone();
                let writer = writer.clone();
                let span = info_span!("Dispatching notification", notification_id = %notification.id);
                async move {
                    let res = within_limit(
                        &notification.id,
                        limit,
                        dispatch_candidate(&notification, now, &ctx, &cache, &writer),
                    )
                    .await;
                    stats.record(&notification.id, res);
                }
                .instrument(span)
            })
            .await
        };
        if report.not_started > 0 {
            warn!(
                "Dispatch pass deadline reached, {} notifications left for the next pass",
                report.not_started
            );
        }
        stats.add_skipped(report.not_started);

        Ok(stats.summary())
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(LogDispatchSummary)]
    }
}

/// Emits the structured log line of a finished pass
pub struct LogDispatchSummary;

#[async_trait::async_trait]
impl Subscriber<SendDueNotificationsUseCase> for LogDispatchSummary {
    async fn notify(&self, summary: &RunSummary, _ctx: &NotifyContext) {
        info!(
            total = summary.total,
            success = summary.success,
            error = summary.error,
            skipped = summary.skipped,
            ran_at = summary.ran_at,
            "Dispatch pass finished"
        );
    }
}

async fn dispatch_candidate(
    notification: &Notification,
    now: i64,
    ctx: &NotifyContext,
    cache: &PassCache,
    writer: &ProjectionWriter,
) -> Result<CandidateOutcome, NotifyError> {
    let transition = match notification.next_transition(now) {
        Some(transition) => transition,
        None => return Ok(CandidateOutcome::Skipped),
    };

    let recipients = resolve_recipients(notification, ctx, cache).await?;
    let resolved = resolve_tokens(&recipients.audience.recipients(), ctx).await;
    if resolved.tokens.is_empty() {
        if resolved.failed_reads > 0 {
            return Err(NotifyError::TransientResolution {
                task_id: notification.task_id.clone(),
                message: format!("{} push token reads failed", resolved.failed_reads),
            });
        }
        return Err(NotifyError::NoRecipients {
            task_id: notification.task_id.clone(),
        });
    }
    let tokens = resolved.tokens;

    let message = PushMessage::for_transition(transition, &recipients.task, notification);
    let gateway_error = |message: String| NotifyError::GatewaySend {
        notification_id: notification.id.clone(),
        message,
    };
    if tokens.len() == 1 {
        ctx.push
            .send_one(&tokens[0], &message)
            .await
            .map_err(|e| gateway_error(e.to_string()))?;
    } else {
        let report = ctx
            .push
            .send_many(&tokens, &message)
            .await
            .map_err(|e| gateway_error(e.to_string()))?;
        if report.success_count == 0 {
            return Err(gateway_error(format!(
                "All {} targets were rejected",
                report.failure_count
            )));
        }
        if report.failure_count > 0 {
            warn!(
                notification_id = %notification.id,
                "{} of {} push targets failed",
                report.failure_count,
                tokens.len()
            );
        }
    }

    let next_state = transition.next_state();
    let updated = ctx
        .repos
        .notifications
        .update_send_state(&notification.id, notification.is_send, next_state)
        .await
        .map_err(|e| {
            error!(
                notification_id = %notification.id,
                "Reminder was sent but the ledger was not updated, it will be sent again: {:?}", e
            );
            NotifyError::LedgerUpdate {
                notification_id: notification.id.clone(),
                message: e.to_string(),
            }
        })?;
    if !updated {
        warn!(
            notification_id = %notification.id,
            "Notification changed while its reminder was sent, leaving it as is"
        );
        return Ok(CandidateOutcome::Skipped);
    }

    let update = ProjectionUpdate::Reminded {
        transition,
        target: ProjectionTarget::for_audience(&recipients.audience),
    };
    if let Err(e) = writer.write(&recipients.path, &update).await {
        // The ledger is the source of truth, the mirror catches up on the next change
        warn!(notification_id = %notification.id, "{}", e);
    }

    Ok(CandidateOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::usecase::execute;
    use planner_notify_domain::{RecurringPattern, SendState, Task, User};
    use planner_notify_infra::{token_document_path, ISys, InMemoryPushGateway};
    use serde_json::json;
    use std::time::Duration;

    struct StaticTimeSys(i64);
    impl ISys for StaticTimeSys {
        fn get_timestamp_millis(&self) -> i64 {
            self.0
        }
    }

    const NOW: i64 = 1_700_000_000_000;
    const MINUTE: i64 = 1000 * 60;

    struct TestContext {
        ctx: NotifyContext,
        push: Arc<InMemoryPushGateway>,
    }

    fn setup() -> TestContext {
        let mut ctx = NotifyContext::create_inmemory();
        let push = Arc::new(InMemoryPushGateway::new());
        ctx.push = push.clone();
        ctx.sys = Arc::new(StaticTimeSys(NOW));
        TestContext { ctx, push }
    }

    async fn personal_task(ctx: &NotifyContext, token: Option<&str>) -> Task {
        let owner = User::new("owner@example.com", "Owner");
        ctx.repos.users.insert(&owner).await.unwrap();
        if let Some(token) = token {
            let doc = match json!({ "token": token }) {
                serde_json::Value::Object(map) => map,
                _ => unreachable!(),
            };
            ctx.documents
                .merge_set(&token_document_path(&owner.id), doc)
                .await
                .unwrap();
        }
        let task = Task::personal("Pay rent", owner.id);
        ctx.repos.tasks.insert(&task).await.unwrap();
        task
    }

    fn usecase() -> SendDueNotificationsUseCase {
        SendDueNotificationsUseCase {
            deadline: Instant::now() + Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn sends_due_reminder_once() {
        let TestContext { ctx, push } = setup();
        let task = personal_task(&ctx, Some("device")).await;
        let notification =
            Notification::new(task.id.clone(), NOW - MINUTE, None, RecurringPattern::OneTime, 0)
                .unwrap();
        ctx.repos.notifications.insert(&notification).await.unwrap();

        let summary = execute(usecase(), &ctx).await.unwrap();
        assert_eq!((summary.total, summary.success), (1, 1));
        assert_eq!(push.sent().len(), 1);
        assert_eq!(push.sent()[0].message.title, "Task due");

        let stored = ctx.repos.notifications.find(&notification.id).await.unwrap().unwrap();
        assert_eq!(stored.is_send, SendState::DueSent);

        let summary = execute(usecase(), &ctx).await.unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(push.sent().len(), 1);
    }

    #[tokio::test]
    async fn missing_token_skips_without_state_change() {
        let TestContext { ctx, push } = setup();
        let task = personal_task(&ctx, None).await;
        let notification =
            Notification::new(task.id.clone(), NOW - MINUTE, None, RecurringPattern::OneTime, 0)
                .unwrap();
        ctx.repos.notifications.insert(&notification).await.unwrap();

        let summary = execute(usecase(), &ctx).await.unwrap();
        assert_eq!((summary.skipped, summary.error), (1, 0));
        assert!(push.sent().is_empty());
        let stored = ctx.repos.notifications.find(&notification.id).await.unwrap().unwrap();
        assert_eq!(stored.is_send, SendState::Pending);
    }

    #[tokio::test]
    async fn gateway_failure_is_an_error_without_state_change() {
        let TestContext { ctx, push } = setup();
        push.set_failing(true);
        let task = personal_task(&ctx, Some("device")).await;
        let notification =
            Notification::new(task.id.clone(), NOW - MINUTE, None, RecurringPattern::OneTime, 0)
                .unwrap();
        ctx.repos.notifications.insert(&notification).await.unwrap();

        let summary = execute(usecase(), &ctx).await.unwrap();
        assert_eq!((summary.success, summary.error), (0, 1));
        let stored = ctx.repos.notifications.find(&notification.id).await.unwrap().unwrap();
        assert_eq!(stored.is_send, SendState::Pending);
    }

    #[tokio::test]
    async fn expired_deadline_skips_every_candidate() {
        let TestContext { ctx, push } = setup();
        let task = personal_task(&ctx, Some("device")).await;
        let notification =
            Notification::new(task.id.clone(), NOW - MINUTE, None, RecurringPattern::OneTime, 0)
                .unwrap();
        ctx.repos.notifications.insert(&notification).await.unwrap();

        let summary = execute(
            SendDueNotificationsUseCase {
                deadline: Instant::now(),
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!((summary.total, summary.skipped), (1, 1));
        assert!(push.sent().is_empty());
    }
}
