use crate::{
    error::{NotifyError, PassError},
    projection_writer::ProjectionWriter,
    resolver::{resolve_recipients, PassCache},
    shared::{
        candidate_limit::within_limit,
        summary::{CandidateOutcome, SummaryAccumulator},
        usecase::{Subscriber, UseCase},
        worker_pool::WorkerPool,
    },
};
use planner_notify_domain::{Notification, ProjectionTarget, ProjectionUpdate, RunSummary};
use planner_notify_infra::NotifyContext;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn};
use tracing_futures::Instrument;

/// Moves recurring notifications whose due reminder has been sent to their
/// next occurrence
#[derive(Debug)]
pub struct AdvanceRecurringNotificationsUseCase {
    /// No candidate is started after this instant
    pub deadline: Instant,
}

#[async_trait::async_trait]
impl UseCase for AdvanceRecurringNotificationsUseCase {
    type Response = RunSummary;
    type Errors = PassError;

    async fn execute(&mut self, ctx: &NotifyContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let candidates = ctx
            .repos
            .notifications
            .find_recurring_sent()
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
                let span = info_span!("Advancing notification", notification_id = %notification.id);
                async move {
                    // An abandoned candidate drops its uncommitted transaction
                    let res = within_limit(
                        &notification.id,
                        limit,
                        advance_candidate(&notification, &ctx, &cache, &writer),
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
                "Recurrence pass deadline reached, {} notifications left for the next pass",
                report.not_started
            );
        }
        stats.add_skipped(report.not_started);

        Ok(stats.summary())
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(LogRecurrenceSummary)]
    }
}

pub struct LogRecurrenceSummary;

#[async_trait::async_trait]
impl Subscriber<AdvanceRecurringNotificationsUseCase> for LogRecurrenceSummary {
    async fn notify(&self, summary: &RunSummary, _ctx: &NotifyContext) {
        info!(
            total = summary.total,
            success = summary.success,
            error = summary.error,
            skipped = summary.skipped,
            ran_at = summary.ran_at,
            "Recurrence pass finished"
        );
    }
}

/// Reschedules one notification. The ledger write is only committed once the
/// projection reset has been written, so a failure of either leaves both
/// at the previous occurrence.
async fn advance_candidate(
    notification: &Notification,
    ctx: &NotifyContext,
    cache: &PassCache,
    writer: &ProjectionWriter,
) -> Result<CandidateOutcome, NotifyError> {
    let occurrence = match notification.next_occurrence() {
        Ok(Some(occurrence)) => occurrence,
        Ok(None) => return Ok(CandidateOutcome::Skipped),
        Err(source) => {
            return Err(NotifyError::UnsupportedPattern {
                notification_id: notification.id.clone(),
                source,
            })
        }
    };
    let recipients = resolve_recipients(notification, ctx, cache).await?;

    let ledger_error = |message: String| NotifyError::LedgerUpdate {
        notification_id: notification.id.clone(),
        message,
    };
    let mut rescheduled = notification.clone();
    rescheduled.reschedule(occurrence);

    let mut tx = ctx
        .repos
        .notifications
        .begin()
        .await
        .map_err(|e| ledger_error(e.to_string()))?;
    if let Err(e) = tx.reschedule(&rescheduled).await {
        if let Err(e) = tx.rollback().await {
            error!(notification_id = %notification.id, "Rollback failed: {:?}", e);
        }
        return Err(ledger_error(e.to_string()));
    }

    let update = ProjectionUpdate::Rescheduled {
        occurrence,
        target: ProjectionTarget::for_audience(&recipients.audience),
    };
    if let Err(e) = writer.write(&recipients.path, &update).await {
        if let Err(e) = tx.rollback().await {
            error!(notification_id = %notification.id, "Rollback failed: {:?}", e);
        }
        return Err(e);
    }

    tx.commit().await.map_err(|e| {
        error!(
            notification_id = %notification.id,
            "Projection was reset but the ledger commit failed: {:?}", e
        );
        ledger_error(e.to_string())
    })?;

    Ok(CandidateOutcome::Completed)
}
