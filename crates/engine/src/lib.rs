mod dispatch;
mod error;
mod job_schedulers;
mod projection_writer;
mod recurrence;
mod resolver;
mod shared;

use dispatch::send_due_notifications::SendDueNotificationsUseCase;
pub use error::{NotifyError, PassError};
use job_schedulers::{start_dispatch_job, start_recurrence_job};
use planner_notify_domain::RunSummary;
use planner_notify_infra::NotifyContext;
use recurrence::advance_recurring_notifications::AdvanceRecurringNotificationsUseCase;
pub use resolver::{resolve_recipients, resolve_tokens, PassCache, Recipients, ResolvedTokens};
use shared::pass_lock::PassLock;
pub use shared::pass_lock::PassKind;
use shared::usecase::execute;
pub use shared::worker_pool::{PoolReport, WorkerPool};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

/// Owns the context and the pass locks. Cloning shares both, so every clone
/// sees the same running passes.
#[derive(Clone)]
pub struct Application {
    context: NotifyContext,
    dispatch_lock: Arc<PassLock>,
    recurrence_lock: Arc<PassLock>,
}

impl Application {
    pub fn new(context: NotifyContext) -> Self {
        Self {
            context,
            dispatch_lock: Arc::new(PassLock::new(PassKind::Dispatch)),
            recurrence_lock: Arc::new(PassLock::new(PassKind::Recurrence)),
        }
    }

    pub fn context(&self) -> &NotifyContext {
        &self.context
    }

    pub fn start_job_schedulers(&self) {
        start_dispatch_job(self.clone());
        start_recurrence_job(self.clone());
    }

    /// Runs the job schedulers until the process receives ctrl-c
    pub async fn start(self) -> anyhow::Result<()> {
        self.start_job_schedulers();
        info!("Job schedulers started");
        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        Ok(())
    }

    /// Sends every reminder that is due now. Fails with `AlreadyRunning`
    /// when another dispatch pass has not finished yet.
    pub async fn run_dispatch_pass(&self) -> Result<RunSummary, PassError> {
        let _guard = acquire(&self.dispatch_lock)?;
        let usecase = SendDueNotificationsUseCase {
            deadline: Instant::now() + self.context.config.dispatch_pass_timeout,
        };
        execute(usecase, &self.context).await
    }

    /// Advances every recurring notification whose due reminder was sent
    pub async fn run_recurrence_pass(&self) -> Result<RunSummary, PassError> {
        let _guard = acquire(&self.recurrence_lock)?;
        let usecase = AdvanceRecurringNotificationsUseCase {
            deadline: Instant::now() + self.context.config.recurrence_pass_timeout,
        };
        execute(usecase, &self.context).await
    }
}

fn acquire(lock: &PassLock) -> Result<shared::pass_lock::PassGuard<'_>, PassError> {
    lock.try_acquire().ok_or_else(|| {
        warn!("Skipping {} pass, the previous one is still running", lock.kind());
        PassError::AlreadyRunning(lock.kind())
    })
}
