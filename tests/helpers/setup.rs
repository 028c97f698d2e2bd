use planner_notify_domain::{Notification, SendState, ID};
use planner_notify_engine::Application;
use planner_notify_infra::{
    ILedgerTransaction, INotificationRepo, ISys, InMemoryDocumentStore, InMemoryNotificationRepo,
    InMemoryPushGateway, NotifyContext,
};
use std::sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc,
};
use std::time::Duration;

/// Clock the tests move by hand
pub struct TestClock {
    now: AtomicI64,
}

impl TestClock {
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl ISys for TestClock {
    fn get_timestamp_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Ledger that can be told to reject send state updates
pub struct FlakyLedger {
    inner: InMemoryNotificationRepo,
    fail_send_state_updates: AtomicBool,
}

impl FlakyLedger {
    pub fn fail_send_state_updates(&self, fail: bool) {
        self.fail_send_state_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl INotificationRepo for FlakyLedger {
    async fn insert(&self, notification: &Notification) -> anyhow::Result<()> {
        self.inner.insert(notification).await
    }

    async fn find(&self, notification_id: &ID) -> anyhow::Result<Option<Notification>> {
        self.inner.find(notification_id).await
    }

    async fn find_due(&self, now: i64) -> anyhow::Result<Vec<Notification>> {
        self.inner.find_due(now).await
    }

    async fn find_recurring_sent(&self) -> anyhow::Result<Vec<Notification>> {
        self.inner.find_recurring_sent().await
    }

    async fn update_send_state(
        &self,
        notification_id: &ID,
        expected: SendState,
        next: SendState,
    ) -> anyhow::Result<bool> {
        if self.fail_send_state_updates.load(Ordering::SeqCst) {
            anyhow::bail!("Connection to the ledger was lost");
        }
        self.inner
            .update_send_state(notification_id, expected, next)
            .await
    }

    async fn begin(&self) -> anyhow::Result<Box<dyn ILedgerTransaction>> {
        self.inner.begin().await
    }
}

pub struct TestApp {
    pub app: Application,
    pub ctx: NotifyContext,
    pub clock: Arc<TestClock>,
    pub push: Arc<InMemoryPushGateway>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub ledger: Arc<FlakyLedger>,
}

impl TestApp {
    /// Rebuilds the application so that a candidate is abandoned after `limit`
    pub fn with_candidate_timeout(mut self, limit: Duration) -> Self {
        self.ctx.config.candidate_timeout = limit;
        self.app = Application::new(self.ctx.clone());
        self
    }
}

pub fn spawn_app(now: i64) -> TestApp {
    spawn_app_with_latency(now, Duration::from_millis(0))
}

/// Every push gateway call takes `latency`
pub fn spawn_app_with_latency(now: i64, latency: Duration) -> TestApp {
    let mut ctx = NotifyContext::create_inmemory();

    let clock = Arc::new(TestClock {
        now: AtomicI64::new(now),
    });
    let push = Arc::new(InMemoryPushGateway::with_latency(latency));
    let documents = Arc::new(InMemoryDocumentStore::new());
    let ledger = Arc::new(FlakyLedger {
        inner: InMemoryNotificationRepo::new(),
        fail_send_state_updates: AtomicBool::new(false),
    });

    ctx.sys = clock.clone();
    ctx.push = push.clone();
    ctx.documents = documents.clone();
    ctx.tokens = Arc::new(planner_notify_infra::DocumentTokenDirectory::new(
        documents.clone(),
    ));
    ctx.repos.notifications = ledger.clone();
    ctx.config.worker_pool_size = 10;
    ctx.config.worker_queue_capacity = 100;
    ctx.config.dispatch_pass_timeout = Duration::from_secs(60);
    ctx.config.recurrence_pass_timeout = Duration::from_secs(60);
    ctx.config.candidate_timeout = Duration::from_secs(60);

    TestApp {
        app: Application::new(ctx.clone()),
        ctx,
        clock,
        push,
        documents,
        ledger,
    }
}
