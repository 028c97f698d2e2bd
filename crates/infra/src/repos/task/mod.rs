mod inmemory;
mod postgres;

pub use inmemory::InMemoryTaskRepo;
use planner_notify_domain::{Task, ID};
pub use postgres::PostgresTaskRepo;

/// Tasks are owned by the task management endpoints, the notification
/// engine only reads them.
#[async_trait::async_trait]
pub trait ITaskRepo: Send + Sync {
    async fn insert(&self, task: &Task) -> anyhow::Result<()>;
    async fn find(&self, task_id: &ID) -> anyhow::Result<Option<Task>>;
}
