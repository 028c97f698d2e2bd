mod board;
mod notification;
mod shared;
mod task;
mod user;

pub use board::{IBoardRepo, InMemoryBoardRepo, PostgresBoardRepo};
pub use notification::{
    ILedgerTransaction, INotificationRepo, InMemoryNotificationRepo, PostgresNotificationRepo,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use task::{ITaskRepo, InMemoryTaskRepo, PostgresTaskRepo};
use tracing::info;
pub use user::{IUserRepo, InMemoryUserRepo, PostgresUserRepo};

#[derive(Clone)]
pub struct Repos {
    pub notifications: Arc<dyn INotificationRepo>,
    pub tasks: Arc<dyn ITaskRepo>,
    pub boards: Arc<dyn IBoardRepo>,
    pub users: Arc<dyn IUserRepo>,
}

impl Repos {
    pub async fn create_postgres(
        connection_string: &str,
        max_connections: u32,
    ) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");

        Ok(Self {
            notifications: Arc::new(PostgresNotificationRepo::new(pool.clone())),
            tasks: Arc::new(PostgresTaskRepo::new(pool.clone())),
            boards: Arc::new(PostgresBoardRepo::new(pool.clone())),
            users: Arc::new(PostgresUserRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        Self {
            notifications: Arc::new(InMemoryNotificationRepo::new()),
            tasks: Arc::new(InMemoryTaskRepo::new()),
            boards: Arc::new(InMemoryBoardRepo::new()),
            users: Arc::new(InMemoryUserRepo::new()),
        }
    }
}
