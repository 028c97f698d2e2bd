mod config;
mod repos;
mod services;
mod system;

use anyhow::Context;
pub use config::Config;
pub use repos::{
    IBoardRepo, ILedgerTransaction, INotificationRepo, ITaskRepo, IUserRepo, InMemoryBoardRepo,
    InMemoryNotificationRepo, InMemoryTaskRepo, InMemoryUserRepo, Repos,
};
pub use services::*;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use system::{ISys, RealSys};

/// Everything a pass needs from the outside world
#[derive(Clone)]
pub struct NotifyContext {
    pub repos: Repos,
    /// Document mirror holding the projection documents
    pub documents: Arc<dyn IDocumentStore>,
    pub tokens: Arc<dyn ITokenDirectory>,
    pub push: Arc<dyn IPushGateway>,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
}

struct ContextParams {
    pub postgres_connection_string: String,
    pub google_project_id: String,
    pub google_credentials: GoogleCredentials,
}

impl NotifyContext {
    async fn create(params: ContextParams) -> anyhow::Result<Self> {
        let config = Config::new();
        let repos =
            Repos::create_postgres(&params.postgres_connection_string, max_connections(&config))
                .await
                .context("Postgres credentials must be set and valid")?;

        let client = reqwest::Client::builder()
            .timeout(config.http_request_timeout)
            .connect_timeout(config.http_connect_timeout)
            .build()
            .context("Unable to build the HTTP client")?;
        let sys: Arc<dyn ISys> = Arc::new(RealSys {});
        let auth: Arc<dyn IAccessTokenProvider> = Arc::new(GoogleAuthProvider::new(
            Box::new(OAuthRefresher::new(client.clone(), params.google_credentials)),
            sys.clone(),
        ));

        let documents: Arc<dyn IDocumentStore> = Arc::new(FirestoreDocumentStore::new(
            client.clone(),
            params.google_project_id.clone(),
            auth.clone(),
        ));
        Ok(Self {
            repos,
            tokens: Arc::new(DocumentTokenDirectory::new(documents.clone())),
            documents,
            push: Arc::new(FcmPushGateway::new(
                client,
                params.google_project_id,
                auth,
                config.worker_pool_size,
            )),
            config,
            sys,
        })
    }

    /// Context backed by in-memory stores and gateways, used by tests
    pub fn create_inmemory() -> Self {
        let documents: Arc<dyn IDocumentStore> = Arc::new(InMemoryDocumentStore::new());
        Self {
            repos: Repos::create_inmemory(),
            tokens: Arc::new(DocumentTokenDirectory::new(documents.clone())),
            documents,
            push: Arc::new(InMemoryPushGateway::new()),
            config: Config::new(),
            sys: Arc::new(RealSys {}),
        }
    }
}

/// Dispatch and recurrence run side by side, each with one connection per
/// worker and a spare one for its candidate query
fn max_connections(config: &Config) -> u32 {
    2 * (config.worker_pool_size as u32 + 1)
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> anyhow::Result<NotifyContext> {
    NotifyContext::create(ContextParams {
        postgres_connection_string: get_env("DATABASE_URL")?,
        google_project_id: get_env("GOOGLE_PROJECT_ID")?,
        google_credentials: GoogleCredentials {
            client_id: get_env("GOOGLE_CLIENT_ID")?,
            client_secret: get_env("GOOGLE_CLIENT_SECRET")?,
            refresh_token: get_env("GOOGLE_REFRESH_TOKEN")?,
        },
    })
    .await
}

fn get_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{} env var to be present.", key))
}

pub async fn run_migration() -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&get_env("DATABASE_URL")?)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    Ok(())
}
