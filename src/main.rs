mod telemetry;

use planner_notify_engine::Application;
use planner_notify_infra::{run_migration, setup_context};
use telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("planner_notify".into(), "info".into());
    init_subscriber(subscriber);

    run_migration().await?;
    let context = setup_context().await?;

    let app = Application::new(context);
    app.start().await
}
