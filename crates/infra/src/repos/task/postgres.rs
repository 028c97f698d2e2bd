use super::ITaskRepo;
use planner_notify_domain::{Task, ID};
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresTaskRepo {
    pool: PgPool,
}

impl PostgresTaskRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TaskRaw {
    task_uid: Uuid,
    title: String,
    board_uid: Option<Uuid>,
    create_by: Uuid,
}

impl From<TaskRaw> for Task {
    fn from(raw: TaskRaw) -> Self {
        Self {
            id: raw.task_uid.into(),
            title: raw.title,
            board_id: raw.board_uid.map(|id| id.into()),
            create_by: raw.create_by.into(),
        }
    }
}

#[async_trait::async_trait]
impl ITaskRepo for PostgresTaskRepo {
    async fn insert(&self, task: &Task) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks(task_uid, title, board_uid, create_by)
            VALUES($1, $2, $3, $4)
            "#,
        )
        .bind(task.id.inner_ref())
        .bind(&task.title)
        .bind(task.board_id.as_ref().map(|id| *id.inner_ref()))
        .bind(task.create_by.inner_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, task_id: &ID) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, TaskRaw>(
            r#"
            SELECT t.task_uid, t.title, t.board_uid, t.create_by FROM tasks AS t
            WHERE t.task_uid = $1
            "#,
        )
        .bind(task_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(task.map(|t| t.into()))
    }
}
