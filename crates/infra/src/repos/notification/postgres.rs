use super::{ILedgerTransaction, INotificationRepo};
use anyhow::anyhow;
use planner_notify_domain::{Notification, SendState, ID};
use sqlx::{types::Uuid, FromRow, PgPool, Postgres, Transaction};
use std::convert::TryFrom;

pub struct PostgresNotificationRepo {
    pool: PgPool,
}

impl PostgresNotificationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NotificationRaw {
    notification_uid: Uuid,
    task_uid: Uuid,
    due_date: i64,
    before_due_date: Option<i64>,
    recurring_pattern: String,
    is_send: i16,
    created_at: i64,
}

impl TryFrom<NotificationRaw> for Notification {
    type Error = anyhow::Error;

    fn try_from(raw: NotificationRaw) -> anyhow::Result<Self> {
        let is_send = SendState::from_i16(raw.is_send).ok_or_else(|| {
            anyhow!(
                "Notification {} has an invalid is_send value: {}",
                raw.notification_uid,
                raw.is_send
            )
        })?;
        Ok(Notification {
            id: raw.notification_uid.into(),
            task_id: raw.task_uid.into(),
            due_date: raw.due_date,
            before_due_date: raw.before_due_date,
            recurring_pattern: raw.recurring_pattern,
            is_send,
            created_at: raw.created_at,
        })
    }
}

fn into_notifications(rows: Vec<NotificationRaw>) -> anyhow::Result<Vec<Notification>> {
    rows.into_iter().map(Notification::try_from).collect()
}

#[async_trait::async_trait]
impl INotificationRepo for PostgresNotificationRepo {
    async fn insert(&self, notification: &Notification) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
            (notification_uid, task_uid, due_date, before_due_date, recurring_pattern, is_send, created_at)
            VALUES($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id.inner_ref())
        .bind(notification.task_id.inner_ref())
        .bind(notification.due_date)
        .bind(notification.before_due_date)
        .bind(&notification.recurring_pattern)
        .bind(notification.is_send.as_i16())
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, notification_id: &ID) -> anyhow::Result<Option<Notification>> {
        let raw = sqlx::query_as::<_, NotificationRaw>(
            r#"
            SELECT * FROM notifications AS n
            WHERE n.notification_uid = $1
            "#,
        )
        .bind(notification_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        raw.map(Notification::try_from).transpose()
    }

    async fn find_due(&self, now: i64) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRaw>(
            r#"
            SELECT * FROM notifications AS n
            WHERE (
                n.is_send = 0 AND (
                    n.before_due_date <= $1 OR
                    (n.before_due_date IS NULL AND n.due_date <= $1)
                )
            ) OR (n.is_send = 1 AND n.due_date <= $1)
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        into_notifications(rows)
    }

    async fn find_recurring_sent(&self) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRaw>(
            r#"
            SELECT * FROM notifications AS n
            WHERE n.is_send = 2 AND
            n.recurring_pattern NOT IN ('onetime', '')
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        into_notifications(rows)
    }

    async fn update_send_state(
        &self,
        notification_id: &ID,
        expected: SendState,
        next: SendState,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE notifications
            SET is_send = $3
            WHERE notification_uid = $1 AND is_send = $2
            "#,
        )
        .bind(notification_id.inner_ref())
        .bind(expected.as_i16())
        .bind(next.as_i16())
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn begin(&self) -> anyhow::Result<Box<dyn ILedgerTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresLedgerTransaction { tx }))
    }
}

pub struct PostgresLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl ILedgerTransaction for PostgresLedgerTransaction {
    async fn reschedule(&mut self, notification: &Notification) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET due_date = $2,
            before_due_date = $3,
            is_send = $4
            WHERE notification_uid = $1
            "#,
        )
        .bind(notification.id.inner_ref())
        .bind(notification.due_date)
        .bind(notification.before_due_date)
        .bind(notification.is_send.as_i16())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
