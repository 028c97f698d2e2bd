use chrono::{TimeZone, Utc};
use planner_notify_domain::{
    Board, BoardMember, Notification, RecurringPattern, SendState, Task, User, ID,
};
use planner_notify_infra::{token_document_path, Document, NotifyContext};
use serde_json::{json, Value};

pub const MINUTE: i64 = 1000 * 60;
pub const HOUR: i64 = MINUTE * 60;
pub const DAY: i64 = HOUR * 24;

pub fn ts(year: i32, month: u32, day: u32, hour: u32, min: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0)
        .unwrap()
        .timestamp_millis()
}

pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("Expected an object"),
    }
}

pub async fn create_user(ctx: &NotifyContext, email: &str, token: Option<&str>) -> User {
    let user = User::new(email, email);
    ctx.repos.users.insert(&user).await.unwrap();
    if let Some(token) = token {
        ctx.documents
            .merge_set(&token_document_path(&user.id), doc(json!({ "token": token })))
            .await
            .unwrap();
    }
    user
}

pub async fn create_personal_task(ctx: &NotifyContext, owner: &User) -> Task {
    let task = Task::personal("Pay rent", owner.id.clone());
    ctx.repos.tasks.insert(&task).await.unwrap();
    task
}

/// Board created by `creator` with the given members and a task on it
pub async fn create_board_task(ctx: &NotifyContext, creator: &User, members: &[User]) -> Task {
    let board = Board::new("Release", creator.id.clone());
    ctx.repos.boards.insert(&board).await.unwrap();
    for member in members {
        ctx.repos
            .boards
            .insert_member(&BoardMember {
                board_id: board.id.clone(),
                user_id: member.id.clone(),
            })
            .await
            .unwrap();
    }
    let task = Task::on_board("Ship it", board.id, creator.id.clone());
    ctx.repos.tasks.insert(&task).await.unwrap();
    task
}

pub async fn create_notification(
    ctx: &NotifyContext,
    task_id: &ID,
    due_date: i64,
    before_due_date: Option<i64>,
    pattern: RecurringPattern,
) -> Notification {
    let notification =
        Notification::new(task_id.clone(), due_date, before_due_date, pattern, 0).unwrap();
    ctx.repos.notifications.insert(&notification).await.unwrap();
    notification
}

/// A notification whose due reminder was already sent, with a raw pattern
pub async fn create_sent_notification(
    ctx: &NotifyContext,
    task_id: &ID,
    due_date: i64,
    before_due_date: Option<i64>,
    pattern: &str,
) -> Notification {
    let mut notification =
        Notification::new(task_id.clone(), due_date, before_due_date, RecurringPattern::OneTime, 0)
            .unwrap();
    notification.recurring_pattern = pattern.to_string();
    notification.is_send = SendState::DueSent;
    ctx.repos.notifications.insert(&notification).await.unwrap();
    notification
}

pub async fn stored(ctx: &NotifyContext, notification: &Notification) -> Notification {
    ctx.repos
        .notifications
        .find(&notification.id)
        .await
        .unwrap()
        .unwrap()
}

pub async fn projection(ctx: &NotifyContext, path: &str) -> Value {
    Value::Object(ctx.documents.get(path).await.unwrap().unwrap_or_default())
}
