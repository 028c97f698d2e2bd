use crate::error::NotifyError;
use planner_notify_domain::{
    Audience, Board, BoardMember, Notification, ProjectionPath, ProjectionShape, Task, User, ID,
};
use planner_notify_infra::NotifyContext;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Memoized task, board and user lookups. Created per pass and shared by
/// the workers of that pass only, so nothing outlives a single pass.
#[derive(Debug, Default)]
pub struct PassCache {
    tasks: Mutex<HashMap<ID, Task>>,
    boards: Mutex<HashMap<ID, (Board, Vec<BoardMember>)>>,
    users: Mutex<HashMap<ID, User>>,
}

fn cached<V: Clone>(map: &Mutex<HashMap<ID, V>>, id: &ID) -> Option<V> {
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(id)
        .cloned()
}

fn remember<V>(map: &Mutex<HashMap<ID, V>>, id: &ID, value: V) {
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id.clone(), value);
}

impl PassCache {
    pub fn new() -> Self {
        Default::default()
    }

    async fn task(&self, task_id: &ID, ctx: &NotifyContext) -> anyhow::Result<Option<Task>> {
        if let Some(task) = cached(&self.tasks, task_id) {
            return Ok(Some(task));
        }
        let task = ctx.repos.tasks.find(task_id).await?;
        if let Some(task) = &task {
            remember(&self.tasks, task_id, task.clone());
        }
        Ok(task)
    }

    async fn board(
        &self,
        board_id: &ID,
        ctx: &NotifyContext,
    ) -> anyhow::Result<Option<(Board, Vec<BoardMember>)>> {
        if let Some(board) = cached(&self.boards, board_id) {
            return Ok(Some(board));
        }
        let board = match ctx.repos.boards.find(board_id).await? {
            Some(board) => board,
            None => return Ok(None),
        };
        let members = ctx.repos.boards.find_members(board_id).await?;
        remember(&self.boards, board_id, (board.clone(), members.clone()));
        Ok(Some((board, members)))
    }

    async fn user(&self, user_id: &ID, ctx: &NotifyContext) -> anyhow::Result<Option<User>> {
        if let Some(user) = cached(&self.users, user_id) {
            return Ok(Some(user));
        }
        let user = ctx.repos.users.find(user_id).await?;
        if let Some(user) = &user {
            remember(&self.users, user_id, user.clone());
        }
        Ok(user)
    }
}

/// Everything needed to notify about a task and mirror the outcome
#[derive(Debug, Clone)]
pub struct Recipients {
    pub task: Task,
    pub audience: Audience,
    pub path: ProjectionPath,
}

/// Classifies the task of `notification` and resolves the projection path
pub async fn resolve_recipients(
    notification: &Notification,
    ctx: &NotifyContext,
    cache: &PassCache,
) -> Result<Recipients, NotifyError> {
    let task_id = &notification.task_id;
    let unresolved = |message: String| NotifyError::TransientResolution {
        task_id: task_id.clone(),
        message,
    };

    let task = cache
        .task(task_id, ctx)
        .await
        .map_err(|e| unresolved(e.to_string()))?
        .ok_or_else(|| unresolved("Task not found".into()))?;

    let board = match &task.board_id {
        Some(board_id) => Some(
            cache
                .board(board_id, ctx)
                .await
                .map_err(|e| unresolved(e.to_string()))?
                .ok_or_else(|| unresolved(format!("Board {} not found", board_id)))?,
        ),
        None => None,
    };
    let audience = match &board {
        Some((board, members)) => Audience::classify(&task, Some(board), members),
        None => Audience::classify(&task, None, &[]),
    }
    .map_err(|e| unresolved(e.to_string()))?;

    let path = match audience.shape() {
        ProjectionShape::Group => ProjectionPath::Group {
            task_id: task.id.clone(),
            notification_id: notification.id.clone(),
        },
        ProjectionShape::Personal => {
            let owner = cache
                .user(&task.create_by, ctx)
                .await
                .map_err(|e| unresolved(e.to_string()))?
                .ok_or_else(|| unresolved(format!("Owner {} not found", task.create_by)))?;
            ProjectionPath::Personal {
                owner_email: owner.email,
                task_id: task.id.clone(),
            }
        }
    };

    Ok(Recipients {
        task,
        audience,
        path,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTokens {
    /// Deduplicated, in recipient order
    pub tokens: Vec<String>,
    /// Recipients whose token entry could not be read
    pub failed_reads: usize,
}

/// Push tokens of the given users. Users without a token, or whose token
/// could not be read, are left out. Duplicate tokens are collapsed.
pub async fn resolve_tokens(user_ids: &[ID], ctx: &NotifyContext) -> ResolvedTokens {
    let mut resolved = ResolvedTokens {
        tokens: Vec::with_capacity(user_ids.len()),
        failed_reads: 0,
    };
    for user_id in user_ids {
        match ctx.tokens.get_token(user_id).await {
            Ok(Some(token)) => {
                if !resolved.tokens.contains(&token) {
                    resolved.tokens.push(token);
                }
            }
            Ok(None) => debug!(user_id = %user_id, "User has no push token"),
            Err(e) => {
                warn!(user_id = %user_id, "Unable to read push token: {:?}", e);
                resolved.failed_reads += 1;
            }
        }
    }
    resolved
}
