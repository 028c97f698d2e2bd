use crate::{
    shared::entity::ID,
    task::{Board, BoardMember, Task},
};
use thiserror::Error;

/// Who receives the reminders of a `Task`, which also decides the shape
/// of the projection document that is written for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Audience {
    /// Task on a board that has members. Every member is a recipient.
    Group { board_id: ID, members: Vec<ID> },
    /// Task on a board without any membership rows. Only the board creator
    /// is notified, but the shared board projection is still used.
    BoardCreator { board_id: ID, creator: ID },
    /// Task without a board, owned by its creator
    Personal { owner: ID },
}

/// Layout of the projection document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionShape {
    /// Shared document per task with a sub-map of flags per member
    Group,
    /// One document per owner with scalar flags
    Personal,
}

#[derive(Error, Debug, PartialEq)]
pub enum AudienceError {
    #[error("The task {task_id} references board {board_id} which was not provided")]
    BoardMismatch { task_id: ID, board_id: ID },
}

impl Audience {
    /// `board` must be the board referenced by `task.board_id` and `members`
    /// its membership rows.
    pub fn classify(
        task: &Task,
        board: Option<&Board>,
        members: &[BoardMember],
    ) -> Result<Self, AudienceError> {
        let board_id = match &task.board_id {
            Some(board_id) => board_id,
            None => {
                return Ok(Self::Personal {
                    owner: task.create_by.clone(),
                })
            }
        };
        let board = match board {
            Some(board) if board.id == *board_id => board,
            _ => {
                return Err(AudienceError::BoardMismatch {
                    task_id: task.id.clone(),
                    board_id: board_id.clone(),
                })
            }
        };

        let mut member_ids: Vec<ID> = Vec::with_capacity(members.len());
        for member in members.iter().filter(|m| m.board_id == board.id) {
            if !member_ids.contains(&member.user_id) {
                member_ids.push(member.user_id.clone());
            }
        }

        if member_ids.is_empty() {
            Ok(Self::BoardCreator {
                board_id: board.id.clone(),
                creator: board.create_by.clone(),
            })
        } else {
            Ok(Self::Group {
                board_id: board.id.clone(),
                members: member_ids,
            })
        }
    }

    pub fn recipients(&self) -> Vec<ID> {
        match self {
            Self::Group { members, .. } => members.clone(),
            Self::BoardCreator { creator, .. } => vec![creator.clone()],
            Self::Personal { owner } => vec![owner.clone()],
        }
    }

    pub fn shape(&self) -> ProjectionShape {
        match self {
            Self::Group { .. } | Self::BoardCreator { .. } => ProjectionShape::Group,
            Self::Personal { .. } => ProjectionShape::Personal,
        }
    }
}
