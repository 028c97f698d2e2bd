use crate::shared::entity::{Entity, ID};

/// A planner task. Tasks without a `board_id` are personal tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: ID,
    pub title: String,
    pub board_id: Option<ID>,
    /// The `User` that created the task
    pub create_by: ID,
}

impl Task {
    pub fn personal(title: impl Into<String>, create_by: ID) -> Self {
        Self {
            id: Default::default(),
            title: title.into(),
            board_id: None,
            create_by,
        }
    }

    pub fn on_board(title: impl Into<String>, board_id: ID, create_by: ID) -> Self {
        Self {
            id: Default::default(),
            title: title.into(),
            board_id: Some(board_id),
            create_by,
        }
    }
}

impl Entity for Task {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub id: ID,
    pub title: String,
    pub create_by: ID,
}

impl Board {
    pub fn new(title: impl Into<String>, create_by: ID) -> Self {
        Self {
            id: Default::default(),
            title: title.into(),
            create_by,
        }
    }
}

impl Entity for Board {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// Membership row linking a `User` to a `Board`
#[derive(Debug, Clone, PartialEq)]
pub struct BoardMember {
    pub board_id: ID,
    pub user_id: ID,
}
