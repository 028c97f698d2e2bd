use super::IBoardRepo;
use crate::repos::shared::inmemory_repo::*;
use planner_notify_domain::{Board, BoardMember, ID};

pub struct InMemoryBoardRepo {
    boards: std::sync::Mutex<Vec<Board>>,
    members: std::sync::Mutex<Vec<BoardMember>>,
}

impl InMemoryBoardRepo {
    pub fn new() -> Self {
        Self {
            boards: std::sync::Mutex::new(vec![]),
            members: std::sync::Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl IBoardRepo for InMemoryBoardRepo {
    async fn insert(&self, board: &Board) -> anyhow::Result<()> {
        insert(board, &self.boards);
        Ok(())
    }

    async fn find(&self, board_id: &ID) -> anyhow::Result<Option<Board>> {
        Ok(find(board_id, &self.boards))
    }

    async fn insert_member(&self, member: &BoardMember) -> anyhow::Result<()> {
        insert(member, &self.members);
        Ok(())
    }

    async fn find_members(&self, board_id: &ID) -> anyhow::Result<Vec<BoardMember>> {
        Ok(find_by(&self.members, |m| m.board_id == *board_id))
    }
}
