mod inmemory;
mod postgres;

pub use inmemory::InMemoryBoardRepo;
use planner_notify_domain::{Board, BoardMember, ID};
pub use postgres::PostgresBoardRepo;

#[async_trait::async_trait]
pub trait IBoardRepo: Send + Sync {
    async fn insert(&self, board: &Board) -> anyhow::Result<()>;
    async fn find(&self, board_id: &ID) -> anyhow::Result<Option<Board>>;
    async fn insert_member(&self, member: &BoardMember) -> anyhow::Result<()>;
    async fn find_members(&self, board_id: &ID) -> anyhow::Result<Vec<BoardMember>>;
}
