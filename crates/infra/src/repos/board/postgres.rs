use super::IBoardRepo;
use planner_notify_domain::{Board, BoardMember, ID};
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresBoardRepo {
    pool: PgPool,
}

impl PostgresBoardRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BoardRaw {
    board_uid: Uuid,
    title: String,
    create_by: Uuid,
}

#[derive(Debug, FromRow)]
struct BoardMemberRaw {
    board_uid: Uuid,
    user_uid: Uuid,
}

impl From<BoardRaw> for Board {
    fn from(raw: BoardRaw) -> Self {
        Self {
            id: raw.board_uid.into(),
            title: raw.title,
            create_by: raw.create_by.into(),
        }
    }
}

impl From<BoardMemberRaw> for BoardMember {
    fn from(raw: BoardMemberRaw) -> Self {
        Self {
            board_id: raw.board_uid.into(),
            user_id: raw.user_uid.into(),
        }
    }
}

#[async_trait::async_trait]
impl IBoardRepo for PostgresBoardRepo {
    async fn insert(&self, board: &Board) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO boards(board_uid, title, create_by)
            VALUES($1, $2, $3)
            "#,
        )
        .bind(board.id.inner_ref())
        .bind(&board.title)
        .bind(board.create_by.inner_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, board_id: &ID) -> anyhow::Result<Option<Board>> {
        let board = sqlx::query_as::<_, BoardRaw>(
            r#"
            SELECT b.board_uid, b.title, b.create_by FROM boards AS b
            WHERE b.board_uid = $1
            "#,
        )
        .bind(board_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(board.map(|b| b.into()))
    }

    async fn insert_member(&self, member: &BoardMember) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO board_members(board_uid, user_uid)
            VALUES($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(member.board_id.inner_ref())
        .bind(member.user_id.inner_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_members(&self, board_id: &ID) -> anyhow::Result<Vec<BoardMember>> {
        let members = sqlx::query_as::<_, BoardMemberRaw>(
            r#"
            SELECT m.board_uid, m.user_uid FROM board_members AS m
            WHERE m.board_uid = $1
            "#,
        )
        .bind(board_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;
        Ok(members.into_iter().map(|m| m.into()).collect())
    }
}
