//! Like edges and the denormalised counters they drive.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct LikeStore {
    pool: SqlitePool,
}

/// Something that can be liked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post { post_id: i64 },
    Comment { post_id: i64, comment_id: i64 },
}

impl LikeTarget {
    /// Row ID of the liked entity in its own table.
    pub fn id(&self) -> i64 {
        match self {
            LikeTarget::Post { post_id } => *post_id,
            LikeTarget::Comment { comment_id, .. } => *comment_id,
        }
    }

    fn statements(&self) -> &'static LikeStatements {
        match self {
            LikeTarget::Post { .. } => &POST_LIKES,
            LikeTarget::Comment { .. } => &COMMENT_LIKES,
        }
    }
}

/// State after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub is_like: bool,
    /// Counter persisted on the target, equal to the live edge count.
    pub likes: i64,
}

struct LikeStatements {
    toggle: &'static str,
    count: &'static str,
    store_count: &'static str,
    get: &'static str,
}

static POST_LIKES: LikeStatements = LikeStatements {
    toggle: "INSERT INTO post_likes (user_id, post_id, is_like) VALUES (?, ?, 1)
             ON CONFLICT (user_id, post_id)
             DO UPDATE SET is_like = NOT is_like, updated_at = datetime('now')
             RETURNING is_like",
    count: "SELECT COUNT(*) FROM post_likes WHERE post_id = ? AND is_like = 1",
    store_count: "UPDATE posts SET likes = ? WHERE id = ?",
    get: "SELECT is_like FROM post_likes WHERE user_id = ? AND post_id = ?",
};

static COMMENT_LIKES: LikeStatements = LikeStatements {
    toggle: "INSERT INTO comment_likes (user_id, comment_id, is_like) VALUES (?, ?, 1)
             ON CONFLICT (user_id, comment_id)
             DO UPDATE SET is_like = NOT is_like, updated_at = datetime('now')
             RETURNING is_like",
    count: "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ? AND is_like = 1",
    store_count: "UPDATE comments SET likes = ? WHERE id = ?",
    get: "SELECT is_like FROM comment_likes WHERE user_id = ? AND comment_id = ?",
};

impl LikeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the edge as liked, or flip it, then recompute the target's counter.
    ///
    /// The upsert is the first statement of the transaction, so the write lock
    /// is taken before anything is read and concurrent toggles serialise.
    pub async fn toggle(&self, user_id: i64, target: LikeTarget) -> Result<LikeOutcome, sqlx::Error> {
        let sql = target.statements();
        let target_id = target.id();

        let mut tx = self.pool.begin().await?;

        let (is_like,): (bool,) = sqlx::query_as(sql.toggle)
            .bind(user_id)
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;

        let (likes,): (i64,) = sqlx::query_as(sql.count)
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(sql.store_count)
            .bind(likes)
            .bind(target_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(LikeOutcome { is_like, likes })
    }

    /// Current edge state, `None` if the user never liked the target.
    pub async fn get(&self, user_id: i64, target: LikeTarget) -> Result<Option<bool>, sqlx::Error> {
        let row: Option<(bool,)> = sqlx::query_as(target.statements().get)
            .bind(user_id)
            .bind(target.id())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    /// Live count of liked edges, straight from the edge table.
    pub async fn count(&self, target: LikeTarget) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(target.statements().count)
            .bind(target.id())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
