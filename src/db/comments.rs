use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct CommentStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    /// Login handle of the author.
    pub author: String,
    pub contents: String,
    pub likes: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    author: String,
    contents: String,
    likes: i64,
    created_at: String,
    updated_at: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            author: row.author,
            contents: row.contents,
            likes: row.likes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl CommentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a comment on a post. Returns its ID.
    pub async fn create(
        &self,
        post_id: i64,
        user_id: i64,
        contents: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO comments (post_id, user_id, contents) VALUES (?, ?, ?)")
                .bind(post_id)
                .bind(user_id)
                .bind(contents)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a comment only if it belongs to the given post.
    pub async fn get(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>, sqlx::Error> {
        let row: Option<CommentRow> = sqlx::query_as(
            "SELECT c.id, c.post_id, c.user_id, u.user_id AS author, c.contents, c.likes,
                    c.created_at, c.updated_at
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.id = ? AND c.post_id = ?",
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Comment::from))
    }

    /// Author row ID of a comment on the given post.
    pub async fn author_of(&self, post_id: i64, comment_id: i64) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT user_id FROM comments WHERE id = ? AND post_id = ?")
                .bind(comment_id)
                .bind(post_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    /// All comments of a post, oldest first.
    pub async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            "SELECT c.id, c.post_id, c.user_id, u.user_id AS author, c.contents, c.likes,
                    c.created_at, c.updated_at
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    pub async fn update(&self, comment_id: i64, contents: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comments SET contents = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(contents)
        .bind(comment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, comment_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, NewUser};

    #[tokio::test]
    async fn test_comment_scoped_to_post() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db
            .users()
            .create(&NewUser {
                user_id: "dave123456",
                password_hash: "hash",
                name: "Dave",
                email: "dave@example.com",
                introduce: None,
            })
            .await
            .unwrap();
        let post_a = db.posts().create(user_id, "A", "a").await.unwrap();
        let post_b = db.posts().create(user_id, "B", "b").await.unwrap();

        let comment = db.comments().create(post_a, user_id, "first!").await.unwrap();

        let found = db.comments().get(post_a, comment).await.unwrap().unwrap();
        assert_eq!(found.contents, "first!");
        assert_eq!(found.author, "dave123456");
        assert!(db.comments().get(post_b, comment).await.unwrap().is_none());
        assert_eq!(db.comments().author_of(post_b, comment).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_update_delete() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db
            .users()
            .create(&NewUser {
                user_id: "dave123456",
                password_hash: "hash",
                name: "Dave",
                email: "dave@example.com",
                introduce: None,
            })
            .await
            .unwrap();
        let post = db.posts().create(user_id, "A", "a").await.unwrap();
        assert!(db.comments().list_by_post(post).await.unwrap().is_empty());

        let first = db.comments().create(post, user_id, "one").await.unwrap();
        db.comments().create(post, user_id, "two").await.unwrap();

        assert!(db.comments().update(first, "uno").await.unwrap());
        let comments = db.comments().list_by_post(post).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].contents, "uno");

        assert!(db.comments().delete(first).await.unwrap());
        assert_eq!(db.comments().list_by_post(post).await.unwrap().len(), 1);
    }
}
