//! Post storage and paged listing.

use sqlx::sqlite::SqlitePool;

/// Fixed page size for post listings.
pub const POST_PAGE_SIZE: i64 = 10;

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    /// Row ID of the author.
    pub user_id: i64,
    /// Login handle of the author.
    pub author: String,
    pub title: String,
    pub contents: String,
    pub likes: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    user_id: i64,
    author: String,
    title: String,
    contents: String,
    likes: i64,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            author: row.author,
            title: row.title,
            contents: row.contents,
            likes: row.likes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Listing order. Always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    CreatedAt,
    ModifiedAt,
    Likes,
    Title,
}

impl PostSort {
    /// Parse the `sortBy` query value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "createdAt" => Some(PostSort::CreatedAt),
            "modifiedAt" => Some(PostSort::ModifiedAt),
            "likes" => Some(PostSort::Likes),
            "title" => Some(PostSort::Title),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostSort::CreatedAt => "createdAt",
            PostSort::ModifiedAt => "modifiedAt",
            PostSort::Likes => "likes",
            PostSort::Title => "title",
        }
    }
}

/// One page request. Bounds are `created_at` strings in SQLite
/// `YYYY-MM-DD HH:MM:SS` form; `from` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Default)]
pub struct PostPageQuery {
    /// 1-based page number.
    pub page: i64,
    pub sort: PostSort,
    pub from: Option<String>,
    pub until: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total_elements: i64,
    pub total_pages: i64,
}

macro_rules! post_page_query {
    ($order:literal) => {
        concat!(
            "SELECT p.id, p.user_id, u.user_id AS author, p.title, p.contents, p.likes, ",
            "p.created_at, p.updated_at FROM posts p JOIN users u ON u.id = p.user_id ",
            "WHERE (? IS NULL OR p.created_at >= ?) AND (? IS NULL OR p.created_at < ?) ",
            "ORDER BY ",
            $order,
            " DESC, p.id DESC LIMIT ? OFFSET ?"
        )
    };
}

impl PostStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a post. Returns its ID.
    pub async fn create(&self, user_id: i64, title: &str, contents: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO posts (user_id, title, contents) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(title)
            .bind(contents)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        let row: Option<PostRow> = sqlx::query_as(
            "SELECT p.id, p.user_id, u.user_id AS author, p.title, p.contents, p.likes,
                    p.created_at, p.updated_at
             FROM posts p JOIN users u ON u.id = p.user_id WHERE p.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Post::from))
    }

    /// Author row ID of a post, if the post exists.
    pub async fn author_of(&self, id: i64) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT user_id FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    /// Update title and contents. Returns true if the post existed.
    pub async fn update(&self, id: i64, title: &str, contents: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET title = ?, contents = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(title)
        .bind(contents)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a post together with its comments and like edges.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fetch one page of posts, newest (or highest) first.
    pub async fn page(&self, query: &PostPageQuery) -> Result<PostPage, sqlx::Error> {
        let from = query.from.as_deref();
        let until = query.until.as_deref();

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM posts
             WHERE (? IS NULL OR created_at >= ?) AND (? IS NULL OR created_at < ?)",
        )
        .bind(from)
        .bind(from)
        .bind(until)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        let sql = match query.sort {
            PostSort::CreatedAt => post_page_query!("p.created_at"),
            PostSort::ModifiedAt => post_page_query!("p.updated_at"),
            PostSort::Likes => post_page_query!("p.likes"),
            PostSort::Title => post_page_query!("p.title"),
        };

        // A page too large to address lies past the end
        let rows: Vec<PostRow> = match (query.page.max(1) - 1).checked_mul(POST_PAGE_SIZE) {
            Some(offset) => {
                sqlx::query_as(sql)
                    .bind(from)
                    .bind(from)
                    .bind(until)
                    .bind(until)
                    .bind(POST_PAGE_SIZE)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(PostPage {
            posts: rows.into_iter().map(Post::from).collect(),
            total_elements: total.0,
            total_pages: (total.0 + POST_PAGE_SIZE - 1) / POST_PAGE_SIZE,
        })
    }
}
