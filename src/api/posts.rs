//! Posts API.
//!
//! Reading is public; writing requires authentication and only the author
//! may change or delete a post.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::{ApiError, ResultExt};
use super::response::ResponseMessage;
use super::validation::{ValidJson, not_blank};
use super::{comments, likes};
use crate::account;
use crate::auth::Auth;
use crate::db::{Database, POST_PAGE_SIZE, Post, PostPageQuery, PostSort};

/// State for posts, comments and like endpoints.
#[derive(Clone)]
pub struct PostsState {
    pub db: Database,
}

pub fn router(state: PostsState) -> axum::Router {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route(
            "/{post_id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .merge(likes::post_routes())
        .nest("/{post_id}/comments", comments::router())
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize, Validate)]
pub(super) struct PostRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    title: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    contents: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostResponse {
    id: i64,
    user_id: String,
    title: String,
    contents: String,
    likes: i64,
    created_at: String,
    modified_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            user_id: post.author,
            title: post.title,
            contents: post.contents,
            likes: post.likes,
            created_at: post.created_at,
            modified_at: post.updated_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageParams {
    page: Option<i64>,
    sort_by: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostPageResponse {
    current_page: i64,
    total_elements: i64,
    total_pages: i64,
    size: i64,
    sort_by: &'static str,
    post_list: Vec<PostResponse>,
}

// --- Helpers ---

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Dates must use the YYYY-MM-DD format"))
}

/// Turn inclusive `from` / `to` days into `[start, end)` timestamp bounds.
fn period_bounds(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(Option<String>, Option<String>), ApiError> {
    let start = from
        .map(parse_date)
        .transpose()?
        .map(|d| d.and_time(NaiveTime::MIN));
    let end = to
        .map(parse_date)
        .transpose()?
        .map(|d| {
            d.checked_add_days(Days::new(1))
                .ok_or_else(|| ApiError::bad_request("Date is out of range"))
        })
        .transpose()?
        .map(|d| d.and_time(NaiveTime::MIN));

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(ApiError::bad_request("The period is not valid"));
        }
    }

    Ok((
        start.map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        end.map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
    ))
}

pub(super) async fn load_post(db: &Database, post_id: i64) -> Result<Post, ApiError> {
    db.posts()
        .get_by_id(post_id)
        .await
        .db_err("Failed to load post")?
        .ok_or_else(|| ApiError::bad_request("Post not found"))
}

// --- Handlers ---

async fn list_posts(
    State(state): State<PostsState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(ApiError::bad_request("Page numbers start at 1"));
    }

    let sort = match params.sort_by.as_deref() {
        None => PostSort::default(),
        Some(s) => PostSort::parse(s)
            .ok_or_else(|| ApiError::bad_request(format!("Cannot sort posts by '{}'", s)))?,
    };

    let (from, until) = period_bounds(params.from.as_deref(), params.to.as_deref())?;

    let result = state
        .db
        .posts()
        .page(&PostPageQuery {
            page,
            sort,
            from,
            until,
        })
        .await
        .db_err("Failed to list posts")?;

    if result.total_elements == 0 {
        return Err(ApiError::empty("No posts found"));
    }
    if page > result.total_pages {
        return Err(ApiError::bad_request(format!(
            "Page {} does not exist (last page is {})",
            page, result.total_pages
        )));
    }

    Ok(ResponseMessage::ok(
        "Posts loaded",
        PostPageResponse {
            current_page: page,
            total_elements: result.total_elements,
            total_pages: result.total_pages,
            size: POST_PAGE_SIZE,
            sort_by: sort.as_str(),
            post_list: result.posts.into_iter().map(PostResponse::from).collect(),
        },
    ))
}

async fn create_post(
    State(state): State<PostsState>,
    Auth(auth): Auth,
    ValidJson(payload): ValidJson<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    account::ensure_live(auth.user.state)?;

    let id = state
        .db
        .posts()
        .create(auth.user.id, payload.title.trim(), &payload.contents)
        .await
        .db_err("Failed to create post")?;

    let post = load_post(&state.db, id).await?;
    Ok(ResponseMessage::created(
        "Post created",
        PostResponse::from(post),
    ))
}

async fn get_post(
    State(state): State<PostsState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let post = load_post(&state.db, post_id).await?;
    Ok(ResponseMessage::ok("Post loaded", PostResponse::from(post)))
}

async fn update_post(
    State(state): State<PostsState>,
    Auth(auth): Auth,
    Path(post_id): Path<i64>,
    ValidJson(payload): ValidJson<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    account::ensure_live(auth.user.state)?;
    let post = load_post(&state.db, post_id).await?;
    if post.user_id != auth.user.id {
        return Err(ApiError::bad_request("Only the author can edit this post"));
    }

    state
        .db
        .posts()
        .update(post_id, payload.title.trim(), &payload.contents)
        .await
        .db_err("Failed to update post")?;

    let post = load_post(&state.db, post_id).await?;
    Ok(ResponseMessage::ok("Post updated", PostResponse::from(post)))
}

async fn delete_post(
    State(state): State<PostsState>,
    Auth(auth): Auth,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    account::ensure_live(auth.user.state)?;
    let post = load_post(&state.db, post_id).await?;
    if post.user_id != auth.user.id {
        return Err(ApiError::bad_request("Only the author can delete this post"));
    }

    state
        .db
        .posts()
        .delete(post_id)
        .await
        .db_err("Failed to delete post")?;

    Ok(ResponseMessage::message("Post deleted"))
}
