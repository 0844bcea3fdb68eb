//! Comments API, nested under `/posts/{post_id}/comments`.

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::{ApiError, ResultExt};
use super::likes;
use super::posts::{PostsState, load_post};
use super::response::ResponseMessage;
use super::validation::{ValidJson, not_blank};
use crate::account;
use crate::auth::Auth;
use crate::db::{Comment, Database};

pub fn router() -> Router<PostsState> {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route(
            "/{comment_id}",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
        .merge(likes::comment_routes())
}

#[derive(Deserialize, Validate)]
struct CommentRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    contents: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentResponse {
    id: i64,
    post_id: i64,
    user_id: String,
    contents: String,
    likes: i64,
    created_at: String,
    modified_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.author,
            contents: comment.contents,
            likes: comment.likes,
            created_at: comment.created_at,
            modified_at: comment.updated_at,
        }
    }
}

async fn load_comment(db: &Database, post_id: i64, comment_id: i64) -> Result<Comment, ApiError> {
    load_post(db, post_id).await?;
    db.comments()
        .get(post_id, comment_id)
        .await
        .db_err("Failed to load comment")?
        .ok_or_else(|| ApiError::bad_request("Comment not found on this post"))
}

async fn list_comments(
    State(state): State<PostsState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    load_post(&state.db, post_id).await?;

    let comments = state
        .db
        .comments()
        .list_by_post(post_id)
        .await
        .db_err("Failed to list comments")?;

    if comments.is_empty() {
        return Err(ApiError::empty("No comments on this post yet"));
    }

    Ok(ResponseMessage::ok(
        "Comments loaded",
        comments
            .into_iter()
            .map(CommentResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn create_comment(
    State(state): State<PostsState>,
    Auth(auth): Auth,
    Path(post_id): Path<i64>,
    ValidJson(payload): ValidJson<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    account::ensure_live(auth.user.state)?;
    load_post(&state.db, post_id).await?;

    let id = state
        .db
        .comments()
        .create(post_id, auth.user.id, &payload.contents)
        .await
        .db_err("Failed to create comment")?;

    let comment = load_comment(&state.db, post_id, id).await?;
    Ok(ResponseMessage::created(
        "Comment created",
        CommentResponse::from(comment),
    ))
}

async fn get_comment(
    State(state): State<PostsState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = load_comment(&state.db, post_id, comment_id).await?;
    Ok(ResponseMessage::ok(
        "Comment loaded",
        CommentResponse::from(comment),
    ))
}

async fn update_comment(
    State(state): State<PostsState>,
    Auth(auth): Auth,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    ValidJson(payload): ValidJson<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    account::ensure_live(auth.user.state)?;
    let comment = load_comment(&state.db, post_id, comment_id).await?;
    if comment.user_id != auth.user.id {
        return Err(ApiError::bad_request(
            "Only the author can edit this comment",
        ));
    }

    state
        .db
        .comments()
        .update(comment_id, &payload.contents)
        .await
        .db_err("Failed to update comment")?;

    let comment = load_comment(&state.db, post_id, comment_id).await?;
    Ok(ResponseMessage::ok(
        "Comment updated",
        CommentResponse::from(comment),
    ))
}

async fn delete_comment(
    State(state): State<PostsState>,
    Auth(auth): Auth,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    account::ensure_live(auth.user.state)?;
    let comment = load_comment(&state.db, post_id, comment_id).await?;
    if comment.user_id != auth.user.id {
        return Err(ApiError::bad_request(
            "Only the author can delete this comment",
        ));
    }

    state
        .db
        .comments()
        .delete(comment_id)
        .await
        .db_err("Failed to delete comment")?;

    Ok(ResponseMessage::message("Comment deleted"))
}
