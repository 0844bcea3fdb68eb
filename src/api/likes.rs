//! Like toggle endpoints for posts and comments.

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
};
use serde::Serialize;

use super::error::ApiError;
use super::posts::PostsState;
use super::response::ResponseMessage;
use crate::account;
use crate::auth::{Auth, AuthenticatedUser};
use crate::db::LikeTarget;
use crate::likes::toggle_like;

/// Mounted on the posts router.
pub fn post_routes() -> Router<PostsState> {
    Router::new().route("/{post_id}/like", post(like_post))
}

/// Mounted on the comments router.
pub fn comment_routes() -> Router<PostsState> {
    Router::new().route("/{comment_id}/like", post(like_comment))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LikeResponse {
    id: i64,
    is_like: bool,
    likes: i64,
}

async fn toggle(
    state: &PostsState,
    actor: &AuthenticatedUser,
    target: LikeTarget,
) -> Result<ResponseMessage<LikeResponse>, ApiError> {
    account::ensure_live(actor.user.state)?;

    let outcome = toggle_like(&state.db, actor.user.id, target).await?;
    let message = if outcome.is_like { "Liked" } else { "Like cancelled" };

    Ok(ResponseMessage::ok(
        message,
        LikeResponse {
            id: target.id(),
            is_like: outcome.is_like,
            likes: outcome.likes,
        },
    ))
}

async fn like_post(
    State(state): State<PostsState>,
    Auth(auth): Auth,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(&state, &auth, LikeTarget::Post { post_id }).await
}

async fn like_comment(
    State(state): State<PostsState>,
    Auth(auth): Auth,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(
        &state,
        &auth,
        LikeTarget::Comment {
            post_id,
            comment_id,
        },
    )
    .await
}
