//! Like toggling for posts and comments.

use crate::db::{Database, LikeOutcome, LikeTarget};

#[derive(Debug, thiserror::Error)]
pub enum LikeError {
    #[error("Post not found")]
    PostNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("You cannot like your own post")]
    SelfLikePost,
    #[error("You cannot like your own comment")]
    SelfLikeComment,
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Like or unlike `target` on behalf of `actor_id`.
///
/// The author check runs before any edge is touched, so a self-like never
/// changes state.
pub async fn toggle_like(
    db: &Database,
    actor_id: i64,
    target: LikeTarget,
) -> Result<LikeOutcome, LikeError> {
    let author = match target {
        LikeTarget::Post { post_id } => db
            .posts()
            .author_of(post_id)
            .await?
            .ok_or(LikeError::PostNotFound)?,
        LikeTarget::Comment {
            post_id,
            comment_id,
        } => {
            if db.posts().author_of(post_id).await?.is_none() {
                return Err(LikeError::PostNotFound);
            }
            db.comments()
                .author_of(post_id, comment_id)
                .await?
                .ok_or(LikeError::CommentNotFound)?
        }
    };

    if author == actor_id {
        return Err(match target {
            LikeTarget::Post { .. } => LikeError::SelfLikePost,
            LikeTarget::Comment { .. } => LikeError::SelfLikeComment,
        });
    }

    let outcome = db.likes().toggle(actor_id, target).await?;
    tracing::info!(
        actor_id,
        target = ?target,
        is_like = outcome.is_like,
        likes = outcome.likes,
        "Like toggled"
    );
    Ok(outcome)
}
