//! Feedback endpoint handler.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use domain::models::feedback::{CommentResult, PostCommentRequest, PostCommentResponse};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_comment_posted;

/// Store one free-form comment.
///
/// POST /PostComment
pub async fn post_comment(
    State(state): State<AppState>,
    payload: Result<Json<PostCommentRequest>, JsonRejection>,
) -> Result<Json<PostCommentResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let feedback = state.feedback.insert_comment(request).await?;
    record_comment_posted();

    info!(
        instance_id = %feedback.instance_id,
        comment_id = %feedback.id,
        version = %feedback.version,
        "Comment stored"
    );

    Ok(Json(PostCommentResponse {
        body: CommentResult {
            result: feedback.id,
            driver_version: state.feedback.driver_version(),
        },
    }))
}
