//! Feedback comment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Longest comment body accepted.
pub const MAX_COMMENT_LENGTH: u64 = 4000;

/// A stored feedback comment. Comments are never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub instance_id: String,
    pub given_name: String,
    pub family_name: String,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub comment: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for `PostComment`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentRequest {
    /// May be empty when the device has not been paired yet.
    #[serde(default)]
    #[validate(length(max = 64, message = "Instance id cannot exceed 64 characters"))]
    pub instance_id: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "Given name cannot exceed 100 characters"))]
    pub given_name: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "Family name cannot exceed 100 characters"))]
    pub family_name: String,

    #[serde(default, deserialize_with = "shared::wire::opt_i32_from_str_or_number")]
    #[validate(custom(function = "shared::validation::validate_age"))]
    pub age: Option<i32>,

    #[serde(default, deserialize_with = "shared::wire::empty_string_as_none")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 4000, message = "Comment must be 1-4000 characters"))]
    pub comment: String,

    #[serde(default)]
    #[validate(length(max = 32, message = "Version cannot exceed 32 characters"))]
    pub version: String,
}

/// Body of the `PostComment` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResult {
    pub result: Uuid,
    pub driver_version: String,
}

/// `{ "body": { "result", "driverVersion" } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostCommentResponse {
    pub body: CommentResult,
}
