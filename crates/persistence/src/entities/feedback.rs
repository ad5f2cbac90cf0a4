//! Feedback entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the feedback table.
#[derive(Debug, Clone, FromRow)]
pub struct FeedbackEntity {
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

impl From<FeedbackEntity> for domain::models::Feedback {
    fn from(entity: FeedbackEntity) -> Self {
        Self {
            id: entity.id,
            instance_id: entity.instance_id,
            given_name: entity.given_name,
            family_name: entity.family_name,
            age: entity.age,
            email: entity.email,
            comment: entity.comment,
            version: entity.version,
            created_at: entity.created_at,
        }
    }
}
