//! Feedback repository for database operations.

use domain::models::feedback::PostCommentRequest;
use domain::models::Feedback;
use domain::services::{FeedbackStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use super::store_error;
use crate::entities::FeedbackEntity;
use crate::metrics::QueryTimer;

/// Driver identifier reported to clients posting comments.
pub const POSTGRES_DRIVER_VERSION: &str = "sqlx-postgres/0.7";

/// Repository for feedback comments.
#[derive(Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    /// Creates a new FeedbackRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FeedbackStore for FeedbackRepository {
    async fn insert_comment(&self, comment: PostCommentRequest) -> Result<Feedback, StoreError> {
        let timer = QueryTimer::new("insert_comment");
        let result = sqlx::query_as::<_, FeedbackEntity>(
            r#"
            INSERT INTO feedback (id, instance_id, given_name, family_name, age, email, comment, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING id, instance_id, given_name, family_name, age, email, comment, version, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&comment.instance_id)
        .bind(&comment.given_name)
        .bind(&comment.family_name)
        .bind(comment.age)
        .bind(&comment.email)
        .bind(&comment.comment)
        .bind(&comment.version)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.into())
    }

    fn driver_version(&self) -> String {
        POSTGRES_DRIVER_VERSION.to_string()
    }
}
