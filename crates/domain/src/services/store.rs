//! Document-store abstractions behind the relay handlers.
//!
//! The relay keeps two collections: the latest location per device per
//! pairing, and free-form feedback comments.

use crate::models::feedback::PostCommentRequest;
use crate::models::{DeviceTag, Feedback, LocationRecord, NewLocation};

/// Failure reported by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("stored document could not be decoded: {0}")]
    Corrupt(String),

    #[error("store error: {0}")]
    Backend(String),
}

/// Collection of [`LocationRecord`]s keyed by `(instance_id, device_id)`.
#[async_trait::async_trait]
pub trait LocationStore: Send + Sync {
    /// Replaces the record for `(instance_id, device_id)` in a single atomic
    /// operation, stamping it with the current server time.
    async fn upsert_location(&self, location: NewLocation) -> Result<LocationRecord, StoreError>;

    /// All records for an instance, across devices.
    async fn find_by_instance(&self, instance_id: &str) -> Result<Vec<LocationRecord>, StoreError>;

    /// Most recent record for one device of an instance.
    async fn latest_for_device(
        &self,
        instance_id: &str,
        device_id: DeviceTag,
    ) -> Result<Option<LocationRecord>, StoreError>;

    /// Cheap connectivity check for health probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Append-only collection of feedback comments.
#[async_trait::async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert_comment(&self, comment: PostCommentRequest) -> Result<Feedback, StoreError>;

    /// Identifies the backing driver in `PostComment` responses.
    fn driver_version(&self) -> String;
}
