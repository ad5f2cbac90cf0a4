//! In-process store for development and tests.
//!
//! Selected with a `memory://` database url. Contents are lost on restart.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use domain::models::feedback::PostCommentRequest;
use domain::models::{DeviceTag, Feedback, LocationRecord, NewLocation};
use domain::services::{FeedbackStore, LocationStore, StoreError};
use uuid::Uuid;

/// Driver identifier reported to clients posting comments.
pub const MEMORY_DRIVER_VERSION: &str = "memory";

type LocationKey = (String, DeviceTag);

/// Both relay collections held behind locks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    locations: RwLock<HashMap<LocationKey, LocationRecord>>,
    feedback: RwLock<Vec<Feedback>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored comment, oldest first.
    pub fn comments(&self) -> Result<Vec<Feedback>, StoreError> {
        Ok(self.feedback.read().map_err(poisoned)?.clone())
    }

    /// Number of location records across all instances.
    pub fn location_count(&self) -> Result<usize, StoreError> {
        Ok(self.locations.read().map_err(poisoned)?.len())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

#[async_trait::async_trait]
impl LocationStore for MemoryStore {
    async fn upsert_location(&self, location: NewLocation) -> Result<LocationRecord, StoreError> {
        let record = LocationRecord {
            id: Uuid::new_v4(),
            instance_id: location.instance_id,
            device_id: location.device_id,
            latitude: location.latitude,
            longitude: location.longitude,
            created_at: Utc::now(),
        };

        let mut locations = self.locations.write().map_err(poisoned)?;
        locations.insert(
            (record.instance_id.clone(), record.device_id),
            record.clone(),
        );
        Ok(record)
    }

    async fn find_by_instance(&self, instance_id: &str) -> Result<Vec<LocationRecord>, StoreError> {
        let locations = self.locations.read().map_err(poisoned)?;
        let mut records: Vec<LocationRecord> = locations
            .values()
            .filter(|r| r.instance_id == instance_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn latest_for_device(
        &self,
        instance_id: &str,
        device_id: DeviceTag,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let locations = self.locations.read().map_err(poisoned)?;
        Ok(locations
            .get(&(instance_id.to_string(), device_id))
            .cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.locations.read().map_err(poisoned).map(|_| ())
    }
}

#[async_trait::async_trait]
impl FeedbackStore for MemoryStore {
    async fn insert_comment(&self, comment: PostCommentRequest) -> Result<Feedback, StoreError> {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            instance_id: comment.instance_id,
            given_name: comment.given_name,
            family_name: comment.family_name,
            age: comment.age,
            email: comment.email,
            comment: comment.comment,
            version: comment.version,
            created_at: Utc::now(),
        };
        self.feedback.write().map_err(poisoned)?.push(feedback.clone());
        Ok(feedback)
    }

    fn driver_version(&self) -> String {
        MEMORY_DRIVER_VERSION.to_string()
    }
}
