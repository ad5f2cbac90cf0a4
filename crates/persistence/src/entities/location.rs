//! Location entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{DeviceTag, LocationRecord};
use domain::services::StoreError;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the locations table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationEntity {
    pub id: Uuid,
    pub instance_id: String,
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LocationEntity> for LocationRecord {
    type Error = StoreError;

    fn try_from(entity: LocationEntity) -> Result<Self, Self::Error> {
        let device_id: DeviceTag = entity
            .device_id
            .parse()
            .map_err(|e: domain::models::device::UnknownDeviceTag| {
                StoreError::Corrupt(format!("location {}: {}", entity.id, e))
            })?;

        Ok(Self {
            id: entity.id,
            instance_id: entity.instance_id,
            device_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            created_at: entity.created_at,
        })
    }
}
