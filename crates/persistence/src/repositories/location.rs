//! Location repository for database operations.

use domain::models::{DeviceTag, LocationRecord, NewLocation};
use domain::services::{LocationStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use super::store_error;
use crate::entities::LocationEntity;
use crate::metrics::QueryTimer;

/// Repository for location-related database operations.
#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    /// Creates a new LocationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl LocationStore for LocationRepository {
    /// Single-statement replace: the unique `(instance_id, device_id)` key
    /// turns a conflicting insert into an update of the existing row, which
    /// receives a fresh document id and timestamp.
    async fn upsert_location(&self, location: NewLocation) -> Result<LocationRecord, StoreError> {
        let timer = QueryTimer::new("upsert_location");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            INSERT INTO locations (id, instance_id, device_id, latitude, longitude, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (instance_id, device_id) DO UPDATE SET
                id = EXCLUDED.id,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                created_at = EXCLUDED.created_at
            RETURNING id, instance_id, device_id, latitude, longitude, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&location.instance_id)
        .bind(location.device_id.as_str())
        .bind(location.latitude)
        .bind(location.longitude)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result.map_err(store_error)?.try_into()
    }

    async fn find_by_instance(&self, instance_id: &str) -> Result<Vec<LocationRecord>, StoreError> {
        let timer = QueryTimer::new("find_locations_by_instance");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, instance_id, device_id, latitude, longitude, created_at
            FROM locations
            WHERE instance_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .into_iter()
            .map(LocationRecord::try_from)
            .collect()
    }

    async fn latest_for_device(
        &self,
        instance_id: &str,
        device_id: DeviceTag,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let timer = QueryTimer::new("latest_location_for_device");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, instance_id, device_id, latitude, longitude, created_at
            FROM locations
            WHERE instance_id = $1 AND device_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(instance_id)
        .bind(device_id.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(LocationRecord::try_from)
            .transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_error)
    }
}
