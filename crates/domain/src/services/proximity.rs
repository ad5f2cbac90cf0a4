//! Distance between the two devices of a pairing.

use tracing::debug;

use crate::models::{DeviceTag, LocationRecord};
use crate::services::geo::{distance, DistanceUnit};
use crate::services::store::{LocationStore, StoreError};

/// Outcome of a pairing distance check.
#[derive(Debug, Clone, PartialEq)]
pub struct PairDistance {
    /// Feet; `0` unless both devices have a record.
    pub distance_feet: f64,
    /// The records the distance was computed from.
    pub records: Vec<LocationRecord>,
}

/// Feet between the phone and watch records, or `0` if either is missing.
pub fn pair_distance(phone: Option<&LocationRecord>, watch: Option<&LocationRecord>) -> f64 {
    match (phone, watch) {
        (Some(a), Some(b)) => distance(
            a.latitude,
            a.longitude,
            b.latitude,
            b.longitude,
            DistanceUnit::Feet,
        ),
        _ => 0.0,
    }
}

/// Reads the latest record of each device in the pairing and measures
/// the distance between them.
pub async fn check_pair_distance(
    store: &dyn LocationStore,
    instance_id: &str,
) -> Result<PairDistance, StoreError> {
    let phone = store.latest_for_device(instance_id, DeviceTag::Ios).await?;
    let watch = store
        .latest_for_device(instance_id, DeviceTag::WatchOs)
        .await?;

    let distance_feet = pair_distance(phone.as_ref(), watch.as_ref());
    debug!(
        instance_id = %instance_id,
        has_phone = phone.is_some(),
        has_watch = watch.is_some(),
        distance_feet,
        "Pair distance computed"
    );

    Ok(PairDistance {
        distance_feet,
        records: phone.into_iter().chain(watch).collect(),
    })
}
