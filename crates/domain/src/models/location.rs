//! Location record model and relay request/response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::device::DeviceTag;

/// Latest known location of one device in a pairing.
///
/// At most one record exists per `(instance_id, device_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub id: Uuid,
    pub instance_id: String,
    pub device_id: DeviceTag,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

/// Store input for an upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub instance_id: String,
    pub device_id: DeviceTag,
    pub latitude: f64,
    pub longitude: f64,
}

/// Request payload for `PostLocationByInstanceId`.
///
/// Devices send every value as a string; numbers are accepted as well.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostLocationRequest {
    #[validate(custom(function = "shared::validation::validate_instance_id"))]
    pub instance_id: String,

    pub device_id: DeviceTag,

    #[serde(deserialize_with = "shared::wire::f64_from_str_or_number")]
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[serde(deserialize_with = "shared::wire::f64_from_str_or_number")]
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
}

impl From<PostLocationRequest> for NewLocation {
    fn from(req: PostLocationRequest) -> Self {
        Self {
            instance_id: req.instance_id,
            device_id: req.device_id,
            latitude: req.latitude,
            longitude: req.longitude,
        }
    }
}

/// Request payload for the instance-keyed read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRequest {
    #[validate(custom(function = "shared::validation::validate_instance_id"))]
    pub instance_id: String,
}

/// `{ "result": ... }` wrapper used by every relay response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBody<T> {
    pub result: T,
}

/// `{ "body": { "result": ... } }` response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse<T> {
    pub body: ResultBody<T>,
}

impl<T> RelayResponse<T> {
    pub fn new(result: T) -> Self {
        Self {
            body: ResultBody { result },
        }
    }
}

/// Response of `PostLocationByInstanceId`: the stored document id.
pub type PostLocationResponse = RelayResponse<Uuid>;

/// Response of `GetLocationByInstanceId`.
pub type LocationListResponse = RelayResponse<Vec<LocationRecord>>;

/// Response of `CheckDistanceByInstanceId`.
///
/// `distance` is in feet, `0` unless both devices have reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDistanceResponse {
    pub distance: f64,
    pub body: ResultBody<Vec<LocationRecord>>,
}
