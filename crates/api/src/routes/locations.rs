//! Location endpoint handlers.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use domain::models::location::{
    CheckDistanceResponse, InstanceRequest, LocationListResponse, PostLocationRequest,
    PostLocationResponse, ResultBody,
};
use domain::services::check_pair_distance;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_distance_check, record_location_upserted};

/// Replace the latest location of one device in a pairing.
///
/// POST /PostLocationByInstanceId
pub async fn post_location(
    State(state): State<AppState>,
    payload: Result<Json<PostLocationRequest>, JsonRejection>,
) -> Result<Json<PostLocationResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let record = state.locations.upsert_location(request.into()).await?;
    record_location_upserted(record.device_id);

    info!(
        instance_id = %record.instance_id,
        device_id = %record.device_id,
        latitude = record.latitude,
        longitude = record.longitude,
        "Location upserted"
    );

    Ok(Json(PostLocationResponse::new(record.id)))
}

/// Every stored record of a pairing.
///
/// POST /GetLocationByInstanceId
pub async fn get_locations(
    State(state): State<AppState>,
    payload: Result<Json<InstanceRequest>, JsonRejection>,
) -> Result<Json<LocationListResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let records = state.locations.find_by_instance(&request.instance_id).await?;

    Ok(Json(LocationListResponse::new(records)))
}

/// Distance in feet between the phone and the watch of a pairing.
///
/// POST /CheckDistanceByInstanceId
pub async fn check_distance(
    State(state): State<AppState>,
    payload: Result<Json<InstanceRequest>, JsonRejection>,
) -> Result<Json<CheckDistanceResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let pair = check_pair_distance(state.locations.as_ref(), &request.instance_id).await?;
    record_distance_check(pair.records.len() == 2);

    info!(
        instance_id = %request.instance_id,
        distance_feet = pair.distance_feet,
        records = pair.records.len(),
        "Distance checked"
    );

    Ok(Json(CheckDistanceResponse {
        distance: pair.distance_feet,
        body: ResultBody {
            result: pair.records,
        },
    }))
}
