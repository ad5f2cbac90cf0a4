//! Integration tests for the location relay endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    create_test_app, get_request, json_request, json_request_with_key, json_request_without_key,
    location_body, parse_response_body, test_config,
};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_post_location_returns_record_id() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/PostLocationByInstanceId",
            location_body("X", "ios", 35.7314, -78.7811),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let id = body["body"]["result"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(app.store.location_count().unwrap(), 1);
}

#[tokio::test]
async fn test_post_location_twice_keeps_single_record() {
    let app = create_test_app(test_config());

    for (lat, lon) in [(35.0, -78.0), (36.5, -79.25)] {
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "/PostLocationByInstanceId",
                location_body("X", "ios", lat, lon),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/GetLocationByInstanceId",
            json!({ "instanceId": "X" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let records = body["body"]["result"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["latitude"], 36.5);
    assert_eq!(records[0]["longitude"], -79.25);
    assert_eq!(records[0]["deviceId"], "ios");
    assert_eq!(app.store.location_count().unwrap(), 1);
}

#[tokio::test]
async fn test_post_location_accepts_numeric_values() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/PostLocationByInstanceId",
            json!({
                "latitude": 10.5,
                "longitude": -20,
                "instanceId": "numeric",
                "deviceId": "watchos"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_check_distance_with_one_device_is_zero() {
    let app = create_test_app(test_config());

    app.router
        .clone()
        .oneshot(json_request(
            "/PostLocationByInstanceId",
            location_body("X", "ios", 35.7314, -78.7811),
        ))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/CheckDistanceByInstanceId",
            json!({ "instanceId": "X" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["distance"], 0.0);
    assert_eq!(body["body"]["result"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_check_distance_with_both_devices() {
    let app = create_test_app(test_config());

    for (device, lat) in [("ios", 35.7314), ("watchos", 35.7324)] {
        app.router
            .clone()
            .oneshot(json_request(
                "/PostLocationByInstanceId",
                location_body("pair", device, lat, -78.7811),
            ))
            .await
            .unwrap();
    }

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/CheckDistanceByInstanceId",
            json!({ "instanceId": "pair" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    // 0.001 degrees of latitude is roughly 365 feet.
    let distance = body["distance"].as_f64().unwrap();
    assert!(distance > 360.0 && distance < 370.0, "distance was {}", distance);
    assert_eq!(body["body"]["result"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_check_distance_unknown_instance() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/CheckDistanceByInstanceId",
            json!({ "instanceId": "nobody" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["distance"], 0.0);
    assert!(body["body"]["result"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_instances_are_isolated() {
    let app = create_test_app(test_config());

    app.router
        .clone()
        .oneshot(json_request(
            "/PostLocationByInstanceId",
            location_body("A", "ios", 1.0, 1.0),
        ))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/GetLocationByInstanceId",
            json!({ "instanceId": "B" }),
        ))
        .await
        .unwrap();

    let body = parse_response_body(response).await;
    assert!(body["body"]["result"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_client_key_is_rejected() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request_without_key(
            "/PostLocationByInstanceId",
            location_body("X", "ios", 1.0, 1.0),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(app.store.location_count().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_client_key_is_rejected() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request_with_key(
            "/CheckDistanceByInstanceId",
            json!({ "instanceId": "X" }),
            "not-a-real-key",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_latitude_out_of_range() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/PostLocationByInstanceId",
            location_body("X", "ios", 91.0, 0.5),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("latitude"));
    assert_eq!(body["details"][0]["field"], "latitude");
}

#[tokio::test]
async fn test_empty_instance_id_rejected() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/GetLocationByInstanceId",
            json!({ "instanceId": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_device_tag_rejected() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/PostLocationByInstanceId",
            location_body("X", "android", 1.0, 1.0),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.location_count().unwrap(), 0);
}

#[tokio::test]
async fn test_non_numeric_latitude_rejected() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/PostLocationByInstanceId",
            json!({
                "latitude": "north",
                "longitude": "1.0",
                "instanceId": "X",
                "deviceId": "ios"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limit_per_client_key() {
    let mut config = test_config();
    config.security.rate_limit_per_minute = 1;
    let app = create_test_app(config);

    let first = app
        .router
        .clone()
        .oneshot(json_request(
            "/GetLocationByInstanceId",
            json!({ "instanceId": "X" }),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .router
        .clone()
        .oneshot(json_request(
            "/GetLocationByInstanceId",
            json!({ "instanceId": "X" }),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));
    let body = parse_response_body(second).await;
    assert_eq!(body["error"], "rate_limit_exceeded");
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let app = create_test_app(test_config());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/GetLocationByInstanceId",
            json!({ "instanceId": "X" }),
        ))
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = create_test_app(test_config());

    for uri in ["/api/health", "/api/health/live", "/api/health/ready"] {
        let response = app.router.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/health"))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["connected"], true);
}
