//! HTTP client for the location relay.
//!
//! Request bodies are flat JSON objects whose values are all strings. Any
//! response body that decodes to a JSON object counts as success; the HTTP
//! status is not inspected. Nothing is retried.

use std::collections::BTreeMap;
use std::time::Duration;

use domain::models::feedback::PostCommentRequest;
use domain::models::{LocationEnvelope, LocationRecord};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CompanionConfig;

/// Header carrying the client key.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from relay: {0}")]
    InvalidResponse(String),
}

/// Decoded relay response.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    /// `body.result` when it is a string (record or comment id).
    pub result: Option<String>,
    /// The full response object.
    pub response: Map<String, Value>,
}

impl Ack {
    fn from_response(response: Map<String, Value>) -> Self {
        let result = response
            .get("body")
            .and_then(|b| b.get("result"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { result, response }
    }
}

/// Outcome of a distance check against the notification threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceCheck {
    /// Feet between the paired devices, `0` until both have reported.
    pub distance: f64,
    pub exceeded: bool,
}

#[derive(Debug, Deserialize)]
struct DistanceReply {
    #[serde(deserialize_with = "shared::wire::f64_from_str_or_number")]
    distance: f64,
}

#[derive(Debug, Deserialize)]
struct RecordsReply {
    body: RecordsBody,
}

#[derive(Debug, Deserialize)]
struct RecordsBody {
    result: Vec<LocationRecord>,
}

type Params = BTreeMap<&'static str, String>;

#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
    client_key: String,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(
        base_url: impl Into<String>,
        client_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            client_key: client_key.into(),
            timeout,
        })
    }

    pub fn from_config(config: &CompanionConfig) -> Result<Self, RelayError> {
        Self::new(
            config.relay_url.clone(),
            config.client_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replaces the relay's record for the envelope's device.
    pub async fn post_location(&self, envelope: &LocationEnvelope) -> Result<Ack, RelayError> {
        let params = Params::from([
            ("latitude", envelope.latitude.to_string()),
            ("longitude", envelope.longitude.to_string()),
            ("instanceId", envelope.instance_id.clone()),
            ("deviceId", envelope.device_id.to_string()),
        ]);
        let response = self.post("PostLocationByInstanceId", &params).await?;
        Ok(Ack::from_response(response))
    }

    /// Distance between the paired devices, compared against
    /// `notify_threshold_feet`. A zero threshold is unsynced and never exceeded.
    pub async fn check_distance(
        &self,
        instance_id: &str,
        notify_threshold_feet: f64,
    ) -> Result<DistanceCheck, RelayError> {
        let params = Params::from([("instanceId", instance_id.to_string())]);
        let response = self.post("CheckDistanceByInstanceId", &params).await?;

        let reply: DistanceReply = serde_json::from_value(Value::Object(response))
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;

        Ok(DistanceCheck {
            distance: reply.distance,
            exceeded: notify_threshold_feet > 0.0 && reply.distance > notify_threshold_feet,
        })
    }

    /// Every record the relay holds for the pairing.
    pub async fn get_locations(&self, instance_id: &str) -> Result<Vec<LocationRecord>, RelayError> {
        let params = Params::from([("instanceId", instance_id.to_string())]);
        let response = self.post("GetLocationByInstanceId", &params).await?;

        let reply: RecordsReply = serde_json::from_value(Value::Object(response))
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        Ok(reply.body.result)
    }

    /// Sends a feedback form; the ack carries the comment id.
    pub async fn post_comment(&self, comment: &PostCommentRequest) -> Result<Ack, RelayError> {
        let params = Params::from([
            ("instanceId", comment.instance_id.clone()),
            ("givenName", comment.given_name.clone()),
            ("familyName", comment.family_name.clone()),
            ("age", comment.age.map(|a| a.to_string()).unwrap_or_default()),
            ("email", comment.email.clone().unwrap_or_default()),
            ("comment", comment.comment.clone()),
            ("version", comment.version.clone()),
        ]);
        let response = self.post("PostComment", &params).await?;
        Ok(Ack::from_response(response))
    }

    async fn post(&self, endpoint: &str, params: &Params) -> Result<Map<String, Value>, RelayError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .header(CLIENT_ID_HEADER, &self.client_key)
            .json(params)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => {
                if !status.is_success() {
                    debug!(endpoint, status = %status, "Relay answered with non-success status");
                }
                Ok(map)
            }
            Ok(other) => {
                warn!(endpoint, status = %status, "Relay response is not a JSON object");
                Err(RelayError::InvalidResponse(format!(
                    "expected JSON object, got {}",
                    other
                )))
            }
            Err(e) => {
                warn!(endpoint, status = %status, error = %e, "Relay response is not JSON");
                Err(RelayError::InvalidResponse(e.to_string()))
            }
        }
    }

    fn classify(&self, err: reqwest::Error) -> RelayError {
        if err.is_timeout() {
            RelayError::Timeout(self.timeout)
        } else {
            RelayError::Http(err)
        }
    }
}
