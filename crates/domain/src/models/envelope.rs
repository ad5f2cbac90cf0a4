//! The envelope exchanged between paired devices, the relay and the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::DeviceTag;

/// Channel/purpose of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    SyncSettings,
    UpdateLocation,
}

/// Lifecycle tag carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phrase {
    Sent,
    Received,
    Replied,
    Failed,
    Finished,
    Canceled,
    Authorized,
    Unauthorized,
    Connected,
    Disconnected,
    Checked,
}

/// Opaque metadata: a human-readable timestamp plus a serialized payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedColor {
    pub timestamp: String,
    #[serde(default)]
    pub payload: String,
}

impl TimedColor {
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn at(time: DateTime<Utc>, payload: impl Into<String>) -> Self {
        Self {
            timestamp: time.format(Self::TIMESTAMP_FORMAT).to_string(),
            payload: payload.into(),
        }
    }
}

/// Malformed envelope bytes.
#[derive(Debug, thiserror::Error)]
#[error("malformed envelope: {0}")]
pub struct EnvelopeError(#[from] serde_json::Error);

/// Request/reply envelope carried over the peer channel and mirrored to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEnvelope {
    pub command: Command,
    pub phrase: Phrase,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub instance_id: String,
    pub device_id: DeviceTag,
    #[serde(default)]
    pub timed_color: TimedColor,
    #[serde(default)]
    pub error_message: String,
}

impl LocationEnvelope {
    /// A freshly observed location, stamped with `now`.
    pub fn location_update(
        instance_id: impl Into<String>,
        device_id: DeviceTag,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            command: Command::UpdateLocation,
            phrase: Phrase::Sent,
            latitude,
            longitude,
            instance_id: instance_id.into(),
            device_id,
            timed_color: TimedColor::at(now, ""),
            error_message: String::new(),
        }
    }

    /// An envelope with no coordinates, used for status and settings traffic.
    pub fn status(
        command: Command,
        phrase: Phrase,
        instance_id: impl Into<String>,
        device_id: DeviceTag,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            command,
            phrase,
            latitude: 0.0,
            longitude: 0.0,
            instance_id: instance_id.into(),
            device_id,
            timed_color: TimedColor::at(now, ""),
            error_message: String::new(),
        }
    }

    /// `0.0, 0.0` is the "no location" sentinel.
    pub fn has_location(&self) -> bool {
        !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    pub fn has_instance_id(&self) -> bool {
        !self.instance_id.is_empty()
    }

    pub fn is_failure(&self) -> bool {
        self.phrase == Phrase::Failed || !self.error_message.is_empty()
    }

    pub fn with_phrase(mut self, phrase: Phrase) -> Self {
        self.phrase = phrase;
        self
    }

    /// Folds a peer reply into a `Replied` envelope.
    pub fn replied(mut self) -> Self {
        self.phrase = Phrase::Replied;
        self.error_message.clear();
        self
    }

    /// Marks the envelope as a failed delivery.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.phrase = Phrase::Failed;
        self.error_message = message.into();
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
