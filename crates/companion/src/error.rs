use domain::models::envelope::EnvelopeError;
use thiserror::Error;

use crate::peer::TransportError;
use crate::relay_client::RelayError;
use crate::settings::SettingsError;

/// Failures surfaced by the device-side components.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Location access has not been granted.
    #[error("location permission denied")]
    PermissionDenied,

    /// No instance id yet, so there is nothing to ask the relay about.
    #[error("device is not paired yet")]
    Unpaired,

    #[error("peer transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("relay failure: {0}")]
    Relay(#[from] RelayError),

    #[error("serialization failure: {0}")]
    Serialization(String),

    #[error("settings storage failure: {0}")]
    Storage(#[from] SettingsError),
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}

impl From<EnvelopeError> for TrackerError {
    fn from(err: EnvelopeError) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}
