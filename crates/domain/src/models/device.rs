//! Paired device identity.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which device of a pairing produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceTag {
    #[serde(rename = "ios")]
    Ios,
    #[serde(rename = "watchos")]
    WatchOs,
}

impl DeviceTag {
    /// Both devices of a pairing, in the order distance checks read them.
    pub const ALL: [DeviceTag; 2] = [DeviceTag::Ios, DeviceTag::WatchOs];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceTag::Ios => "ios",
            DeviceTag::WatchOs => "watchos",
        }
    }

    /// The other half of the pairing.
    pub fn counterpart(&self) -> DeviceTag {
        match self {
            DeviceTag::Ios => DeviceTag::WatchOs,
            DeviceTag::WatchOs => DeviceTag::Ios,
        }
    }
}

impl std::fmt::Display for DeviceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device tag: {0}")]
pub struct UnknownDeviceTag(pub String);

impl FromStr for DeviceTag {
    type Err = UnknownDeviceTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(DeviceTag::Ios),
            "watchos" => Ok(DeviceTag::WatchOs),
            other => Err(UnknownDeviceTag(other.to_string())),
        }
    }
}
