//! Per-device settings shared across a pairing.

use serde::{Deserialize, Serialize};

/// Settings persisted on each device and synced through the peer channel.
///
/// Zero and empty values mean "not configured yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSettings {
    pub instance_id: String,
    pub seconds_before_checking_location: u64,
    pub seconds_before_checking_distance: u64,
    /// Feet.
    pub distance_before_notifying: u64,
    pub show_background: bool,
}

impl DeviceSettings {
    pub fn has_instance_id(&self) -> bool {
        !self.instance_id.is_empty()
    }

    /// Merges settings received from the paired device.
    ///
    /// Fields are last-write-wins, except that zero or `false` never overwrites.
    /// The instance id is only adopted while the local one is unset.
    /// Returns whether anything changed.
    pub fn merge_from(&mut self, incoming: &DeviceSettings) -> bool {
        let before = self.clone();

        if !self.has_instance_id() && incoming.has_instance_id() {
            self.instance_id = incoming.instance_id.clone();
        }
        if incoming.seconds_before_checking_location != 0 {
            self.seconds_before_checking_location = incoming.seconds_before_checking_location;
        }
        if incoming.seconds_before_checking_distance != 0 {
            self.seconds_before_checking_distance = incoming.seconds_before_checking_distance;
        }
        if incoming.distance_before_notifying != 0 {
            self.distance_before_notifying = incoming.distance_before_notifying;
        }
        if incoming.show_background {
            self.show_background = true;
        }

        *self != before
    }
}
