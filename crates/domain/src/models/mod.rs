//! Domain models for the location relay.

pub mod device;
pub mod envelope;
pub mod feedback;
pub mod location;
pub mod settings;

pub use device::DeviceTag;
pub use envelope::{Command, LocationEnvelope, Phrase, TimedColor};
pub use feedback::Feedback;
pub use location::{LocationRecord, NewLocation};
pub use settings::DeviceSettings;
