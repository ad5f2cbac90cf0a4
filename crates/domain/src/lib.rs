//! Domain layer for the location relay.
//!
//! This crate contains:
//! - Domain models (LocationEnvelope, LocationRecord, Feedback, DeviceSettings)
//! - Distance computation between paired devices
//! - Store traits implemented by the persistence layer

pub mod models;
pub mod services;
