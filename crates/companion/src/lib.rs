//! Device-side half of the location relay: staleness gating, the relay
//! client, the peer link between phone and watch, and the tracker that
//! ties them together.

pub mod config;
pub mod error;
pub mod events;
pub mod peer;
pub mod relay_client;
pub mod settings;
pub mod staleness;
pub mod tracker;

pub use crate::config::CompanionConfig;
pub use error::TrackerError;
pub use events::{Event, EventBus};
pub use peer::{ActivationState, ChannelTransport, PeerLink, PeerTransport, TransportError};
pub use relay_client::{Ack, DistanceCheck, RelayClient, RelayError};
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsError, SettingsStore};
pub use staleness::{should_accept, StalenessGate};
pub use tracker::{LocationTracker, Observation, SkipReason};
