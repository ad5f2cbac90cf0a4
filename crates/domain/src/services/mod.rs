//! Domain services.

pub mod geo;
pub mod proximity;
pub mod store;

pub use geo::{distance, DistanceUnit};
pub use proximity::{check_pair_distance, pair_distance, PairDistance};
pub use store::{FeedbackStore, LocationStore, StoreError};
