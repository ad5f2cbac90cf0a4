//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod feedback;
pub mod location;

pub use feedback::FeedbackEntity;
pub use location::LocationEntity;
