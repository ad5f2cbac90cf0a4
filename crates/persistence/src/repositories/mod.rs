//! Repository implementations for database operations.

pub mod feedback;
pub mod location;

pub use feedback::FeedbackRepository;
pub use location::LocationRepository;

use domain::services::StoreError;

/// Maps a driver error onto the store taxonomy.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(err.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}
