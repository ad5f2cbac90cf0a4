//! HTTP middleware components.

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod rate_limit;

pub use auth::{require_client_key, ClientIdentity, ClientKeys, CLIENT_ID_HEADER};
pub use logging::{request_span, REQUEST_ID_HEADER};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rate_limit::{rate_limit_middleware, RateLimiterState};
