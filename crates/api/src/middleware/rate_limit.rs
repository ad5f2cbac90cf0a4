//! Rate limiting middleware.
//!
//! Provides per-client-key rate limiting using governor's GCRA limiter.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{Arc, PoisonError, RwLock},
};

use super::auth::ClientIdentity;
use crate::app::AppState;
use crate::error::ApiError;

/// Type alias for the rate limiter used per client key.
type KeyRateLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter state shared across all requests.
/// Holds one limiter per client key fingerprint.
pub struct RateLimiterState {
    limiters: RwLock<HashMap<String, Arc<KeyRateLimiter>>>,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// Create a new rate limiter state with the specified limit per minute.
    pub fn new(rate_limit_per_minute: u32) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            rate_limit_per_minute,
        }
    }

    /// Get or create a rate limiter for the given client.
    fn get_or_create_limiter(&self, client: &str) -> Arc<KeyRateLimiter> {
        {
            let limiters = self.limiters.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(limiter) = limiters.get(client) {
                return limiter.clone();
            }
        }

        let mut limiters = self.limiters.write().unwrap_or_else(PoisonError::into_inner);

        // Double-check in case another request created it
        if let Some(limiter) = limiters.get(client) {
            return limiter.clone();
        }

        let quota =
            Quota::per_minute(NonZeroU32::new(self.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(GovRateLimiter::direct(quota));
        limiters.insert(client.to_string(), limiter.clone());
        limiter
    }

    /// Check if a request from the given client should be allowed.
    /// Returns Ok(()) if allowed, or Err with retry_after seconds if rate limited.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        let limiter = self.get_or_create_limiter(client);

        match limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(DefaultClock::default().now());
                // Minimum 1 second
                Err(wait_time.as_secs().max(1))
            }
        }
    }

    fn active_limiters(&self) -> usize {
        self.limiters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("active_limiters", &self.active_limiters())
            .finish()
    }
}

/// Middleware that applies rate limiting per client key.
///
/// Must run after [`super::auth::require_client_key`], which stores the
/// caller identity in request extensions.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(identity) = req.extensions().get::<ClientIdentity>().cloned() else {
        return next.run(req).await;
    };

    if let Some(ref rate_limiter) = state.rate_limiter {
        if let Err(retry_after) = rate_limiter.check(&identity.fingerprint) {
            tracing::warn!(client = %identity.fingerprint, retry_after, "Rate limit exceeded");
            return ApiError::RateLimited {
                limit: state.config.security.rate_limit_per_minute,
                retry_after,
            }
            .into_response();
        }
    }

    next.run(req).await
}
