//! Client key authentication middleware.
//!
//! Every relay endpoint requires an `X-Client-Id` header carrying one of the
//! configured client keys. Keys are held only as SHA-256 digests.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::crypto::{digests_match, key_fingerprint, sha256_hex};

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the client key.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// Digests of the accepted client keys.
#[derive(Debug, Clone, Default)]
pub struct ClientKeys {
    digests: Vec<String>,
}

impl ClientKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let digests = keys
            .into_iter()
            .filter(|k| !k.as_ref().trim().is_empty())
            .map(|k| sha256_hex(k.as_ref()))
            .collect();
        Self { digests }
    }

    /// Returns the caller identity if `key` is one of the accepted keys.
    pub fn authenticate(&self, key: &str) -> Option<ClientIdentity> {
        let digest = sha256_hex(key);
        // Visit every digest so timing does not reveal which one matched.
        let matched = self
            .digests
            .iter()
            .fold(false, |found, d| digests_match(d, &digest) | found);

        matched.then(|| ClientIdentity {
            fingerprint: key_fingerprint(key),
        })
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Authenticated caller, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Log-safe key identifier, also the rate limiting key.
    pub fingerprint: String,
}

/// Middleware that requires a valid client key.
///
/// On success the [`ClientIdentity`] is stored in request extensions for the
/// rate limiter and handlers.
pub async fn require_client_key(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let key = req
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let Some(key) = key else {
        return unauthorized_response("Invalid or missing client key");
    };

    match state.client_keys.authenticate(key) {
        Some(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        None => {
            tracing::warn!(
                client = %key_fingerprint(key),
                "Rejected request with unknown client key"
            );
            unauthorized_response("Invalid or missing client key")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    ApiError::Unauthorized(message.to_string()).into_response()
}
