//! Admin authentication middleware.
//!
//! Admin routes require an `X-API-Key` header whose SHA-256 digest is listed
//! in `security.admin_api_key_hashes`. Keys themselves never reach the
//! configuration.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Authenticated admin caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AdminKey {
    /// Leading characters of the key digest, for logs.
    pub fingerprint: String,
}

/// Returns the caller if `api_key` hashes to one of `hashes`.
fn authenticate(hashes: &[String], api_key: &str) -> Option<AdminKey> {
    let digest = shared::crypto::sha256_hex(api_key);
    hashes
        .iter()
        .any(|hash| shared::crypto::constant_time_eq(&hash.trim().to_lowercase(), &digest))
        .then(|| AdminKey {
            fingerprint: digest[..8].to_string(),
        })
}

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty());

    let Some(api_key) = api_key else {
        return unauthorized_response("Invalid or missing API key");
    };

    match authenticate(&state.config.security.admin_api_key_hashes, api_key) {
        Some(admin) => {
            tracing::debug!(admin_key = %admin.fingerprint, "Admin request authenticated");
            req.extensions_mut().insert(admin);
            next.run(req).await
        }
        None => {
            tracing::warn!(path = %req.uri().path(), "Rejected admin request with unknown API key");
            unauthorized_response("Invalid or missing API key")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_response() {
        let response = unauthorized_response("Test message");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_authenticate_matches_digest() {
        let hashes = vec![shared::crypto::sha256_hex("dt_admin_secret")];
        let admin = authenticate(&hashes, "dt_admin_secret").unwrap();
        assert_eq!(admin.fingerprint, hashes[0][..8]);

        assert!(authenticate(&hashes, "dt_admin_other").is_none());
    }

    #[test]
    fn test_authenticate_accepts_uppercase_hashes() {
        let hashes = vec![shared::crypto::sha256_hex("key").to_uppercase()];
        assert!(authenticate(&hashes, "key").is_some());
    }

    #[test]
    fn test_no_configured_hashes_rejects_everything() {
        assert!(authenticate(&[], "anything").is_none());
    }
}
