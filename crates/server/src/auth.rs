//! Request identity and gating.
//!
//! Identity is asserted upstream: `x-user-email` names the caller and is
//! resolved against the users table when a route needs a capability flag.
//! The admin area is gated by a shared `x-admin-key` secret instead; when no
//! key is configured the admin routes fail closed.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use sea_orm::DatabaseConnection;

use service::audit::{self, AuditAction, AuditEntry};
use service::permissions::{PermissionKey, Permissions};
use service::rate_limit::SyncRateLimiter;

use crate::errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub admin_key: Option<String>,
    pub sync_limiter: Arc<SyncRateLimiter>,
}

/// Caller identity from `x-user-email`, if present.
pub fn user_email(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-email")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Best-effort client address: first `x-forwarded-for` hop, else `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Resolve the caller and require one capability flag. Missing identity is
/// 401; unknown, inactive, or unflagged callers are 403. Denials are audit
/// logged but the log write can never change the response.
pub async fn require_permission(
    db: &DatabaseConnection,
    headers: &HeaderMap,
    key: PermissionKey,
) -> Result<models::user::Model, ApiError> {
    let email = user_email(headers)
        .ok_or_else(|| ApiError::unauthorized("Missing x-user-email header"))?;

    let denial = |reason: &str| {
        AuditEntry::new(AuditAction::View, "users")
            .user(email.clone())
            .ip(client_ip(headers))
            .changes(serde_json::json!({"denied": reason, "permission": key}))
    };

    let found = models::user::find_by_email(db, &email)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Model(e)))?;
    let user = match found {
        Some(u) => u,
        None => {
            audit::record(db, denial("unknown user")).await;
            return Err(ApiError::forbidden("Unknown user"));
        }
    };
    if !user.active {
        audit::record(db, denial("inactive user")).await;
        return Err(ApiError::forbidden("User is inactive"));
    }
    if !Permissions::from_user(&user).get(key) {
        audit::record(db, denial("missing permission")).await;
        return Err(ApiError::forbidden("Permission denied"));
    }
    Ok(user)
}

/// As [`require_permission`], satisfied by any one of the listed flags.
/// Used where edit rights come in own/all variants.
pub async fn require_any_permission(
    db: &DatabaseConnection,
    headers: &HeaderMap,
    keys: &[PermissionKey],
) -> Result<models::user::Model, ApiError> {
    let email = user_email(headers)
        .ok_or_else(|| ApiError::unauthorized("Missing x-user-email header"))?;

    let denial = |reason: &str| {
        AuditEntry::new(AuditAction::View, "users")
            .user(email.clone())
            .ip(client_ip(headers))
            .changes(serde_json::json!({"denied": reason, "permissions": keys}))
    };

    let found = models::user::find_by_email(db, &email)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Model(e)))?;
    let user = match found {
        Some(u) => u,
        None => {
            audit::record(db, denial("unknown user")).await;
            return Err(ApiError::forbidden("Unknown user"));
        }
    };
    if !user.active {
        audit::record(db, denial("inactive user")).await;
        return Err(ApiError::forbidden("User is inactive"));
    }
    let perms = Permissions::from_user(&user);
    if !keys.iter().any(|k| perms.get(*k)) {
        audit::record(db, denial("missing permission")).await;
        return Err(ApiError::forbidden("Permission denied"));
    }
    Ok(user)
}

/// Admin-area gate. Fails closed when `ADMIN_API_KEY` is unset.
pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let configured = state
        .admin_key
        .as_deref()
        .ok_or_else(|| ApiError::forbidden("Admin access is not configured"))?;
    let presented = request
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing x-admin-key header"))?;
    if presented != configured {
        return Err(ApiError::forbidden("Invalid admin key"));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers).as_deref(), Some("198.51.100.4"));
        assert!(client_ip(&HeaderMap::new()).is_none());
    }

    #[test]
    fn blank_identity_is_treated_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-email", HeaderValue::from_static("   "));
        assert!(user_email(&headers).is_none());
    }
}
