//! Alert endpoints.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use service::alerts::{self, NewAlert};
use service::audit::{self, AuditAction, AuditEntry};

use crate::auth::{self, AppState};
use crate::errors::ApiError;

fn actor(headers: &HeaderMap) -> String {
    auth::user_email(headers).unwrap_or_else(|| "system".into())
}

/// GET /api/alerts — active alerts, with overdue ones expired on the way.
pub async fn list_active(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = alerts::list_active(&state.db).await?;
    Ok(Json(json!({"alerts": rows})))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewAlert>,
) -> Result<Json<Value>, ApiError> {
    let created = alerts::create(&state.db, input).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Create, "alerts")
            .record_id(created.id)
            .client_name(created.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers)),
    )
    .await;
    Ok(Json(json!({"success": true, "alert": created})))
}

/// DELETE /api/alerts/:id — resolves rather than removes.
pub async fn resolve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let resolved = alerts::resolve(&state.db, id).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "alerts")
            .record_id(resolved.id)
            .client_name(resolved.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"status": resolved.status})),
    )
    .await;
    Ok(Json(json!({"success": true, "alert": resolved})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearClientRequest {
    pub client_name: String,
}

pub async fn clear_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ClearClientRequest>,
) -> Result<Json<Value>, ApiError> {
    let removed = alerts::clear_client(&state.db, &req.client_name).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Delete, "alerts")
            .client_name(req.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"cleared": removed})),
    )
    .await;
    Ok(Json(json!({"success": true, "cleared": removed})))
}
