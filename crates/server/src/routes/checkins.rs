//! Check-in endpoints for the CM and OT programs. The CM and OT handlers are
//! the same shape over their respective tables.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use service::audit::{self, AuditAction, AuditEntry};
use service::checkins::{self, CheckinUpdate, NewCheckin};

use crate::auth::{self, AppState};
use crate::errors::ApiError;

pub async fn create_cm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewCheckin>,
) -> Result<Json<Value>, ApiError> {
    let created = checkins::create_cm(&state.db, input).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Create, "cm_checkins")
            .record_id(created.id)
            .client_name(created.client_name.clone())
            .user(auth::user_email(&headers).unwrap_or_else(|| "system".into()))
            .ip(auth::client_ip(&headers)),
    )
    .await;
    Ok(Json(json!({"success": true, "checkin": created})))
}

pub async fn update_cm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(update): Json<CheckinUpdate>,
) -> Result<Json<Value>, ApiError> {
    let updated = checkins::update_cm(&state.db, id, update).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "cm_checkins")
            .record_id(updated.id)
            .client_name(updated.client_name.clone())
            .user(auth::user_email(&headers).unwrap_or_else(|| "system".into()))
            .ip(auth::client_ip(&headers))
            .changes(json!({"status": updated.status})),
    )
    .await;
    Ok(Json(json!({"success": true, "checkin": updated})))
}

pub async fn list_cm_by_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let rows = checkins::list_cm_by_contact(&state.db, contact_id).await?;
    Ok(Json(json!({"checkins": rows})))
}

pub async fn create_ot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewCheckin>,
) -> Result<Json<Value>, ApiError> {
    let created = checkins::create_ot(&state.db, input).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Create, "ot_checkins")
            .record_id(created.id)
            .client_name(created.client_name.clone())
            .user(auth::user_email(&headers).unwrap_or_else(|| "system".into()))
            .ip(auth::client_ip(&headers)),
    )
    .await;
    Ok(Json(json!({"success": true, "checkin": created})))
}

pub async fn update_ot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(update): Json<CheckinUpdate>,
) -> Result<Json<Value>, ApiError> {
    let updated = checkins::update_ot(&state.db, id, update).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "ot_checkins")
            .record_id(updated.id)
            .client_name(updated.client_name.clone())
            .user(auth::user_email(&headers).unwrap_or_else(|| "system".into()))
            .ip(auth::client_ip(&headers))
            .changes(json!({"status": updated.status})),
    )
    .await;
    Ok(Json(json!({"success": true, "checkin": updated})))
}

pub async fn list_ot_by_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let rows = checkins::list_ot_by_contact(&state.db, contact_id).await?;
    Ok(Json(json!({"checkins": rows})))
}
