//! Goal endpoints for the CM and OT programs.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use service::audit::{self, AuditAction, AuditEntry};
use service::goals::{self, GoalUpdate, NewGoal};

use crate::auth::{self, AppState};
use crate::errors::ApiError;

fn actor(headers: &HeaderMap) -> String {
    auth::user_email(headers).unwrap_or_else(|| "system".into())
}

pub async fn create_cm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewGoal>,
) -> Result<Json<Value>, ApiError> {
    let created = goals::create_cm(&state.db, input).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Create, "cm_goals")
            .record_id(created.id)
            .client_name(created.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers)),
    )
    .await;
    Ok(Json(json!({"success": true, "goal": created})))
}

pub async fn update_cm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<i32>,
    Json(update): Json<GoalUpdate>,
) -> Result<Json<Value>, ApiError> {
    let (updated, previous_status) = goals::update_cm(&state.db, goal_id, update).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "cm_goals")
            .record_id(updated.id)
            .client_name(updated.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"from": previous_status, "to": updated.status})),
    )
    .await;
    Ok(Json(json!({"success": true, "goal": updated})))
}

pub async fn delete_cm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let deleted = goals::delete_cm(&state.db, goal_id).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Delete, "cm_goals")
            .record_id(deleted.id)
            .client_name(deleted.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"goalText": deleted.goal_text, "status": deleted.status})),
    )
    .await;
    Ok(Json(json!({"success": true})))
}

pub async fn cm_progress(
    State(state): State<AppState>,
    Path(goal_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let history = goals::cm_progress_history(&state.db, goal_id).await?;
    Ok(Json(json!({"progress": history})))
}

pub async fn list_cm_by_client(
    State(state): State<AppState>,
    Path(client_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let rows = goals::list_cm_by_client(&state.db, &client_name).await?;
    Ok(Json(json!({"goals": rows})))
}

pub async fn create_ot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewGoal>,
) -> Result<Json<Value>, ApiError> {
    let created = goals::create_ot(&state.db, input).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Create, "ot_goals")
            .record_id(created.id)
            .client_name(created.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers)),
    )
    .await;
    Ok(Json(json!({"success": true, "goal": created})))
}

pub async fn update_ot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<i32>,
    Json(update): Json<GoalUpdate>,
) -> Result<Json<Value>, ApiError> {
    let (updated, previous_status) = goals::update_ot(&state.db, goal_id, update).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "ot_goals")
            .record_id(updated.id)
            .client_name(updated.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"from": previous_status, "to": updated.status})),
    )
    .await;
    Ok(Json(json!({"success": true, "goal": updated})))
}

pub async fn delete_ot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let deleted = goals::delete_ot(&state.db, goal_id).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Delete, "ot_goals")
            .record_id(deleted.id)
            .client_name(deleted.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"goalText": deleted.goal_text, "status": deleted.status})),
    )
    .await;
    Ok(Json(json!({"success": true})))
}

pub async fn ot_progress(
    State(state): State<AppState>,
    Path(goal_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let history = goals::ot_progress_history(&state.db, goal_id).await?;
    Ok(Json(json!({"progress": history})))
}

pub async fn list_ot_by_client(
    State(state): State<AppState>,
    Path(client_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let rows = goals::list_ot_by_client(&state.db, &client_name).await?;
    Ok(Json(json!({"goals": rows})))
}
