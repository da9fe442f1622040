//! Street-outreach runs and locations. Plain CRUD; the planning UI owns the
//! richer workflow.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use serde_json::{json, Value};

use models::{outreach_location, outreach_run};
use service::errors::ServiceError;

use crate::auth::AppState;
use crate::errors::ApiError;

fn db_err(e: impl ToString) -> ApiError {
    ApiError::from(ServiceError::Db(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub run_date: NaiveDate,
    pub lead_staff: String,
    pub run_time: Option<String>,
    pub team_members: Option<String>,
    pub planned_locations: Option<String>,
    pub safety_notes: Option<String>,
}

pub async fn list_runs(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = outreach_run::Entity::find()
        .order_by_desc(outreach_run::Column::RunDate)
        .all(&state.db)
        .await
        .map_err(db_err)?;
    Ok(Json(json!({"runs": rows})))
}

pub async fn create_run(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.lead_staff.trim().is_empty() {
        return Err(ApiError::validation("Lead staff is required"));
    }
    let am = outreach_run::ActiveModel {
        run_date: Set(req.run_date),
        run_time: Set(req.run_time),
        lead_staff: Set(req.lead_staff.trim().to_string()),
        team_members: Set(req.team_members),
        planned_locations: Set(req.planned_locations),
        safety_notes: Set(req.safety_notes),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    let created = am.insert(&state.db).await.map_err(db_err)?;
    Ok(Json(json!({"success": true, "run": created})))
}

pub async fn update_run(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<RunRequest>,
) -> Result<Json<Value>, ApiError> {
    let existing = outreach_run::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ApiError::not_found("run not found"))?;
    let mut am: outreach_run::ActiveModel = existing.into();
    am.run_date = Set(req.run_date);
    am.run_time = Set(req.run_time);
    am.lead_staff = Set(req.lead_staff.trim().to_string());
    am.team_members = Set(req.team_members);
    am.planned_locations = Set(req.planned_locations);
    am.safety_notes = Set(req.safety_notes);
    let updated = am.update(&state.db).await.map_err(db_err)?;
    Ok(Json(json!({"success": true, "run": updated})))
}

pub async fn delete_run(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let res = outreach_run::Entity::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(db_err)?;
    if res.rows_affected == 0 {
        return Err(ApiError::not_found("run not found"));
    }
    Ok(Json(json!({"success": true})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub name: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn list_locations(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = outreach_location::Entity::find()
        .filter(outreach_location::Column::Active.eq(true))
        .order_by_desc(outreach_location::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_err)?;
    Ok(Json(json!({"locations": rows})))
}

pub async fn create_location(
    State(state): State<AppState>,
    Json(req): Json<LocationRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation("Location name is required"));
    }
    let am = outreach_location::ActiveModel {
        name: Set(req.name.trim().to_string()),
        address: Set(req.address),
        notes: Set(req.notes),
        active: Set(req.active),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    let created = am.insert(&state.db).await.map_err(db_err)?;
    Ok(Json(json!({"success": true, "location": created})))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<LocationRequest>,
) -> Result<Json<Value>, ApiError> {
    let existing = outreach_location::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ApiError::not_found("location not found"))?;
    let mut am: outreach_location::ActiveModel = existing.into();
    am.name = Set(req.name.trim().to_string());
    am.address = Set(req.address);
    am.notes = Set(req.notes);
    am.active = Set(req.active);
    let updated = am.update(&state.db).await.map_err(db_err)?;
    Ok(Json(json!({"success": true, "location": updated})))
}

pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let res = outreach_location::Entity::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(db_err)?;
    if res.rows_affected == 0 {
        return Err(ApiError::not_found("location not found"));
    }
    Ok(Json(json!({"success": true})))
}
