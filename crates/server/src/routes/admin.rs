//! Admin area: user management, audit-log review and export, the two-step
//! client deletion, and the monthly summary sync. Every route here sits
//! behind the x-admin-key middleware.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use serde_json::{json, Value};

use common::pagination::Pagination;
use models::{audit_log, user};
use service::audit::{self, AuditAction, AuditEntry};
use service::client_deletion::{self, DeletionRequest};
use service::errors::ServiceError;
use service::monthly_sync;
use service::permissions::{Permissions, RoleTemplate};

use crate::auth::{self, AppState};
use crate::errors::ApiError;

fn db_err(e: impl ToString) -> ApiError {
    ApiError::from(ServiceError::Db(e.to_string()))
}

fn actor(headers: &HeaderMap) -> String {
    auth::user_email(headers).unwrap_or_else(|| "admin".into())
}

fn user_json(u: &user::Model) -> Value {
    let perms = Permissions::from_user(u);
    json!({
        "id": u.id,
        "email": u.email,
        "active": u.active,
        "role": service::permissions::role_for(&perms).name(),
        "permissions": perms,
        "createdAt": u.created_at,
        "updatedAt": u.updated_at,
    })
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rows = user::Entity::find()
        .order_by_asc(user::Column::Email)
        .all(&state.db)
        .await
        .map_err(db_err)?;
    let users: Vec<Value> = rows.iter().map(user_json).collect();
    Ok(Json(json!({"users": users})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub role: Option<String>,
    pub permissions: Option<Permissions>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn apply_permissions(am: &mut user::ActiveModel, perms: &Permissions) {
    am.can_view_client_demographics = Set(perms.can_view_client_demographics);
    am.can_view_client_services = Set(perms.can_view_client_services);
    am.can_view_all_clients = Set(perms.can_view_all_clients);
    am.can_export_client_data = Set(perms.can_export_client_data);
    am.can_manage_users = Set(perms.can_manage_users);
    am.can_manage_system_settings = Set(perms.can_manage_system_settings);
    am.can_view_audit_logs = Set(perms.can_view_audit_logs);
    am.can_manage_database = Set(perms.can_manage_database);
    am.can_create_contacts = Set(perms.can_create_contacts);
    am.can_edit_own_contacts = Set(perms.can_edit_own_contacts);
    am.can_edit_all_contacts = Set(perms.can_edit_all_contacts);
    am.can_delete_contacts = Set(perms.can_delete_contacts);
}

/// POST /api/admin/users — explicit permissions win over the role template;
/// the template is only a preset.
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("A valid email address is required"));
    }
    if user::find_by_email(&state.db, &email)
        .await
        .map_err(|e| ApiError::from(ServiceError::Model(e)))?
        .is_some()
    {
        return Err(ApiError::validation("A user with this email already exists"));
    }

    let perms = match (&req.permissions, &req.role) {
        (Some(explicit), _) => *explicit,
        (None, Some(role_name)) => RoleTemplate::parse(role_name)
            .ok_or_else(|| {
                ApiError::validation(format!("Unknown role: {role_name}")).details(json!({
                    "validValues": RoleTemplate::NAMED.iter().map(|t| t.name()).collect::<Vec<_>>(),
                }))
            })?
            .defaults(),
        (None, None) => return Err(ApiError::validation("Either role or permissions is required")),
    };
    if !perms.any() {
        return Err(ApiError::validation("At least one permission must be granted"));
    }

    let mut am = user::ActiveModel {
        email: Set(email.clone()),
        active: Set(req.active),
        ..Default::default()
    };
    apply_permissions(&mut am, &perms);
    let created = user::create(&state.db, am)
        .await
        .map_err(|e| ApiError::from(ServiceError::Model(e)))?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Create, "users")
            .record_id(created.id)
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"email": email, "role": service::permissions::role_for(&perms).name()})),
    )
    .await;

    Ok(Json(json!({"success": true, "user": user_json(&created)})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub active: Option<bool>,
    pub permissions: Option<Permissions>,
}

pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.active.is_none() && req.permissions.is_none() {
        return Err(ApiError::validation("No valid fields provided for update"));
    }
    let existing = user::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::from(ServiceError::Model(e)))?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let mut am: user::ActiveModel = existing.into();
    if let Some(active) = req.active {
        am.active = Set(active);
    }
    if let Some(perms) = &req.permissions {
        apply_permissions(&mut am, perms);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&state.db).await.map_err(db_err)?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "users")
            .record_id(updated.id)
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"active": updated.active})),
    )
    .await;

    Ok(Json(json!({"success": true, "user": user_json(&updated)})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogFilters {
    pub user: Option<String>,
    pub action: Option<String>,
    pub table_name: Option<String>,
    pub client_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub per_page: Option<u64>,
}

fn audit_condition(filters: &AuditLogFilters) -> Condition {
    let mut cond = Condition::all();
    if let Some(user_email) = filters.user.as_deref().filter(|s| !s.is_empty()) {
        cond = cond.add(audit_log::Column::UserEmail.eq(user_email));
    }
    if let Some(action) = filters.action.as_deref().filter(|s| !s.is_empty()) {
        cond = cond.add(audit_log::Column::Action.eq(action));
    }
    if let Some(table) = filters.table_name.as_deref().filter(|s| !s.is_empty()) {
        cond = cond.add(audit_log::Column::TableName.eq(table));
    }
    if let Some(client) = filters.client_name.as_deref().filter(|s| !s.is_empty()) {
        cond = cond.add(audit_log::Column::ClientName.eq(client));
    }
    if let Some(start) = filters.start_date {
        cond = cond.add(audit_log::Column::Timestamp.gte(start.and_time(NaiveTime::MIN).and_utc()));
    }
    if let Some(end) = filters.end_date {
        let exclusive = end + chrono::Days::new(1);
        cond = cond.add(audit_log::Column::Timestamp.lt(exclusive.and_time(NaiveTime::MIN).and_utc()));
    }
    cond
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(filters): Query<AuditLogFilters>,
) -> Result<Json<Value>, ApiError> {
    let pagination = Pagination {
        page: filters.page.unwrap_or(1),
        per_page: filters.per_page.unwrap_or(50),
    };
    let (page_idx, per_page) = pagination.normalize();

    let query = audit_log::Entity::find().filter(audit_condition(&filters));
    let total = query.clone().count(&state.db).await.map_err(db_err)?;
    let rows = query
        .order_by_desc(audit_log::Column::Timestamp)
        .order_by_desc(audit_log::Column::Id)
        .offset(page_idx * per_page)
        .limit(per_page)
        .all(&state.db)
        .await
        .map_err(db_err)?;

    Ok(Json(json!({
        "logs": rows,
        "pagination": {
            "page": pagination.page.max(1),
            "perPage": per_page,
            "total": total,
            "totalPages": pagination.total_pages(total),
        }
    })))
}

const EXPORT_HEADERS: [&str; 8] =
    ["ID", "Timestamp", "User", "Action", "Table", "Record ID", "Client", "Changes"];

/// GET /api/admin/audit-logs/export — full filtered set as quoted CSV with a
/// date-stamped attachment filename.
pub async fn export_audit_logs(
    State(state): State<AppState>,
    Query(filters): Query<AuditLogFilters>,
) -> Result<Response, ApiError> {
    let rows = audit_log::Entity::find()
        .filter(audit_condition(&filters))
        .order_by_desc(audit_log::Column::Timestamp)
        .all(&state.db)
        .await
        .map_err(db_err)?;

    let data: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.timestamp.to_rfc3339(),
                r.user_email.clone(),
                r.action.clone(),
                r.table_name.clone(),
                r.record_id.clone().unwrap_or_default(),
                r.client_name.clone().unwrap_or_default(),
                r.changes.as_ref().map(|c| c.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    let body = common::csv::encode(&EXPORT_HEADERS, &data);
    let filename = format!("audit-logs-{}.csv", Utc::now().date_naive());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

pub async fn audit_log_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = audit_log::Entity::find().count(&state.db).await.map_err(db_err)?;
    let mut by_action = serde_json::Map::new();
    for action in [
        AuditAction::View,
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
    ] {
        let n = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq(action.as_str()))
            .count(&state.db)
            .await
            .map_err(db_err)?;
        by_action.insert(action.as_str().to_string(), json!(n));
    }
    let users: Vec<String> = audit_log::Entity::find()
        .select_only()
        .column(audit_log::Column::UserEmail)
        .distinct()
        .into_tuple()
        .all(&state.db)
        .await
        .map_err(db_err)?;

    Ok(Json(json!({
        "total": total,
        "byAction": by_action,
        "distinctUsers": users.len(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummaryRequest {
    pub client_name: String,
}

/// POST /api/admin/data-management/client-summary — step one of deletion.
pub async fn client_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ClientSummaryRequest>,
) -> Result<Json<Value>, ApiError> {
    let summary = client_deletion::summarize(&state.db, &req.client_name).await?;
    let total = summary.total();
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::View, "clients")
            .client_name(summary.client_name.clone())
            .user(actor(&headers))
            .ip(auth::client_ip(&headers))
            .changes(json!({"deletionSummary": &summary})),
    )
    .await;
    Ok(Json(json!({"summary": summary, "totalRecords": total})))
}

/// POST /api/admin/data-management/delete-client — step two; requires the
/// client's name typed back exactly.
pub async fn delete_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DeletionRequest>,
) -> Result<Json<Value>, ApiError> {
    let deleted_by = actor(&headers);
    let outcome = client_deletion::execute(&state.db, req, &deleted_by).await?;
    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Delete, "clients")
            .client_name(outcome.summary.client_name.clone())
            .user(deleted_by)
            .ip(auth::client_ip(&headers))
            .changes(json!({"deleted": &outcome.summary})),
    )
    .await;
    Ok(Json(json!({"success": true, "deleted": outcome.summary})))
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub month: u32,
    pub year: i32,
}

/// POST /api/admin/sync-services — monthly summary rebuild, one run per
/// caller per minute.
pub async fn sync_services(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SyncRequest>,
) -> Result<Json<Value>, ApiError> {
    let caller = actor(&headers);
    if let Err(remaining) = state.sync_limiter.try_acquire(&caller) {
        return Err(ApiError::from(ServiceError::RateLimited(format!(
            "Sync was run recently; retry in {}s",
            remaining.as_secs().max(1)
        ))));
    }

    let started = Instant::now();
    let outcome = monthly_sync::run(&state.db, req.month, req.year).await?;
    let duration_ms = started.elapsed().as_millis() as u64;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "monthly_service_summary")
            .user(caller)
            .ip(auth::client_ip(&headers))
            .changes(json!({"month": outcome.month, "year": outcome.year, "clients": outcome.clients_summarized})),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "month": outcome.month,
        "year": outcome.year,
        "recordsProcessed": outcome.contacts_scanned,
        "clientsSummarized": outcome.clients_summarized,
        "durationMs": duration_ms,
        "message": format!(
            "Monthly summary rebuilt for {}/{}",
            outcome.month, outcome.year
        ),
    })))
}
