//! Intake form endpoints. One form per client; submitting again replaces
//! the stored answers.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use service::audit::{self, AuditAction, AuditEntry};
use service::intake_forms::{self, IntakeSubmission};
use service::permissions::PermissionKey;

use crate::auth::{self, AppState};
use crate::errors::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeQuery {
    pub client_id: Option<i32>,
}

/// GET /api/intake-forms?clientId=N — the client's form, or null.
pub async fn fetch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IntakeQuery>,
) -> Result<Json<Value>, ApiError> {
    auth::require_permission(&state.db, &headers, PermissionKey::CanViewClientDemographics)
        .await?;
    let client_id = query
        .client_id
        .ok_or_else(|| ApiError::validation("Client ID is required"))?;
    let form = intake_forms::find_for_client(&state.db, client_id).await?;
    Ok(Json(json!({"form": form})))
}

/// POST /api/intake-forms — create or replace the client's form.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<IntakeSubmission>,
) -> Result<Json<Value>, ApiError> {
    let user = auth::require_permission(&state.db, &headers, PermissionKey::CanCreateContacts)
        .await?;
    let client_id = input.client_id;
    let (form, created) = intake_forms::save(&state.db, input).await?;
    let action = if created { AuditAction::Create } else { AuditAction::Update };
    audit::record(
        &state.db,
        AuditEntry::new(action, "intake_forms")
            .record_id(form.id)
            .user(user.email)
            .ip(auth::client_ip(&headers))
            .changes(json!({"clientId": client_id})),
    )
    .await;
    Ok(Json(json!({"success": true, "form": form})))
}
