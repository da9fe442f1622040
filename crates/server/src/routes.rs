use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use common::types::Health;

use crate::auth::{self, AppState};

pub mod admin;
pub mod alerts;
pub mod checkins;
pub mod contacts;
pub mod goals;
pub mod intake;
pub mod outreach;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: public API plus the key-gated admin
/// area, with CORS and request tracing applied to everything.
pub fn build_router(cors: CorsLayer, state: AppState) -> Router {
    let api = Router::new()
        .route("/api/contacts", get(contacts::list))
        .route("/api/checkin", post(contacts::intake))
        .route("/api/update-services", post(contacts::update_services))
        .route("/api/complete-service", post(contacts::complete_service))
        .route("/api/bulk-update-services", post(contacts::bulk_update_services))
        .route("/api/filters", get(contacts::filters))
        .route("/api/intake-forms", get(intake::fetch).post(intake::submit))
        .route("/api/checkins", post(checkins::create_cm))
        .route("/api/checkins/:id", put(checkins::update_cm))
        .route("/api/checkins/by-contact/:contact_id", get(checkins::list_cm_by_contact))
        .route("/api/ot-checkins", post(checkins::create_ot))
        .route("/api/ot-checkins/:id", put(checkins::update_ot))
        .route("/api/ot-checkins/by-contact/:contact_id", get(checkins::list_ot_by_contact))
        .route("/api/goals", post(goals::create_cm))
        .route("/api/goals/by-client/:client_name", get(goals::list_cm_by_client))
        .route("/api/goals/:goal_id", put(goals::update_cm).delete(goals::delete_cm))
        .route("/api/goals/:goal_id/progress", get(goals::cm_progress))
        .route("/api/ot-goals", post(goals::create_ot))
        .route("/api/ot-goals/by-client/:client_name", get(goals::list_ot_by_client))
        .route("/api/ot-goals/:goal_id", put(goals::update_ot).delete(goals::delete_ot))
        .route("/api/ot-goals/:goal_id/progress", get(goals::ot_progress))
        .route("/api/alerts", get(alerts::list_active).post(alerts::create))
        .route("/api/alerts/:id", delete(alerts::resolve))
        .route("/api/alerts/clear-client", post(alerts::clear_client))
        .route("/api/outreach/runs", get(outreach::list_runs).post(outreach::create_run))
        .route(
            "/api/outreach/runs/:id",
            put(outreach::update_run).delete(outreach::delete_run),
        )
        .route(
            "/api/outreach/locations",
            get(outreach::list_locations).post(outreach::create_location),
        )
        .route(
            "/api/outreach/locations/:id",
            put(outreach::update_location).delete(outreach::delete_location),
        );

    let admin_routes = Router::new()
        .route("/api/admin/users", get(admin::list_users).post(admin::create_user))
        .route("/api/admin/users/:id", axum::routing::patch(admin::update_user))
        .route("/api/admin/audit-logs", get(admin::list_audit_logs))
        .route("/api/admin/audit-logs/export", get(admin::export_audit_logs))
        .route("/api/admin/audit-logs/stats", get(admin::audit_log_stats))
        .route(
            "/api/admin/data-management/client-summary",
            post(admin::client_summary),
        )
        .route(
            "/api/admin/data-management/delete-client",
            post(admin::delete_client),
        )
        .route("/api/admin/sync-services", post(admin::sync_services))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin_key));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .merge(admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
