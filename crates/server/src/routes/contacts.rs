//! Contact listing, front-desk intake, and service reconciliation endpoints.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use serde_json::{json, Value};

use common::pagination::Pagination;
use models::{client, contact};
use service::audit::{self, AuditAction, AuditEntry};
use service::permissions::PermissionKey;
use service::services_sync::{
    self, BulkServicesItem, ProvidedService, ServiceKind, ServicesUpdate,
};

use crate::auth::{self, AppState};
use crate::errors::ApiError;

const EDIT_KEYS: [PermissionKey; 2] =
    [PermissionKey::CanEditAllContacts, PermissionKey::CanEditOwnContacts];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilters {
    pub provider: Option<String>,
    pub client: Option<String>,
    pub category: Option<String>,
    pub service: Option<String>,
    pub date: Option<NaiveDate>,
    pub days_ago: Option<i64>,
    pub page: Option<u64>,
    #[serde(alias = "limit")]
    pub per_page: Option<u64>,
}

fn mirror_columns(kind: ServiceKind) -> (contact::Column, contact::Column) {
    use contact::Column as C;
    match kind {
        ServiceKind::CaseManagement => (C::CaseManagementRequested, C::CaseManagementProvided),
        ServiceKind::OccupationalTherapy => {
            (C::OccupationalTherapyRequested, C::OccupationalTherapyProvided)
        }
        ServiceKind::Food => (C::FoodRequested, C::FoodProvided),
        ServiceKind::Healthcare => (C::HealthcareRequested, C::HealthcareProvided),
        ServiceKind::Housing => (C::HousingRequested, C::HousingProvided),
        ServiceKind::Employment => (C::EmploymentRequested, C::EmploymentProvided),
        ServiceKind::Benefits => (C::BenefitsRequested, C::BenefitsProvided),
        ServiceKind::Legal => (C::LegalRequested, C::LegalProvided),
        ServiceKind::Transportation => (C::TransportationRequested, C::TransportationProvided),
        ServiceKind::Childcare => (C::ChildcareRequested, C::ChildcareProvided),
        ServiceKind::MentalHealth => (C::MentalHealthRequested, C::MentalHealthProvided),
        ServiceKind::SubstanceAbuse => (C::SubstanceAbuseRequested, C::SubstanceAbuseProvided),
        ServiceKind::Education => (C::EducationRequested, C::EducationProvided),
    }
}

/// GET /api/contacts — filtered, paginated listing. Every filter is a typed
/// column predicate; nothing is interpolated into SQL text.
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<ContactFilters>,
) -> Result<Json<Value>, ApiError> {
    auth::require_permission(&state.db, &headers, PermissionKey::CanViewClientServices).await?;

    let mut cond = Condition::all();
    if let Some(provider) = filters.provider.as_deref().filter(|s| !s.is_empty()) {
        cond = cond.add(contact::Column::ProviderName.eq(provider));
    }
    if let Some(client_name) = filters.client.as_deref().filter(|s| !s.is_empty()) {
        cond = cond.add(contact::Column::ClientName.eq(client_name));
    }
    if let Some(category) = filters.category.as_deref().filter(|s| !s.is_empty()) {
        cond = cond.add(contact::Column::Category.eq(category));
    }
    if let Some(service) = filters.service.as_deref().filter(|s| !s.is_empty()) {
        let kind = ServiceKind::parse(service).ok_or_else(|| {
            ApiError::validation(format!("Unknown service: {service}")).details(json!({
                "field": "service",
                "validValues": ServiceKind::ALL.iter().map(|k| k.name()).collect::<Vec<_>>(),
            }))
        })?;
        let (requested, provided) = mirror_columns(kind);
        cond = cond.add(Condition::any().add(requested.eq(1)).add(provided.eq(1)));
    }
    if let Some(date) = filters.date {
        cond = cond.add(contact::Column::ContactDate.eq(date));
    }
    if let Some(days_ago) = filters.days_ago {
        if days_ago < 0 {
            return Err(ApiError::validation("daysAgo must be non-negative"));
        }
        let cutoff = Utc::now().date_naive() - chrono::Days::new(days_ago as u64);
        cond = cond.add(contact::Column::ContactDate.gte(cutoff));
    }

    let pagination = Pagination {
        page: filters.page.unwrap_or(1),
        per_page: filters.per_page.unwrap_or(50),
    };
    let (page_idx, per_page) = pagination.normalize();

    let query = contact::Entity::find().filter(cond);
    let total = query
        .clone()
        .count(&state.db)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Db(e.to_string())))?;
    let rows = query
        .order_by_desc(contact::Column::ContactDate)
        .order_by_desc(contact::Column::Id)
        .offset(page_idx * per_page)
        .limit(per_page)
        .all(&state.db)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Db(e.to_string())))?;

    Ok(Json(json!({
        "contacts": rows,
        "pagination": {
            "page": pagination.page.max(1),
            "perPage": per_page,
            "total": total,
            "totalPages": pagination.total_pages(total),
        }
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRequest {
    pub client_name: String,
    pub provider_name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub services_requested: Vec<String>,
    #[serde(default)]
    pub food_accessed: bool,
    pub comments: Option<String>,
}

/// POST /api/checkin — front-desk intake. One contact per client per day;
/// unknown clients are auto-created as Prospects; food access is recorded as
/// Food provided on the spot.
pub async fn intake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IntakeRequest>,
) -> Result<Json<Value>, ApiError> {
    let user =
        auth::require_permission(&state.db, &headers, PermissionKey::CanCreateContacts).await?;

    let client_name = req.client_name.trim();
    if client_name.is_empty() || req.provider_name.trim().is_empty() {
        return Err(ApiError::validation("Client name and provider name are required"));
    }
    for name in &req.services_requested {
        if ServiceKind::parse(name).is_none() {
            return Err(ApiError::validation(format!("Unknown service: {name}")));
        }
    }

    let today = Utc::now().date_naive();
    let already = contact::exists_for_client_on(&state.db, client_name, today)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Model(e)))?;
    if already {
        return Err(ApiError::validation("Client has already checked in today"));
    }

    let known = client::find_active_by_name(&state.db, client_name)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Model(e)))?;
    let client_row = match known {
        Some(c) => c,
        None => client::create(&state.db, client_name, req.category.as_deref().unwrap_or("Prospect"))
            .await
            .map_err(|e| ApiError::from(service::errors::ServiceError::Model(e)))?,
    };

    let provided: Vec<ProvidedService> = if req.food_accessed {
        vec![ProvidedService {
            service: ServiceKind::Food.name().to_string(),
            provider: req.provider_name.trim().to_string(),
            completed_at: Some(Utc::now().to_rfc3339()),
        }]
    } else {
        Vec::new()
    };

    let now = Utc::now().into();
    let mut am = contact::ActiveModel {
        contact_date: Set(today),
        days_ago: Set(0),
        provider_name: Set(req.provider_name.trim().to_string()),
        client_name: Set(client_row.name.clone()),
        category: Set(client_row.category.clone()),
        food_accessed: Set(req.food_accessed),
        services_requested: Set(json!(req.services_requested)),
        services_provided: Set(json!([])),
        comments: Set(req.comments.unwrap_or_default()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    services_sync::apply_mirrors(&mut am, &req.services_requested, &provided);
    am.services_provided =
        Set(serde_json::to_value(&provided)
            .map_err(|e| ApiError::from(service::errors::ServiceError::Db(e.to_string())))?);
    let created = am
        .insert(&state.db)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Db(e.to_string())))?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Create, "contacts")
            .record_id(created.id)
            .client_name(created.client_name.clone())
            .user(user.email)
            .ip(auth::client_ip(&headers)),
    )
    .await;

    Ok(Json(json!({"success": true, "contact": created})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServicesRequest {
    pub contact_id: i32,
    pub services: Vec<ProvidedService>,
}

/// POST /api/update-services — merge provided entries into one contact.
pub async fn update_services(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateServicesRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = auth::require_any_permission(&state.db, &headers, &EDIT_KEYS).await?;

    let (updated, outcome) = services_sync::apply_services_update(
        &state.db,
        req.contact_id,
        ServicesUpdate { services: req.services },
        &user.email,
    )
    .await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "contacts")
            .record_id(updated.id)
            .client_name(updated.client_name.clone())
            .user(user.email)
            .ip(auth::client_ip(&headers))
            .changes(json!({"added": outcome.added, "removed": outcome.removed})),
    )
    .await;

    Ok(Json(json!({"success": true, "contact": updated, "changes": outcome})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteServiceRequest {
    pub contact_id: i32,
    pub service: String,
    pub provider: Option<String>,
}

/// POST /api/complete-service — single-service completion through the same
/// reconciliation helper.
pub async fn complete_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CompleteServiceRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = auth::require_any_permission(&state.db, &headers, &EDIT_KEYS).await?;
    let provider = req.provider.unwrap_or_else(|| user.email.clone());

    let (updated, outcome) = services_sync::complete_service(
        &state.db,
        req.contact_id,
        &req.service,
        &provider,
        &user.email,
    )
    .await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "contacts")
            .record_id(updated.id)
            .client_name(updated.client_name.clone())
            .user(user.email)
            .ip(auth::client_ip(&headers))
            .changes(json!({"completed": req.service, "added": outcome.added})),
    )
    .await;

    Ok(Json(json!({"success": true, "contact": updated, "changes": outcome})))
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub updates: Vec<BulkItemRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemRequest {
    pub contact_id: i32,
    pub services: Vec<ProvidedService>,
}

/// POST /api/bulk-update-services — transactional batch; first failure rolls
/// back the whole batch.
pub async fn bulk_update_services(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BulkUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = auth::require_any_permission(&state.db, &headers, &EDIT_KEYS).await?;

    let items = req
        .updates
        .into_iter()
        .map(|u| BulkServicesItem { contact_id: u.contact_id, services: u.services })
        .collect();
    let outcomes = services_sync::bulk_update_services(&state.db, items, &user.email).await?;

    audit::record(
        &state.db,
        AuditEntry::new(AuditAction::Update, "contacts")
            .user(user.email)
            .ip(auth::client_ip(&headers))
            .changes(json!({"bulkUpdated": outcomes.len()})),
    )
    .await;

    let results: Vec<Value> = outcomes
        .into_iter()
        .map(|(id, outcome)| json!({"contactId": id, "changes": outcome}))
        .collect();
    Ok(Json(json!({"success": true, "results": results})))
}

/// GET /api/filters — dropdown values for the contact list UI.
pub async fn filters(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let providers: Vec<String> = contact::Entity::find()
        .select_only()
        .column(contact::Column::ProviderName)
        .distinct()
        .into_tuple()
        .all(&state.db)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Db(e.to_string())))?;
    let categories: Vec<String> = contact::Entity::find()
        .select_only()
        .column(contact::Column::Category)
        .distinct()
        .into_tuple()
        .all(&state.db)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Db(e.to_string())))?;
    let clients: Vec<String> = client::Entity::find()
        .select_only()
        .column(client::Column::Name)
        .filter(client::Column::SoftDeleted.eq(false))
        .distinct()
        .into_tuple()
        .all(&state.db)
        .await
        .map_err(|e| ApiError::from(service::errors::ServiceError::Db(e.to_string())))?;

    Ok(Json(json!({
        "providers": providers,
        "categories": categories,
        "clients": clients,
        "services": ServiceKind::ALL.iter().map(|k| k.name()).collect::<Vec<_>>(),
    })))
}
