//! Alert lifecycle.
//!
//! An alert expires at the start of the day after it was created. Expiry is
//! evaluated lazily: every read of the active list first flips overdue rows
//! to `expired`, then returns what is left. Creation enforces at most one
//! active alert per client per calendar day (UTC). Alerts fetched by any
//! other path are not expired as a side effect.

use chrono::{NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use models::alert::{self, STATUS_ACTIVE, STATUS_EXPIRED, STATUS_RESOLVED};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub client_name: String,
    pub provider_name: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

/// Create an alert expiring one day after today. Rejected when the client
/// already has an active alert created today.
pub async fn create(db: &DatabaseConnection, input: NewAlert) -> Result<alert::Model, ServiceError> {
    if input.client_name.trim().is_empty() || input.provider_name.trim().is_empty() {
        return Err(ServiceError::validation("Client name and provider name are required"));
    }

    let now = Utc::now();
    let today = now.date_naive();
    let day_start = today.and_time(NaiveTime::MIN).and_utc();
    let day_end = (today + chrono::Days::new(1)).and_time(NaiveTime::MIN).and_utc();

    let existing_today = alert::Entity::find()
        .filter(alert::Column::ClientName.eq(input.client_name.trim()))
        .filter(alert::Column::Status.eq(STATUS_ACTIVE))
        .filter(alert::Column::CreatedAt.gte(day_start))
        .filter(alert::Column::CreatedAt.lt(day_end))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    if existing_today > 0 {
        return Err(ServiceError::validation(
            "An active alert already exists for this client today",
        ));
    }

    let am = alert::ActiveModel {
        client_name: Set(input.client_name.trim().to_string()),
        provider_name: Set(input.provider_name.trim().to_string()),
        message: Set(input.message),
        severity: Set(input.severity.unwrap_or_else(|| "medium".to_string())),
        status: Set(STATUS_ACTIVE.to_string()),
        created_at: Set(now.into()),
        expires_at: Set(day_end.into()),
        resolved_at: Set(None),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

/// Flip overdue active alerts to expired. Shared by the active-list read.
async fn expire_due(db: &DatabaseConnection) -> Result<u64, ServiceError> {
    let res = alert::Entity::update_many()
        .col_expr(alert::Column::Status, Expr::value(STATUS_EXPIRED))
        .filter(alert::Column::Status.eq(STATUS_ACTIVE))
        .filter(alert::Column::ExpiresAt.lte(Utc::now()))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(res.rows_affected)
}

/// Active alerts, newest first, after the lazy-expiry pass.
pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<alert::Model>, ServiceError> {
    expire_due(db).await?;
    alert::Entity::find()
        .filter(alert::Column::Status.eq(STATUS_ACTIVE))
        .order_by_desc(alert::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

/// Mark one alert resolved.
pub async fn resolve(db: &DatabaseConnection, id: i32) -> Result<alert::Model, ServiceError> {
    let existing = alert::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("alert"))?;
    let mut am: alert::ActiveModel = existing.into();
    am.status = Set(STATUS_RESOLVED.to_string());
    am.resolved_at = Set(Some(Utc::now().into()));
    am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

/// Remove every alert for a client (used when a client record is cleaned up).
pub async fn clear_client(db: &DatabaseConnection, client_name: &str) -> Result<u64, ServiceError> {
    if client_name.trim().is_empty() {
        return Err(ServiceError::validation("Client name is required"));
    }
    let res = alert::Entity::delete_many()
        .filter(alert::Column::ClientName.eq(client_name.trim()))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(res.rows_affected)
}
