//! Two-step client data deletion.
//!
//! Step one returns a summary of everything that would go; step two requires
//! the client's name typed back exactly and then removes child rows in
//! dependency order before soft-deleting the client row itself. The client
//! record survives as a tombstone carrying who deleted it and when.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};

use models::{
    alert, client, cm_checkin, cm_goal, cm_goal_progress, contact, intake_form, ot_checkin,
    ot_goal, ot_goal_progress,
};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSummary {
    pub client_name: String,
    pub contacts: u64,
    pub cm_checkins: u64,
    pub ot_checkins: u64,
    pub cm_goals: u64,
    pub ot_goals: u64,
    pub alerts: u64,
    pub intake_forms: u64,
}

impl DeletionSummary {
    pub fn total(&self) -> u64 {
        self.contacts
            + self.cm_checkins
            + self.ot_checkins
            + self.cm_goals
            + self.ot_goals
            + self.alerts
            + self.intake_forms
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRequest {
    pub client_name: String,
    pub confirmation_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionOutcome {
    pub summary: DeletionSummary,
    pub deleted_by: String,
}

async fn load_active_client(
    db: &DatabaseConnection,
    client_name: &str,
) -> Result<client::Model, ServiceError> {
    if client_name.trim().is_empty() {
        return Err(ServiceError::validation("Client name is required"));
    }
    client::find_active_by_name(db, client_name)
        .await?
        .ok_or_else(|| ServiceError::not_found("client"))
}

/// Everything the deletion would remove, counted but untouched.
pub async fn summarize(
    db: &DatabaseConnection,
    client_name: &str,
) -> Result<DeletionSummary, ServiceError> {
    let found = load_active_client(db, client_name).await?;
    let name = found.name.as_str();

    let contacts = contact::Entity::find()
        .filter(contact::Column::ClientName.eq(name))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let cm_checkins = cm_checkin::Entity::find()
        .filter(cm_checkin::Column::ClientName.eq(name))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let ot_checkins = ot_checkin::Entity::find()
        .filter(ot_checkin::Column::ClientName.eq(name))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let cm_goals = cm_goal::Entity::find()
        .filter(cm_goal::Column::ClientName.eq(name))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let ot_goals = ot_goal::Entity::find()
        .filter(ot_goal::Column::ClientName.eq(name))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let alerts = alert::Entity::find()
        .filter(alert::Column::ClientName.eq(name))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let intake_forms = intake_form::Entity::find()
        .filter(intake_form::Column::ClientId.eq(found.id))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;

    Ok(DeletionSummary {
        client_name: found.name,
        contacts,
        cm_checkins,
        ot_checkins,
        cm_goals,
        ot_goals,
        alerts,
        intake_forms,
    })
}

async fn cm_goal_ids(db: &DatabaseConnection, name: &str) -> Result<Vec<i32>, ServiceError> {
    Ok(cm_goal::Entity::find()
        .filter(cm_goal::Column::ClientName.eq(name))
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .into_iter()
        .map(|g| g.id)
        .collect())
}

async fn ot_goal_ids(db: &DatabaseConnection, name: &str) -> Result<Vec<i32>, ServiceError> {
    Ok(ot_goal::Entity::find()
        .filter(ot_goal::Column::ClientName.eq(name))
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .into_iter()
        .map(|g| g.id)
        .collect())
}

/// Execute the deletion. `confirmation_name` must equal the stored client
/// name exactly (case-sensitive).
pub async fn execute(
    db: &DatabaseConnection,
    request: DeletionRequest,
    deleted_by: &str,
) -> Result<DeletionOutcome, ServiceError> {
    let found = load_active_client(db, &request.client_name).await?;
    if request.confirmation_name != found.name {
        return Err(ServiceError::validation(
            "Confirmation name does not match the client name",
        ));
    }

    let summary = summarize(db, &found.name).await?;
    let name = found.name.as_str();

    let cm_ids = cm_goal_ids(db, name).await?;
    if !cm_ids.is_empty() {
        cm_goal_progress::Entity::delete_many()
            .filter(cm_goal_progress::Column::GoalId.is_in(cm_ids))
            .exec(db)
            .await
            .map_err(|e| ServiceError::Db(e.to_string()))?;
    }
    let ot_ids = ot_goal_ids(db, name).await?;
    if !ot_ids.is_empty() {
        ot_goal_progress::Entity::delete_many()
            .filter(ot_goal_progress::Column::GoalId.is_in(ot_ids))
            .exec(db)
            .await
            .map_err(|e| ServiceError::Db(e.to_string()))?;
    }

    cm_goal::Entity::delete_many()
        .filter(cm_goal::Column::ClientName.eq(name))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    ot_goal::Entity::delete_many()
        .filter(ot_goal::Column::ClientName.eq(name))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    cm_checkin::Entity::delete_many()
        .filter(cm_checkin::Column::ClientName.eq(name))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    ot_checkin::Entity::delete_many()
        .filter(ot_checkin::Column::ClientName.eq(name))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    alert::Entity::delete_many()
        .filter(alert::Column::ClientName.eq(name))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    intake_form::Entity::delete_many()
        .filter(intake_form::Column::ClientId.eq(found.id))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    contact::Entity::delete_many()
        .filter(contact::Column::ClientName.eq(name))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;

    let mut tombstone: client::ActiveModel = found.into();
    tombstone.soft_deleted = Set(true);
    tombstone.deleted_at = Set(Some(Utc::now().into()));
    tombstone.deleted_by = Set(Some(deleted_by.to_string()));
    tombstone.updated_at = Set(Utc::now().into());
    tombstone.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    Ok(DeletionOutcome { summary, deleted_by: deleted_by.to_string() })
}
