//! Goal tracking for the CM and OT programs. Every update that changes the
//! status and/or carries a non-empty note appends exactly one row to the
//! program's progress-history table; an update that does neither appends
//! nothing. History reads newest-first and is unbounded.

use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use serde_json::json;

use models::{cm_goal, cm_goal_progress, ot_goal, ot_goal_progress};

use crate::errors::ServiceError;

pub const VALID_STATUSES: [&str; 4] = ["Not Started", "In Progress", "Completed", "Deferred"];
pub const MAX_PROGRESS_NOTE_LEN: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct NewGoal {
    pub client_name: String,
    pub goal_text: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoalUpdate {
    pub status: String,
    #[serde(default)]
    pub progress_note: Option<String>,
}

fn validate_update(update: &GoalUpdate) -> Result<(), ServiceError> {
    if !VALID_STATUSES.contains(&update.status.as_str()) {
        return Err(ServiceError::validation_with(
            format!("Status must be one of: {}", VALID_STATUSES.join(", ")),
            json!({"field": "status", "value": update.status}),
        ));
    }
    if let Some(note) = &update.progress_note {
        if note.len() > MAX_PROGRESS_NOTE_LEN {
            return Err(ServiceError::validation_with(
                format!("Progress note must be {MAX_PROGRESS_NOTE_LEN} characters or less"),
                json!({"field": "progress_note"}),
            ));
        }
    }
    Ok(())
}

/// A progress row is due when the status changed or a non-empty note came in.
fn progress_due(previous_status: &str, update: &GoalUpdate) -> bool {
    let note_present = update.progress_note.as_deref().is_some_and(|n| !n.trim().is_empty());
    note_present || previous_status != update.status
}

fn normalized_note(update: &GoalUpdate) -> Option<String> {
    update.progress_note.clone().filter(|n| !n.trim().is_empty())
}

pub async fn create_cm(
    db: &DatabaseConnection,
    input: NewGoal,
) -> Result<cm_goal::Model, ServiceError> {
    if input.client_name.trim().is_empty() || input.goal_text.trim().is_empty() {
        return Err(ServiceError::validation("Client name and goal text are required"));
    }
    let now = Utc::now().into();
    let am = cm_goal::ActiveModel {
        client_name: Set(input.client_name.trim().to_string()),
        goal_text: Set(input.goal_text.trim().to_string()),
        status: Set("Not Started".to_string()),
        priority: Set(input.priority.unwrap_or_else(|| "Medium".to_string())),
        target_date: Set(input.target_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn create_ot(
    db: &DatabaseConnection,
    input: NewGoal,
) -> Result<ot_goal::Model, ServiceError> {
    if input.client_name.trim().is_empty() || input.goal_text.trim().is_empty() {
        return Err(ServiceError::validation("Client name and goal text are required"));
    }
    let now = Utc::now().into();
    let am = ot_goal::ActiveModel {
        client_name: Set(input.client_name.trim().to_string()),
        goal_text: Set(input.goal_text.trim().to_string()),
        status: Set("Not Started".to_string()),
        priority: Set(input.priority.unwrap_or_else(|| "Medium".to_string())),
        target_date: Set(input.target_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

/// Update a CM goal's status, appending a progress-history row when due.
/// Returns the updated goal and the previous status.
pub async fn update_cm(
    db: &DatabaseConnection,
    goal_id: i32,
    update: GoalUpdate,
) -> Result<(cm_goal::Model, String), ServiceError> {
    validate_update(&update)?;
    let existing = cm_goal::Entity::find_by_id(goal_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("goal"))?;
    let previous_status = existing.status.clone();

    let mut am: cm_goal::ActiveModel = existing.into();
    am.status = Set(update.status.clone());
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    if progress_due(&previous_status, &update) {
        let progress = cm_goal_progress::ActiveModel {
            goal_id: Set(goal_id),
            progress_note: Set(normalized_note(&update)),
            previous_status: Set(previous_status.clone()),
            new_status: Set(update.status),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        progress.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    }
    Ok((updated, previous_status))
}

pub async fn update_ot(
    db: &DatabaseConnection,
    goal_id: i32,
    update: GoalUpdate,
) -> Result<(ot_goal::Model, String), ServiceError> {
    validate_update(&update)?;
    let existing = ot_goal::Entity::find_by_id(goal_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("goal"))?;
    let previous_status = existing.status.clone();

    let mut am: ot_goal::ActiveModel = existing.into();
    am.status = Set(update.status.clone());
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    if progress_due(&previous_status, &update) {
        let progress = ot_goal_progress::ActiveModel {
            goal_id: Set(goal_id),
            progress_note: Set(normalized_note(&update)),
            previous_status: Set(previous_status.clone()),
            new_status: Set(update.status),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        progress.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    }
    Ok((updated, previous_status))
}

/// Delete a CM goal, returning the deleted row for audit logging.
pub async fn delete_cm(db: &DatabaseConnection, goal_id: i32) -> Result<cm_goal::Model, ServiceError> {
    let existing = cm_goal::Entity::find_by_id(goal_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("goal"))?;
    cm_goal_progress::Entity::delete_many()
        .filter(cm_goal_progress::Column::GoalId.eq(goal_id))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    cm_goal::Entity::delete_by_id(goal_id)
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(existing)
}

pub async fn delete_ot(db: &DatabaseConnection, goal_id: i32) -> Result<ot_goal::Model, ServiceError> {
    let existing = ot_goal::Entity::find_by_id(goal_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("goal"))?;
    ot_goal_progress::Entity::delete_many()
        .filter(ot_goal_progress::Column::GoalId.eq(goal_id))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    ot_goal::Entity::delete_by_id(goal_id)
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(existing)
}

/// Progress history, newest first.
pub async fn cm_progress_history(
    db: &DatabaseConnection,
    goal_id: i32,
) -> Result<Vec<cm_goal_progress::Model>, ServiceError> {
    let exists = cm_goal::Entity::find_by_id(goal_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    if exists.is_none() {
        return Err(ServiceError::not_found("goal"));
    }
    cm_goal_progress::Entity::find()
        .filter(cm_goal_progress::Column::GoalId.eq(goal_id))
        .order_by_desc(cm_goal_progress::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn ot_progress_history(
    db: &DatabaseConnection,
    goal_id: i32,
) -> Result<Vec<ot_goal_progress::Model>, ServiceError> {
    let exists = ot_goal::Entity::find_by_id(goal_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    if exists.is_none() {
        return Err(ServiceError::not_found("goal"));
    }
    ot_goal_progress::Entity::find()
        .filter(ot_goal_progress::Column::GoalId.eq(goal_id))
        .order_by_desc(ot_goal_progress::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn list_cm_by_client(
    db: &DatabaseConnection,
    client_name: &str,
) -> Result<Vec<cm_goal::Model>, ServiceError> {
    cm_goal::Entity::find()
        .filter(cm_goal::Column::ClientName.eq(client_name))
        .order_by_desc(cm_goal::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn list_ot_by_client(
    db: &DatabaseConnection,
    client_name: &str,
) -> Result<Vec<ot_goal::Model>, ServiceError> {
    ot_goal::Entity::find()
        .filter(ot_goal::Column::ClientName.eq(client_name))
        .order_by_desc(ot_goal::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(status: &str, note: Option<&str>) -> GoalUpdate {
        GoalUpdate { status: status.to_string(), progress_note: note.map(String::from) }
    }

    #[test]
    fn progress_row_due_on_status_change() {
        assert!(progress_due("Not Started", &update("In Progress", None)));
    }

    #[test]
    fn progress_row_due_on_note_without_status_change() {
        assert!(progress_due("In Progress", &update("In Progress", Some("met at shelter"))));
    }

    #[test]
    fn no_progress_row_when_nothing_changed() {
        assert!(!progress_due("In Progress", &update("In Progress", None)));
        assert!(!progress_due("In Progress", &update("In Progress", Some("  "))));
    }

    #[test]
    fn rejects_unknown_status() {
        let err = validate_update(&update("Paused", None)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[test]
    fn rejects_oversized_note() {
        let long = "x".repeat(MAX_PROGRESS_NOTE_LEN + 1);
        let err = validate_update(&update("Completed", Some(&long))).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }
}
