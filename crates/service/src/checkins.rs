//! Check-in lifecycle for the CM and OT programs.
//!
//! Status machine: Draft -> {Completed, Cancelled}; Completed and Cancelled
//! are terminal. A same-state update is a permitted no-op. The transition is
//! validated against the stored status before any column is written, so an
//! illegal request never partially updates the row.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use models::{cm_checkin, ot_checkin};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckinStatus {
    Draft,
    Completed,
    Cancelled,
}

impl CheckinStatus {
    pub const ALL: [CheckinStatus; 3] =
        [CheckinStatus::Draft, CheckinStatus::Completed, CheckinStatus::Cancelled];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckinStatus::Draft => "Draft",
            CheckinStatus::Completed => "Completed",
            CheckinStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Draft" => Some(CheckinStatus::Draft),
            "Completed" => Some(CheckinStatus::Completed),
            "Cancelled" => Some(CheckinStatus::Cancelled),
            _ => None,
        }
    }

    /// Forward transitions only; terminal states allow none.
    pub fn allowed_transitions(self) -> &'static [CheckinStatus] {
        match self {
            CheckinStatus::Draft => &[CheckinStatus::Completed, CheckinStatus::Cancelled],
            CheckinStatus::Completed => &[],
            CheckinStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: CheckinStatus) -> bool {
        self == next || self.allowed_transitions().contains(&next)
    }
}

/// Validate a requested transition against the stored status. Errors carry
/// the current status, the requested status and the allowed set.
pub fn validate_transition(current: &str, requested: &str) -> Result<CheckinStatus, ServiceError> {
    let requested_status = CheckinStatus::parse(requested).ok_or_else(|| {
        ServiceError::validation_with(
            "Invalid status value",
            json!({
                "field": "status",
                "value": requested,
                "validValues": CheckinStatus::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            }),
        )
    })?;
    let current_status = CheckinStatus::parse(current).ok_or_else(|| {
        ServiceError::Db(format!("stored check-in status is not recognized: {current}"))
    })?;
    if !current_status.can_transition_to(requested_status) {
        return Err(ServiceError::validation_with(
            format!("Invalid status transition from {current} to {requested}"),
            json!({
                "currentStatus": current_status.as_str(),
                "requestedStatus": requested_status.as_str(),
                "allowedTransitions": current_status
                    .allowed_transitions()
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>(),
            }),
        ));
    }
    Ok(requested_status)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCheckin {
    pub contact_id: Option<i32>,
    pub client_name: String,
    pub client_uuid: Option<Uuid>,
    pub provider_name: String,
    pub notes: Option<String>,
}

impl NewCheckin {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.client_name.trim().is_empty() {
            return Err(ServiceError::validation_with(
                "Client name is required",
                json!({"field": "client_name"}),
            ));
        }
        if self.provider_name.trim().is_empty() {
            return Err(ServiceError::validation_with(
                "Provider name is required",
                json!({"field": "provider_name"}),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckinUpdate {
    pub notes: Option<String>,
    pub status: Option<String>,
}

impl CheckinUpdate {
    fn require_fields(&self) -> Result<(), ServiceError> {
        if self.notes.is_none() && self.status.is_none() {
            return Err(ServiceError::validation("No valid fields provided for update"));
        }
        Ok(())
    }
}

pub async fn create_cm(
    db: &DatabaseConnection,
    input: NewCheckin,
) -> Result<cm_checkin::Model, ServiceError> {
    input.validate()?;
    let now = Utc::now().into();
    let am = cm_checkin::ActiveModel {
        contact_id: Set(input.contact_id.unwrap_or(0)),
        client_name: Set(input.client_name.trim().to_string()),
        client_uuid: Set(input.client_uuid),
        provider_name: Set(input.provider_name.trim().to_string()),
        notes: Set(input.notes),
        status: Set(CheckinStatus::Draft.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn create_ot(
    db: &DatabaseConnection,
    input: NewCheckin,
) -> Result<ot_checkin::Model, ServiceError> {
    input.validate()?;
    let now = Utc::now().into();
    let am = ot_checkin::ActiveModel {
        contact_id: Set(input.contact_id.unwrap_or(0)),
        client_name: Set(input.client_name.trim().to_string()),
        client_uuid: Set(input.client_uuid),
        provider_name: Set(input.provider_name.trim().to_string()),
        notes: Set(input.notes),
        status: Set(CheckinStatus::Draft.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn update_cm(
    db: &DatabaseConnection,
    id: i32,
    update: CheckinUpdate,
) -> Result<cm_checkin::Model, ServiceError> {
    update.require_fields()?;
    let current = cm_checkin::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("check-in"))?;

    if let Some(requested) = update.status.as_deref() {
        validate_transition(&current.status, requested)?;
    }

    let mut am: cm_checkin::ActiveModel = current.into();
    if let Some(notes) = update.notes {
        am.notes = Set(Some(notes));
    }
    if let Some(status) = update.status {
        am.status = Set(status);
    }
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn update_ot(
    db: &DatabaseConnection,
    id: i32,
    update: CheckinUpdate,
) -> Result<ot_checkin::Model, ServiceError> {
    update.require_fields()?;
    let current = ot_checkin::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("check-in"))?;

    if let Some(requested) = update.status.as_deref() {
        validate_transition(&current.status, requested)?;
    }

    let mut am: ot_checkin::ActiveModel = current.into();
    if let Some(notes) = update.notes {
        am.notes = Set(Some(notes));
    }
    if let Some(status) = update.status {
        am.status = Set(status);
    }
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn list_cm_by_contact(
    db: &DatabaseConnection,
    contact_id: i32,
) -> Result<Vec<cm_checkin::Model>, ServiceError> {
    cm_checkin::Entity::find()
        .filter(cm_checkin::Column::ContactId.eq(contact_id))
        .order_by_desc(cm_checkin::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

pub async fn list_ot_by_contact(
    db: &DatabaseConnection,
    contact_id: i32,
) -> Result<Vec<ot_checkin::Model>, ServiceError> {
    ot_checkin::Entity::find()
        .filter(ot_checkin::Column::ContactId.eq(contact_id))
        .order_by_desc(ot_checkin::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_can_complete_or_cancel() {
        assert!(CheckinStatus::Draft.can_transition_to(CheckinStatus::Completed));
        assert!(CheckinStatus::Draft.can_transition_to(CheckinStatus::Cancelled));
    }

    #[test]
    fn terminal_states_allow_only_same_state() {
        assert!(CheckinStatus::Completed.can_transition_to(CheckinStatus::Completed));
        assert!(!CheckinStatus::Completed.can_transition_to(CheckinStatus::Draft));
        assert!(!CheckinStatus::Completed.can_transition_to(CheckinStatus::Cancelled));
        assert!(CheckinStatus::Cancelled.can_transition_to(CheckinStatus::Cancelled));
        assert!(!CheckinStatus::Cancelled.can_transition_to(CheckinStatus::Completed));
        assert!(CheckinStatus::Completed.allowed_transitions().is_empty());
    }

    #[test]
    fn validate_transition_reports_the_allowed_set() {
        let err = validate_transition("Completed", "Draft").unwrap_err();
        match err {
            ServiceError::Validation { details: Some(details), .. } => {
                assert_eq!(details["currentStatus"], "Completed");
                assert_eq!(details["requestedStatus"], "Draft");
                assert_eq!(details["allowedTransitions"], serde_json::json!([]));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn same_state_update_is_permitted() {
        assert!(validate_transition("Completed", "Completed").is_ok());
        assert!(validate_transition("Draft", "Draft").is_ok());
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = validate_transition("Draft", "Archived").unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }
}
