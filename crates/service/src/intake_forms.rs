//! Intake form storage. Each client carries at most one form; resubmitting
//! replaces the stored answers instead of adding a second row.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use serde_json::json;

use models::{client, intake_form};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSubmission {
    pub client_id: i32,
    pub form_data: serde_json::Value,
}

async fn require_active_client(
    db: &DatabaseConnection,
    client_id: i32,
) -> Result<client::Model, ServiceError> {
    let found = client::Entity::find_by_id(client_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    match found {
        Some(c) if !c.soft_deleted => Ok(c),
        _ => Err(ServiceError::not_found("client")),
    }
}

/// Save a client's intake form, replacing any form saved earlier. Returns
/// the stored row and whether it was newly created.
pub async fn save(
    db: &DatabaseConnection,
    input: IntakeSubmission,
) -> Result<(intake_form::Model, bool), ServiceError> {
    if !input.form_data.is_object() {
        return Err(ServiceError::validation_with(
            "Form data must be an object",
            json!({"field": "formData"}),
        ));
    }
    require_active_client(db, input.client_id).await?;

    let existing = intake_form::Entity::find()
        .filter(intake_form::Column::ClientId.eq(input.client_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;

    match existing {
        Some(model) => {
            let mut am: intake_form::ActiveModel = model.into();
            am.form_data = Set(input.form_data);
            let saved = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
            Ok((saved, false))
        }
        None => {
            let am = intake_form::ActiveModel {
                client_id: Set(input.client_id),
                form_data: Set(input.form_data),
                created_at: Set(Utc::now().into()),
                ..Default::default()
            };
            let saved = am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
            Ok((saved, true))
        }
    }
}

/// The client's stored form, if any. The client itself must exist.
pub async fn find_for_client(
    db: &DatabaseConnection,
    client_id: i32,
) -> Result<Option<intake_form::Model>, ServiceError> {
    require_active_client(db, client_id).await?;
    intake_form::Entity::find()
        .filter(intake_form::Column::ClientId.eq(client_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}
