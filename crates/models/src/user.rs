use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// An account with twelve independent boolean capability flags. There is no
/// hierarchy between flags; authorization reads exactly one column. Role
/// templates exist only as creation-time presets in the service layer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub active: bool,
    pub can_view_client_demographics: bool,
    pub can_view_client_services: bool,
    pub can_view_all_clients: bool,
    pub can_export_client_data: bool,
    pub can_manage_users: bool,
    pub can_manage_system_settings: bool,
    pub can_view_audit_logs: bool,
    pub can_manage_database: bool,
    pub can_create_contacts: bool,
    pub can_edit_own_contacts: bool,
    pub can_edit_all_contacts: bool,
    pub can_delete_contacts: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match *self {}
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))
}

pub async fn find_by_id(db: &DatabaseConnection, id: i32) -> Result<Option<Model>, ModelError> {
    Entity::find_by_id(id).one(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

/// Insert a user with an explicit flag set. Validation of the email and the
/// at-least-one-permission rule happens in the service layer.
pub async fn create(db: &DatabaseConnection, mut am: ActiveModel) -> Result<Model, ModelError> {
    let now = Utc::now().into();
    am.created_at = Set(now);
    am.updated_at = Set(now);
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}
