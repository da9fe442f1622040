use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub category: String,
    pub location: Option<String>,
    pub soft_deleted: bool,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub deleted_by: Option<String>,
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

/// Look up a client by name, hiding soft-deleted rows. Soft delete gates
/// visibility but not physical removal.
pub async fn find_active_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Name.eq(name))
        .filter(Column::SoftDeleted.eq(false))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))
}

/// Look up a client by name regardless of the soft-delete flag (admin paths).
pub async fn find_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Name.eq(name))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))
}

pub async fn create(
    db: &DatabaseConnection,
    name: &str,
    category: &str,
) -> Result<Model, ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("client name required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        name: Set(name.to_string()),
        category: Set(category.to_string()),
        location: Set(None),
        soft_deleted: Set(false),
        deleted_at: Set(None),
        deleted_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

/// Mark a client soft-deleted, recording who and when. The row stays.
pub async fn soft_delete(
    db: &DatabaseConnection,
    id: i32,
    deleted_by: &str,
) -> Result<(), ModelError> {
    let mut found: ActiveModel = Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))?
        .ok_or_else(|| ModelError::Validation("client not found".into()))?
        .into();
    let now = Utc::now().into();
    found.soft_deleted = Set(true);
    found.deleted_at = Set(Some(now));
    found.deleted_by = Set(Some(deleted_by.to_string()));
    found.updated_at = Set(now);
    found.update(db).await.map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(())
}
