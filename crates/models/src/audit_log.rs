use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only compliance record of who did what to which row. Rows are
/// never updated or deleted through the application.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_email: String,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<String>,
    pub client_name: Option<String>,
    pub ip_address: Option<String>,
    pub changes: Option<Json>,
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match *self {}
    }
}

impl ActiveModelBehavior for ActiveModel {}
