use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Change log for contact service updates: which service names were added
/// and which were removed relative to the prior provided list.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services_update_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub contact_id: i32,
    pub updated_by: String,
    pub services_added: Json,
    pub services_removed: Json,
    pub update_type: String,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Contact,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Contact => Entity::belongs_to(crate::contact::Entity)
                .from(Column::ContactId)
                .to(crate::contact::Column::Id)
                .into(),
        }
    }
}

impl Related<crate::contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
