use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-client, per-month provided-service counts, rebuilt by the admin sync
/// job. Rows for a month are deleted and reinserted wholesale.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_service_summary")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub client_name: String,
    pub month: i32,
    pub year: i32,
    pub case_management: i32,
    pub occupational_therapy: i32,
    pub food: i32,
    pub healthcare: i32,
    pub housing: i32,
    pub employment: i32,
    pub benefits: i32,
    pub legal: i32,
    pub transportation: i32,
    pub childcare: i32,
    pub mental_health: i32,
    pub substance_abuse: i32,
    pub education: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match *self {}
    }
}

impl ActiveModelBehavior for ActiveModel {}
