use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A scheduled street-outreach run.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outreach_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub run_date: Date,
    pub run_time: Option<String>,
    pub lead_staff: String,
    pub team_members: Option<String>,
    pub planned_locations: Option<String>,
    pub safety_notes: Option<String>,
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
