use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only progress history for a case-management goal. One row per
/// goal update that changed status and/or carried a note.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cm_goal_progress")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub goal_id: i32,
    pub progress_note: Option<String>,
    pub previous_status: String,
    pub new_status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Goal,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Goal => Entity::belongs_to(crate::cm_goal::Entity)
                .from(Column::GoalId)
                .to(crate::cm_goal::Column::Id)
                .into(),
        }
    }
}

impl Related<crate::cm_goal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
