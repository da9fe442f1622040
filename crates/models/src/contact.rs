use sea_orm::{entity::prelude::*, DatabaseConnection};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// One recorded interaction between a provider and a client.
///
/// Services live twice: as JSON lists (`services_requested` is an array of
/// service names, `services_provided` an array of
/// `{service, provider, completedAt}` objects) and as per-service 0/1 mirror
/// columns used for fast filtering. The service layer keeps the two in sync;
/// nothing else may write the mirror columns.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub contact_date: Date,
    pub days_ago: i32,
    pub provider_name: String,
    pub client_name: String,
    pub category: String,
    pub food_accessed: bool,
    pub services_requested: Json,
    pub services_provided: Json,
    pub comments: String,
    pub case_management_requested: i32,
    pub case_management_provided: i32,
    pub occupational_therapy_requested: i32,
    pub occupational_therapy_provided: i32,
    pub food_requested: i32,
    pub food_provided: i32,
    pub healthcare_requested: i32,
    pub healthcare_provided: i32,
    pub housing_requested: i32,
    pub housing_provided: i32,
    pub employment_requested: i32,
    pub employment_provided: i32,
    pub benefits_requested: i32,
    pub benefits_provided: i32,
    pub legal_requested: i32,
    pub legal_provided: i32,
    pub transportation_requested: i32,
    pub transportation_provided: i32,
    pub childcare_requested: i32,
    pub childcare_provided: i32,
    pub mental_health_requested: i32,
    pub mental_health_provided: i32,
    pub substance_abuse_requested: i32,
    pub substance_abuse_provided: i32,
    pub education_requested: i32,
    pub education_provided: i32,
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

pub async fn find_by_id(db: &DatabaseConnection, id: i32) -> Result<Option<Model>, ModelError> {
    Entity::find_by_id(id).one(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

/// True when a contact already exists for this client on this date; the
/// front-desk check-in flow allows one per day.
pub async fn exists_for_client_on(
    db: &DatabaseConnection,
    client_name: &str,
    date: Date,
) -> Result<bool, ModelError> {
    let n = Entity::find()
        .filter(Column::ClientName.eq(client_name))
        .filter(Column::ContactDate.eq(date))
        .count(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(n > 0)
}
