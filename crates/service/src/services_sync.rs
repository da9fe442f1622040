//! Service reconciliation for contact records.
//!
//! A contact stores its services twice: `services_requested` (JSON array of
//! service names), `services_provided` (JSON array of
//! `{service, provider, completedAt}` objects), and 26 per-service 0/1
//! mirror columns derived from both. Updates MERGE the submitted provided
//! entries into the stored list keyed by service name, then recompute every
//! mirror column from scratch (reset, then set), so the columns can never
//! drift from the JSON. Each applied update also appends a row to
//! `services_update_log` with the names added and removed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use models::{contact, services_update_log};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    CaseManagement,
    OccupationalTherapy,
    Food,
    Healthcare,
    Housing,
    Employment,
    Benefits,
    Legal,
    Transportation,
    Childcare,
    MentalHealth,
    SubstanceAbuse,
    Education,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 13] = [
        ServiceKind::CaseManagement,
        ServiceKind::OccupationalTherapy,
        ServiceKind::Food,
        ServiceKind::Healthcare,
        ServiceKind::Housing,
        ServiceKind::Employment,
        ServiceKind::Benefits,
        ServiceKind::Legal,
        ServiceKind::Transportation,
        ServiceKind::Childcare,
        ServiceKind::MentalHealth,
        ServiceKind::SubstanceAbuse,
        ServiceKind::Education,
    ];

    /// The display name used in the JSON lists and throughout the API.
    pub fn name(self) -> &'static str {
        match self {
            ServiceKind::CaseManagement => "Case Management",
            ServiceKind::OccupationalTherapy => "Occupational",
            ServiceKind::Food => "Food",
            ServiceKind::Healthcare => "Healthcare",
            ServiceKind::Housing => "Housing",
            ServiceKind::Employment => "Employment",
            ServiceKind::Benefits => "Benefits",
            ServiceKind::Legal => "Legal",
            ServiceKind::Transportation => "Transportation",
            ServiceKind::Childcare => "Childcare",
            ServiceKind::MentalHealth => "Mental Health",
            ServiceKind::SubstanceAbuse => "Substance Abuse",
            ServiceKind::Education => "Education",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

/// One entry of the `services_provided` JSON list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProvidedService {
    pub service: String,
    pub provider: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesUpdate {
    pub services: Vec<ProvidedService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkServicesItem {
    pub contact_id: i32,
    pub services: Vec<ProvidedService>,
}

/// Outcome of one reconciliation, for the change log and the response body.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

fn parse_provided(raw: &serde_json::Value) -> Vec<ProvidedService> {
    serde_json::from_value(raw.clone()).unwrap_or_default()
}

fn parse_requested(raw: &serde_json::Value) -> Vec<String> {
    serde_json::from_value(raw.clone()).unwrap_or_default()
}

fn validate_entries(entries: &[ProvidedService]) -> Result<(), ServiceError> {
    for entry in entries {
        if ServiceKind::parse(&entry.service).is_none() {
            return Err(ServiceError::validation_with(
                format!("Unknown service: {}", entry.service),
                json!({
                    "field": "service",
                    "value": entry.service,
                    "validValues": ServiceKind::ALL.iter().map(|k| k.name()).collect::<Vec<_>>(),
                }),
            ));
        }
        if entry.provider.trim().is_empty() {
            return Err(ServiceError::validation("Provider is required for each service"));
        }
    }
    Ok(())
}

/// Merge submitted entries into the stored list keyed by service name.
/// Submitted entries replace the stored entry for the same service; stored
/// entries for services not submitted are kept. Stored order is preserved,
/// newly introduced services append in submission order.
fn merge_provided(existing: &[ProvidedService], submitted: &[ProvidedService]) -> Vec<ProvidedService> {
    let mut merged: Vec<ProvidedService> = existing
        .iter()
        .map(|e| {
            submitted
                .iter()
                .find(|s| s.service == e.service)
                .cloned()
                .unwrap_or_else(|| e.clone())
        })
        .collect();
    for entry in submitted {
        if !merged.iter().any(|m| m.service == entry.service) {
            merged.push(entry.clone());
        }
    }
    merged
}

fn diff_names(before: &[ProvidedService], after: &[ProvidedService]) -> SyncOutcome {
    let added = after
        .iter()
        .filter(|a| !before.iter().any(|b| b.service == a.service))
        .map(|a| a.service.clone())
        .collect();
    let removed = before
        .iter()
        .filter(|b| !after.iter().any(|a| a.service == b.service))
        .map(|b| b.service.clone())
        .collect();
    SyncOutcome { added, removed }
}

fn set_requested_mirror(am: &mut contact::ActiveModel, kind: ServiceKind) {
    match kind {
        ServiceKind::CaseManagement => am.case_management_requested = Set(1),
        ServiceKind::OccupationalTherapy => am.occupational_therapy_requested = Set(1),
        ServiceKind::Food => am.food_requested = Set(1),
        ServiceKind::Healthcare => am.healthcare_requested = Set(1),
        ServiceKind::Housing => am.housing_requested = Set(1),
        ServiceKind::Employment => am.employment_requested = Set(1),
        ServiceKind::Benefits => am.benefits_requested = Set(1),
        ServiceKind::Legal => am.legal_requested = Set(1),
        ServiceKind::Transportation => am.transportation_requested = Set(1),
        ServiceKind::Childcare => am.childcare_requested = Set(1),
        ServiceKind::MentalHealth => am.mental_health_requested = Set(1),
        ServiceKind::SubstanceAbuse => am.substance_abuse_requested = Set(1),
        ServiceKind::Education => am.education_requested = Set(1),
    }
}

fn set_provided_mirror(am: &mut contact::ActiveModel, kind: ServiceKind) {
    match kind {
        ServiceKind::CaseManagement => am.case_management_provided = Set(1),
        ServiceKind::OccupationalTherapy => am.occupational_therapy_provided = Set(1),
        ServiceKind::Food => am.food_provided = Set(1),
        ServiceKind::Healthcare => am.healthcare_provided = Set(1),
        ServiceKind::Housing => am.housing_provided = Set(1),
        ServiceKind::Employment => am.employment_provided = Set(1),
        ServiceKind::Benefits => am.benefits_provided = Set(1),
        ServiceKind::Legal => am.legal_provided = Set(1),
        ServiceKind::Transportation => am.transportation_provided = Set(1),
        ServiceKind::Childcare => am.childcare_provided = Set(1),
        ServiceKind::MentalHealth => am.mental_health_provided = Set(1),
        ServiceKind::SubstanceAbuse => am.substance_abuse_provided = Set(1),
        ServiceKind::Education => am.education_provided = Set(1),
    }
}

fn reset_mirrors(am: &mut contact::ActiveModel) {
    am.case_management_requested = Set(0);
    am.case_management_provided = Set(0);
    am.occupational_therapy_requested = Set(0);
    am.occupational_therapy_provided = Set(0);
    am.food_requested = Set(0);
    am.food_provided = Set(0);
    am.healthcare_requested = Set(0);
    am.healthcare_provided = Set(0);
    am.housing_requested = Set(0);
    am.housing_provided = Set(0);
    am.employment_requested = Set(0);
    am.employment_provided = Set(0);
    am.benefits_requested = Set(0);
    am.benefits_provided = Set(0);
    am.legal_requested = Set(0);
    am.legal_provided = Set(0);
    am.transportation_requested = Set(0);
    am.transportation_provided = Set(0);
    am.childcare_requested = Set(0);
    am.childcare_provided = Set(0);
    am.mental_health_requested = Set(0);
    am.mental_health_provided = Set(0);
    am.substance_abuse_requested = Set(0);
    am.substance_abuse_provided = Set(0);
    am.education_requested = Set(0);
    am.education_provided = Set(0);
}

/// Recompute every mirror column from the two JSON lists. Unknown names in
/// either list are ignored rather than rejected; old rows may carry names
/// from before the current catalog.
pub fn apply_mirrors(am: &mut contact::ActiveModel, requested: &[String], provided: &[ProvidedService]) {
    reset_mirrors(am);
    for name in requested {
        if let Some(kind) = ServiceKind::parse(name) {
            set_requested_mirror(am, kind);
        }
    }
    for entry in provided {
        if let Some(kind) = ServiceKind::parse(&entry.service) {
            set_provided_mirror(am, kind);
        }
    }
}

async fn apply_on<C>(
    db: &C,
    contact_id: i32,
    submitted: Vec<ProvidedService>,
    updated_by: &str,
) -> Result<(contact::Model, SyncOutcome), ServiceError>
where
    C: sea_orm::ConnectionTrait,
{
    validate_entries(&submitted)?;

    let existing = contact::Entity::find_by_id(contact_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found("contact"))?;

    let before = parse_provided(&existing.services_provided);
    let requested = parse_requested(&existing.services_requested);
    let merged = merge_provided(&before, &submitted);
    let outcome = diff_names(&before, &merged);

    let food_now_provided = merged.iter().any(|e| e.service == ServiceKind::Food.name());

    let mut am: contact::ActiveModel = existing.into();
    am.services_provided =
        Set(serde_json::to_value(&merged).map_err(|e| ServiceError::Db(e.to_string()))?);
    apply_mirrors(&mut am, &requested, &merged);
    if food_now_provided {
        am.food_accessed = Set(true);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    let log = services_update_log::ActiveModel {
        contact_id: Set(contact_id),
        updated_by: Set(updated_by.to_string()),
        services_added: Set(json!(outcome.added)),
        services_removed: Set(json!(outcome.removed)),
        update_type: Set("services_update".to_string()),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };
    log.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

    Ok((updated, outcome))
}

/// Merge the submitted provided entries into one contact and resync its
/// mirror columns.
pub async fn apply_services_update(
    db: &DatabaseConnection,
    contact_id: i32,
    update: ServicesUpdate,
    updated_by: &str,
) -> Result<(contact::Model, SyncOutcome), ServiceError> {
    apply_on(db, contact_id, update.services, updated_by).await
}

/// Mark one service completed on a contact: upserts a single provided entry
/// stamped with the current time.
pub async fn complete_service(
    db: &DatabaseConnection,
    contact_id: i32,
    service: &str,
    provider: &str,
    updated_by: &str,
) -> Result<(contact::Model, SyncOutcome), ServiceError> {
    let entry = ProvidedService {
        service: service.to_string(),
        provider: provider.to_string(),
        completed_at: Some(Utc::now().to_rfc3339()),
    };
    apply_on(db, contact_id, vec![entry], updated_by).await
}

/// Apply several updates in one transaction; any failure rolls back all of
/// them.
pub async fn bulk_update_services(
    db: &DatabaseConnection,
    items: Vec<BulkServicesItem>,
    updated_by: &str,
) -> Result<Vec<(i32, SyncOutcome)>, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::validation("No updates provided"));
    }
    let txn: DatabaseTransaction =
        db.begin().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    let mut outcomes = Vec::with_capacity(items.len());
    for item in items {
        match apply_on(&txn, item.contact_id, item.services, updated_by).await {
            Ok((_, outcome)) => outcomes.push((item.contact_id, outcome)),
            Err(e) => {
                txn.rollback().await.map_err(|e| ServiceError::Db(e.to_string()))?;
                return Err(e);
            }
        }
    }
    txn.commit().await.map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(service: &str, provider: &str) -> ProvidedService {
        ProvidedService {
            service: service.to_string(),
            provider: provider.to_string(),
            completed_at: None,
        }
    }

    #[test]
    fn catalog_round_trips_names() {
        for kind in ServiceKind::ALL {
            assert_eq!(ServiceKind::parse(kind.name()), Some(kind));
        }
        assert!(ServiceKind::parse("Haircuts").is_none());
    }

    #[test]
    fn merge_replaces_same_service_and_keeps_the_rest() {
        let existing = vec![entry("Food", "Alice"), entry("Housing", "Bob")];
        let submitted = vec![entry("Food", "Carol"), entry("Legal", "Dan")];
        let merged = merge_provided(&existing, &submitted);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], entry("Food", "Carol"));
        assert_eq!(merged[1], entry("Housing", "Bob"));
        assert_eq!(merged[2], entry("Legal", "Dan"));
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = vec![entry("Food", "Alice")];
        let once = merge_provided(&existing, &existing);
        assert_eq!(once, existing);
    }

    #[test]
    fn diff_reports_added_only_under_merge() {
        let before = vec![entry("Food", "Alice")];
        let after = merge_provided(&before, &[entry("Legal", "Dan")]);
        let outcome = diff_names(&before, &after);
        assert_eq!(outcome.added, vec!["Legal".to_string()]);
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn rejects_unknown_service_names() {
        let err = validate_entries(&[entry("Haircuts", "Alice")]).unwrap_err();
        match err {
            ServiceError::Validation { details: Some(details), .. } => {
                assert_eq!(details["field"], "service");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_provider() {
        let err = validate_entries(&[entry("Food", "  ")]).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }
}
