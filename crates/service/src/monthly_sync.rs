//! Monthly summary rebuild.
//!
//! Aggregates provided-service counts per client from the contacts of one
//! calendar month, then replaces that month's `monthly_service_summary` rows
//! wholesale (delete, then insert). Counts come from the `services_provided`
//! JSON, not the mirror columns, so a contact providing the same service
//! twice in a month still counts once per contact.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use tracing::info;

use models::{contact, monthly_service_summary};

use crate::errors::ServiceError;
use crate::services_sync::{ProvidedService, ServiceKind};

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub month: u32,
    pub year: i32,
    pub contacts_scanned: u64,
    pub clients_summarized: u64,
    pub rows_replaced: u64,
}

#[derive(Debug, Default, Clone)]
struct Counts([i32; 13]);

impl Counts {
    fn bump(&mut self, kind: ServiceKind) {
        let idx = ServiceKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(0);
        self.0[idx] += 1;
    }

    fn get(&self, kind: ServiceKind) -> i32 {
        let idx = ServiceKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(0);
        self.0[idx]
    }
}

fn month_bounds(month: u32, year: i32) -> Result<(NaiveDate, NaiveDate), ServiceError> {
    if !(1..=12).contains(&month) {
        return Err(ServiceError::validation("Month must be between 1 and 12"));
    }
    if !(1900..=2099).contains(&year) {
        return Err(ServiceError::validation("Year must be between 1900 and 2099"));
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ServiceError::validation("Invalid month/year"))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ServiceError::validation("Invalid month/year"))?;
    Ok((start, end))
}

/// Rebuild one month's summaries. Validates the month and year, scans the
/// month's contacts, and swaps in the fresh rows.
pub async fn run(
    db: &DatabaseConnection,
    month: u32,
    year: i32,
) -> Result<SyncOutcome, ServiceError> {
    let (start, end) = month_bounds(month, year)?;

    let contacts = contact::Entity::find()
        .filter(contact::Column::ContactDate.gte(start))
        .filter(contact::Column::ContactDate.lt(end))
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;

    let mut per_client: BTreeMap<String, Counts> = BTreeMap::new();
    for c in &contacts {
        let provided: Vec<ProvidedService> =
            serde_json::from_value(c.services_provided.clone()).unwrap_or_default();
        let counts = per_client.entry(c.client_name.clone()).or_default();
        for entry in provided {
            if let Some(kind) = ServiceKind::parse(&entry.service) {
                counts.bump(kind);
            }
        }
    }

    let deleted = monthly_service_summary::Entity::delete_many()
        .filter(monthly_service_summary::Column::Month.eq(month as i32))
        .filter(monthly_service_summary::Column::Year.eq(year))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;

    let clients = per_client.len() as u64;
    for (client_name, counts) in per_client {
        let am = monthly_service_summary::ActiveModel {
            client_name: Set(client_name),
            month: Set(month as i32),
            year: Set(year),
            case_management: Set(counts.get(ServiceKind::CaseManagement)),
            occupational_therapy: Set(counts.get(ServiceKind::OccupationalTherapy)),
            food: Set(counts.get(ServiceKind::Food)),
            healthcare: Set(counts.get(ServiceKind::Healthcare)),
            housing: Set(counts.get(ServiceKind::Housing)),
            employment: Set(counts.get(ServiceKind::Employment)),
            benefits: Set(counts.get(ServiceKind::Benefits)),
            legal: Set(counts.get(ServiceKind::Legal)),
            transportation: Set(counts.get(ServiceKind::Transportation)),
            childcare: Set(counts.get(ServiceKind::Childcare)),
            mental_health: Set(counts.get(ServiceKind::MentalHealth)),
            substance_abuse: Set(counts.get(ServiceKind::SubstanceAbuse)),
            education: Set(counts.get(ServiceKind::Education)),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    }

    let outcome = SyncOutcome {
        month,
        year,
        contacts_scanned: contacts.len() as u64,
        clients_summarized: clients,
        rows_replaced: deleted.rows_affected,
    };
    info!(
        month,
        year,
        contacts = outcome.contacts_scanned,
        clients = outcome.clients_summarized,
        "monthly summary rebuilt"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds_cover_the_calendar_month() {
        let (start, end) = month_bounds(7, 2025).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
    }

    #[test]
    fn december_rolls_into_the_next_year() {
        let (start, end) = month_bounds(12, 2025).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn rejects_out_of_range_month_and_year() {
        assert!(month_bounds(0, 2025).is_err());
        assert!(month_bounds(13, 2025).is_err());
        assert!(month_bounds(6, 1899).is_err());
        assert!(month_bounds(6, 2100).is_err());
    }

    #[test]
    fn counts_index_every_service_kind() {
        let mut counts = Counts::default();
        for kind in ServiceKind::ALL {
            counts.bump(kind);
        }
        for kind in ServiceKind::ALL {
            assert_eq!(counts.get(kind), 1);
        }
    }
}
