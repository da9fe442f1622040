//! Service layer providing the business rules on top of `models`.
//! - Status-transition validation for check-ins
//! - Goal progress history
//! - Alert lifecycle (daily dedup, lazy expiry)
//! - JSON/mirror-column service reconciliation
//! - Intake form storage (one form per client)
//! - Two-step client deletion
//! - Permission flags and role templates
//! - Audit logging and the monthly summary sync

pub mod alerts;
pub mod audit;
pub mod checkins;
pub mod client_deletion;
pub mod errors;
pub mod goals;
pub mod intake_forms;
pub mod monthly_sync;
pub mod permissions;
pub mod rate_limit;
pub mod services_sync;
