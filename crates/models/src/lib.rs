//! sea-orm entities for the casebook schema, one module per table, plus thin
//! helper functions for the lookups the service layer leans on. Table layout
//! is the effective schema contract (see `db/schema.sql`), not redesigned.

pub mod db;
pub mod errors;

pub mod alert;
pub mod audit_log;
pub mod client;
pub mod cm_checkin;
pub mod cm_goal;
pub mod cm_goal_progress;
pub mod contact;
pub mod intake_form;
pub mod monthly_service_summary;
pub mod ot_checkin;
pub mod ot_goal;
pub mod ot_goal_progress;
pub mod outreach_location;
pub mod outreach_run;
pub mod services_update_log;
pub mod user;
