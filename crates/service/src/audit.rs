//! Compliance audit logging. Appends are fire-and-forget: a failed audit
//! write is traced and swallowed so it can never abort the operation it
//! describes.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tracing::error;

use models::audit_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    View,
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::View => "VIEW",
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

/// One audit event. `user_email` defaults to "system" when the request
/// carried no identity.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub table_name: String,
    pub record_id: Option<String>,
    pub client_name: Option<String>,
    pub user_email: String,
    pub ip_address: Option<String>,
    pub changes: Option<Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, table_name: impl Into<String>) -> Self {
        Self {
            action,
            table_name: table_name.into(),
            record_id: None,
            client_name: None,
            user_email: "system".to_string(),
            ip_address: None,
            changes: None,
        }
    }

    pub fn record_id(mut self, id: impl ToString) -> Self {
        self.record_id = Some(id.to_string());
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn user(mut self, email: impl Into<String>) -> Self {
        self.user_email = email.into();
        self
    }

    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn changes(mut self, changes: Value) -> Self {
        self.changes = Some(changes);
        self
    }
}

/// Append one row to audit_logs. Never returns an error.
pub async fn record(db: &DatabaseConnection, entry: AuditEntry) {
    let am = audit_log::ActiveModel {
        user_email: Set(entry.user_email),
        action: Set(entry.action.as_str().to_string()),
        table_name: Set(entry.table_name),
        record_id: Set(entry.record_id),
        client_name: Set(entry.client_name),
        ip_address: Set(entry.ip_address),
        changes: Set(entry.changes),
        timestamp: Set(Utc::now().into()),
        ..Default::default()
    };
    if let Err(e) = am.insert(db).await {
        error!(error = %e, "audit log write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_match_the_log_contract() {
        assert_eq!(AuditAction::View.as_str(), "VIEW");
        assert_eq!(AuditAction::Create.as_str(), "CREATE");
        assert_eq!(AuditAction::Update.as_str(), "UPDATE");
        assert_eq!(AuditAction::Delete.as_str(), "DELETE");
    }

    #[test]
    fn entry_builder_defaults_to_system_user() {
        let e = AuditEntry::new(AuditAction::Update, "contacts").record_id(7);
        assert_eq!(e.user_email, "system");
        assert_eq!(e.record_id.as_deref(), Some("7"));
        assert!(e.changes.is_none());
    }
}
