//! Capability flags and role templates.
//!
//! Authorization is twelve independent booleans on the user row; nothing is
//! implied between them. Role templates are creation-time presets only: a
//! user's effective rights come solely from the stored flags, and the role
//! shown in the admin UI is recovered by scanning the templates for an exact
//! flag match ("Custom" when none matches).

use serde::{Deserialize, Serialize};

use models::user;

/// The twelve flags, detached from the row so templates and comparisons can
/// work on plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Permissions {
    pub can_view_client_demographics: bool,
    pub can_view_client_services: bool,
    pub can_view_all_clients: bool,
    pub can_export_client_data: bool,
    pub can_manage_users: bool,
    pub can_manage_system_settings: bool,
    pub can_view_audit_logs: bool,
    pub can_manage_database: bool,
    pub can_create_contacts: bool,
    pub can_edit_own_contacts: bool,
    pub can_edit_all_contacts: bool,
    pub can_delete_contacts: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKey {
    CanViewClientDemographics,
    CanViewClientServices,
    CanViewAllClients,
    CanExportClientData,
    CanManageUsers,
    CanManageSystemSettings,
    CanViewAuditLogs,
    CanManageDatabase,
    CanCreateContacts,
    CanEditOwnContacts,
    CanEditAllContacts,
    CanDeleteContacts,
}

impl Permissions {
    pub fn get(&self, key: PermissionKey) -> bool {
        match key {
            PermissionKey::CanViewClientDemographics => self.can_view_client_demographics,
            PermissionKey::CanViewClientServices => self.can_view_client_services,
            PermissionKey::CanViewAllClients => self.can_view_all_clients,
            PermissionKey::CanExportClientData => self.can_export_client_data,
            PermissionKey::CanManageUsers => self.can_manage_users,
            PermissionKey::CanManageSystemSettings => self.can_manage_system_settings,
            PermissionKey::CanViewAuditLogs => self.can_view_audit_logs,
            PermissionKey::CanManageDatabase => self.can_manage_database,
            PermissionKey::CanCreateContacts => self.can_create_contacts,
            PermissionKey::CanEditOwnContacts => self.can_edit_own_contacts,
            PermissionKey::CanEditAllContacts => self.can_edit_all_contacts,
            PermissionKey::CanDeleteContacts => self.can_delete_contacts,
        }
    }

    pub fn any(&self) -> bool {
        let Permissions {
            can_view_client_demographics,
            can_view_client_services,
            can_view_all_clients,
            can_export_client_data,
            can_manage_users,
            can_manage_system_settings,
            can_view_audit_logs,
            can_manage_database,
            can_create_contacts,
            can_edit_own_contacts,
            can_edit_all_contacts,
            can_delete_contacts,
        } = *self;
        can_view_client_demographics
            || can_view_client_services
            || can_view_all_clients
            || can_export_client_data
            || can_manage_users
            || can_manage_system_settings
            || can_view_audit_logs
            || can_manage_database
            || can_create_contacts
            || can_edit_own_contacts
            || can_edit_all_contacts
            || can_delete_contacts
    }

    pub fn from_user(u: &user::Model) -> Self {
        Self {
            can_view_client_demographics: u.can_view_client_demographics,
            can_view_client_services: u.can_view_client_services,
            can_view_all_clients: u.can_view_all_clients,
            can_export_client_data: u.can_export_client_data,
            can_manage_users: u.can_manage_users,
            can_manage_system_settings: u.can_manage_system_settings,
            can_view_audit_logs: u.can_view_audit_logs,
            can_manage_database: u.can_manage_database,
            can_create_contacts: u.can_create_contacts,
            can_edit_own_contacts: u.can_edit_own_contacts,
            can_edit_all_contacts: u.can_edit_all_contacts,
            can_delete_contacts: u.can_delete_contacts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleTemplate {
    #[serde(rename = "Direct Service Provider")]
    DirectServiceProvider,
    #[serde(rename = "Program Director")]
    ProgramDirector,
    #[serde(rename = "Reports Viewer")]
    ReportsViewer,
    #[serde(rename = "IT Administrator")]
    ItAdministrator,
    #[serde(rename = "Data Manager")]
    DataManager,
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    Custom,
}

impl RoleTemplate {
    pub const NAMED: [RoleTemplate; 6] = [
        RoleTemplate::DirectServiceProvider,
        RoleTemplate::ProgramDirector,
        RoleTemplate::ReportsViewer,
        RoleTemplate::ItAdministrator,
        RoleTemplate::DataManager,
        RoleTemplate::SuperAdmin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RoleTemplate::DirectServiceProvider => "Direct Service Provider",
            RoleTemplate::ProgramDirector => "Program Director",
            RoleTemplate::ReportsViewer => "Reports Viewer",
            RoleTemplate::ItAdministrator => "IT Administrator",
            RoleTemplate::DataManager => "Data Manager",
            RoleTemplate::SuperAdmin => "Super Admin",
            RoleTemplate::Custom => "Custom",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Direct Service Provider" => Some(RoleTemplate::DirectServiceProvider),
            "Program Director" => Some(RoleTemplate::ProgramDirector),
            "Reports Viewer" => Some(RoleTemplate::ReportsViewer),
            "IT Administrator" => Some(RoleTemplate::ItAdministrator),
            "Data Manager" => Some(RoleTemplate::DataManager),
            "Super Admin" => Some(RoleTemplate::SuperAdmin),
            "Custom" => Some(RoleTemplate::Custom),
            _ => None,
        }
    }

    /// Default flag set for a template; `Custom` starts all-off.
    pub fn defaults(self) -> Permissions {
        match self {
            RoleTemplate::DirectServiceProvider => Permissions {
                can_view_client_demographics: true,
                can_view_client_services: true,
                can_view_all_clients: true,
                can_create_contacts: true,
                can_edit_own_contacts: true,
                ..Permissions::default()
            },
            RoleTemplate::ProgramDirector => Permissions {
                can_view_client_demographics: true,
                can_view_client_services: true,
                can_view_all_clients: true,
                can_export_client_data: true,
                can_view_audit_logs: true,
                can_create_contacts: true,
                can_edit_own_contacts: true,
                can_edit_all_contacts: true,
                can_delete_contacts: true,
                ..Permissions::default()
            },
            RoleTemplate::ReportsViewer => Permissions {
                can_view_client_demographics: true,
                can_view_client_services: true,
                can_view_all_clients: true,
                can_export_client_data: true,
                ..Permissions::default()
            },
            RoleTemplate::ItAdministrator => Permissions {
                can_manage_users: true,
                can_manage_system_settings: true,
                can_view_audit_logs: true,
                can_manage_database: true,
                ..Permissions::default()
            },
            RoleTemplate::DataManager => Permissions {
                can_view_client_demographics: true,
                can_view_client_services: true,
                can_view_all_clients: true,
                can_export_client_data: true,
                can_manage_database: true,
                can_create_contacts: true,
                can_edit_own_contacts: true,
                can_edit_all_contacts: true,
                ..Permissions::default()
            },
            RoleTemplate::SuperAdmin => Permissions {
                can_view_client_demographics: true,
                can_view_client_services: true,
                can_view_all_clients: true,
                can_export_client_data: true,
                can_manage_users: true,
                can_manage_system_settings: true,
                can_view_audit_logs: true,
                can_manage_database: true,
                can_create_contacts: true,
                can_edit_own_contacts: true,
                can_edit_all_contacts: true,
                can_delete_contacts: true,
            },
            RoleTemplate::Custom => Permissions::default(),
        }
    }
}

/// Classify a flag set by exact template match; any divergence is "Custom".
pub fn role_for(perms: &Permissions) -> RoleTemplate {
    RoleTemplate::NAMED
        .into_iter()
        .find(|t| t.defaults() == *perms)
        .unwrap_or(RoleTemplate::Custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_classify_back_to_themselves() {
        for t in RoleTemplate::NAMED {
            assert_eq!(role_for(&t.defaults()), t, "template {} drifted", t.name());
        }
    }

    #[test]
    fn any_divergence_is_custom() {
        let mut perms = RoleTemplate::ReportsViewer.defaults();
        perms.can_manage_users = true;
        assert_eq!(role_for(&perms), RoleTemplate::Custom);
        assert_eq!(role_for(&Permissions::default()), RoleTemplate::Custom);
    }

    #[test]
    fn super_admin_has_every_flag() {
        let perms = RoleTemplate::SuperAdmin.defaults();
        for key in [
            PermissionKey::CanViewClientDemographics,
            PermissionKey::CanManageUsers,
            PermissionKey::CanDeleteContacts,
            PermissionKey::CanManageDatabase,
        ] {
            assert!(perms.get(key));
        }
    }

    #[test]
    fn custom_template_starts_empty() {
        assert!(!RoleTemplate::Custom.defaults().any());
    }

    #[test]
    fn role_names_round_trip() {
        for t in RoleTemplate::NAMED {
            assert_eq!(RoleTemplate::parse(t.name()), Some(t));
        }
        assert_eq!(RoleTemplate::parse("Custom"), Some(RoleTemplate::Custom));
        assert!(RoleTemplate::parse("Owner").is_none());
    }
}
