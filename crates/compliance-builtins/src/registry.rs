// compliance-builtins/src/registry.rs
// ============================================================================
// Module: Builtin Table
// Description: Assembles every family module's schema constants and
// audit/remediate function pointers into the static registry compliance-core's
// Engine is built against.
// Purpose: Implement Design Note "Global registry of function pointers".
// Dependencies: compliance_core::{BuiltinEntry}
// ============================================================================

use compliance_core::BuiltinEntry;

use crate::content;
use crate::daemon;
use crate::file_permissions;
use crate::meta;
use crate::other;
use crate::package;
use crate::user_group;

/// The complete builtin table, handed to [`compliance_core::Engine`] as a
/// `&'static [BuiltinEntry]` trait object via [`compliance_core::Registry`].
pub const BUILTINS: &[BuiltinEntry] = &[
    // ------------------------------------------------------------------
    // Testing / Meta (spec.md §4.4.6)
    // ------------------------------------------------------------------
    BuiltinEntry { name: "AuditSuccess", schema: meta::EMPTY_SCHEMA, audit: Some(meta::audit_success), remediate: None },
    BuiltinEntry { name: "AuditFailure", schema: meta::EMPTY_SCHEMA, audit: Some(meta::audit_failure), remediate: None },
    BuiltinEntry { name: "RemediationSuccess", schema: meta::EMPTY_SCHEMA, audit: None, remediate: Some(meta::remediation_success) },
    BuiltinEntry { name: "RemediationFailure", schema: meta::EMPTY_SCHEMA, audit: None, remediate: Some(meta::remediation_failure) },
    BuiltinEntry {
        name: "AuditGetParamValues",
        schema: meta::AUDIT_GET_PARAM_VALUES_SCHEMA,
        audit: Some(meta::audit_get_param_values),
        remediate: None,
    },
    // ------------------------------------------------------------------
    // File Permissions (spec.md §4.4.1)
    // ------------------------------------------------------------------
    BuiltinEntry {
        name: "EnsureFilePermissions",
        schema: file_permissions::FILE_PERMISSIONS_SCHEMA,
        audit: Some(file_permissions::ensure_file_permissions_audit),
        remediate: Some(file_permissions::ensure_file_permissions_remediate),
    },
    BuiltinEntry {
        name: "EnsureFilePermissionsCollection",
        schema: file_permissions::FILE_PERMISSIONS_COLLECTION_SCHEMA,
        audit: Some(file_permissions::ensure_file_permissions_collection_audit),
        remediate: Some(file_permissions::ensure_file_permissions_collection_remediate),
    },
    // ------------------------------------------------------------------
    // Content Inspection (spec.md §4.4.2)
    // ------------------------------------------------------------------
    BuiltinEntry {
        name: "FileRegexMatch",
        schema: content::FILE_REGEX_MATCH_SCHEMA,
        audit: Some(content::file_regex_match_audit),
        remediate: None,
    },
    // ------------------------------------------------------------------
    // Daemon Configuration (spec.md §4.4.3)
    // ------------------------------------------------------------------
    BuiltinEntry {
        name: "EnsureSshdOption",
        schema: daemon::ENSURE_SSHD_OPTION_SCHEMA,
        audit: Some(daemon::ensure_sshd_option_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "SystemdParameter",
        schema: daemon::SYSTEMD_PARAMETER_SCHEMA,
        audit: Some(daemon::systemd_parameter_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "SystemdUnitState",
        schema: daemon::SYSTEMD_UNIT_STATE_SCHEMA,
        audit: Some(daemon::systemd_unit_state_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "AuditdRulesCheck",
        schema: daemon::AUDITD_RULES_CHECK_SCHEMA,
        audit: Some(daemon::auditd_rules_check_audit),
        remediate: None,
    },
    // ------------------------------------------------------------------
    // Package (spec.md §4.4.4 / §6.5)
    // ------------------------------------------------------------------
    BuiltinEntry {
        name: "PackageInstalled",
        schema: package::PACKAGE_INSTALLED_SCHEMA,
        audit: Some(package::package_installed_audit),
        remediate: None,
    },
    // ------------------------------------------------------------------
    // User / Group (spec.md §4.4.5)
    // ------------------------------------------------------------------
    BuiltinEntry {
        name: "EnsureInteractiveUsersDotFilesAccessIsConfigured",
        schema: user_group::DOTFILES_SCHEMA,
        audit: Some(user_group::dotfiles_audit),
        remediate: Some(user_group::dotfiles_remediate),
    },
    BuiltinEntry {
        name: "EnsureShadowContains",
        schema: user_group::ENSURE_SHADOW_CONTAINS_SCHEMA,
        audit: Some(user_group::ensure_shadow_contains_audit),
        remediate: None,
    },
    // ------------------------------------------------------------------
    // Other (spec.md §4.4.7)
    // ------------------------------------------------------------------
    BuiltinEntry {
        name: "DconfKeyIsSet",
        schema: other::DCONF_KEY_IS_SET_SCHEMA,
        audit: Some(other::dconf_key_is_set_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "GsettingsKeyIsSet",
        schema: other::GSETTINGS_KEY_IS_SET_SCHEMA,
        audit: Some(other::gsettings_key_is_set_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "KernelModuleIsDisabled",
        schema: other::KERNEL_MODULE_IS_DISABLED_SCHEMA,
        audit: Some(other::kernel_module_is_disabled_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureFilesystemOption",
        schema: other::ENSURE_FILESYSTEM_OPTION_SCHEMA,
        audit: Some(other::ensure_filesystem_option_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureMountPointExists",
        schema: other::ENSURE_MOUNT_POINT_EXISTS_SCHEMA,
        audit: Some(other::ensure_mount_point_exists_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureSysctlValue",
        schema: other::ENSURE_SYSCTL_VALUE_SCHEMA,
        audit: Some(other::ensure_sysctl_value_audit),
        remediate: Some(other::ensure_sysctl_value_remediate),
    },
    BuiltinEntry { name: "UfwStatus", schema: other::UFW_STATUS_SCHEMA, audit: Some(other::ufw_status_audit), remediate: None },
    BuiltinEntry {
        name: "EnsureUfwOpenPorts",
        schema: other::ENSURE_UFW_OPEN_PORTS_SCHEMA,
        audit: Some(other::ensure_ufw_open_ports_audit),
        remediate: Some(other::ensure_ufw_open_ports_remediate),
    },
    BuiltinEntry {
        name: "EnsureIptablesOpenPorts",
        schema: other::ENSURE_IPTABLES_OPEN_PORTS_SCHEMA,
        audit: Some(other::ensure_iptables_open_ports_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureNoUnownedFiles",
        schema: other::ENSURE_NO_UNOWNED_FILES_SCHEMA,
        audit: Some(other::ensure_no_unowned_files_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureNoWorldWritableFiles",
        schema: other::ENSURE_NO_WORLD_WRITABLE_FILES_SCHEMA,
        audit: Some(other::ensure_no_world_writable_files_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureNoDuplicateEntriesExist",
        schema: other::ENSURE_NO_DUPLICATE_ENTRIES_EXIST_SCHEMA,
        audit: Some(other::ensure_no_duplicate_entries_exist_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureSshKeyFilePermissions",
        schema: other::ENSURE_SSH_KEY_FILE_PERMISSIONS_SCHEMA,
        audit: Some(other::ensure_ssh_key_file_permissions_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureInteractiveUsersHomeDirectoriesExist",
        schema: other::ENSURE_INTERACTIVE_USERS_HOME_DIRECTORIES_EXIST_SCHEMA,
        audit: Some(other::ensure_interactive_users_home_directories_exist_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureDefaultShellTimeoutIsConfigured",
        schema: other::ENSURE_DEFAULT_SHELL_TIMEOUT_IS_CONFIGURED_SCHEMA,
        audit: Some(other::ensure_default_shell_timeout_is_configured_audit),
        remediate: Some(other::ensure_default_shell_timeout_is_configured_remediate),
    },
    BuiltinEntry {
        name: "EnsureDefaultUmaskIsConfigured",
        schema: other::ENSURE_DEFAULT_UMASK_IS_CONFIGURED_SCHEMA,
        audit: Some(other::ensure_default_umask_is_configured_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureWirelessIsDisabled",
        schema: other::ENSURE_WIRELESS_IS_DISABLED_SCHEMA,
        audit: Some(other::ensure_wireless_is_disabled_audit),
        remediate: Some(other::ensure_wireless_is_disabled_remediate),
    },
    BuiltinEntry {
        name: "EnsureXdmcpIsNotEnabled",
        schema: other::ENSURE_XDMCP_IS_NOT_ENABLED_SCHEMA,
        audit: Some(other::ensure_xdmcp_is_not_enabled_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "EnsureAppArmorProfilesAreEnforced",
        schema: other::ENSURE_APP_ARMOR_PROFILES_ARE_ENFORCED_SCHEMA,
        audit: Some(other::ensure_app_armor_profiles_are_enforced_audit),
        remediate: None,
    },
    BuiltinEntry {
        name: "ExecuteCommandGrep",
        schema: other::EXECUTE_COMMAND_GREP_SCHEMA,
        audit: Some(other::execute_command_grep_audit),
        remediate: None,
    },
    BuiltinEntry { name: "SCE", schema: other::SCE_SCHEMA, audit: Some(other::sce_audit), remediate: None },
];

#[cfg(test)]
mod tests {
    use super::BUILTINS;
    use compliance_core::Registry;

    #[test]
    fn every_entry_has_a_unique_name() {
        let mut names: Vec<&str> = BUILTINS.iter().map(|entry| entry.name).collect();
        names.sort_unstable();
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len(), "duplicate builtin name in the registry table");
    }

    #[test]
    fn every_entry_has_at_least_one_implementation() {
        assert!(BUILTINS.iter().all(|entry| entry.audit.is_some() || entry.remediate.is_some()));
    }

    #[test]
    fn lookup_by_name_finds_a_known_builtin() {
        assert!(BUILTINS.find("EnsureFilePermissions").is_some());
        assert!(BUILTINS.find("NoSuchBuiltin").is_none());
    }
}
