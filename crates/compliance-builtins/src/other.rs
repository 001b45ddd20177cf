// compliance-builtins/src/other.rs
// ============================================================================
// Family: Other (§4.4.7)
// Description: The ~21 remaining builtins spec.md lists by name rather than
// full prose, each following the same Context::execute + regex contract as
// the documented families.
// Purpose: Implement spec.md §4.4.7.
// Dependencies: regex, compliance_core::{BoundArgs, Context, IndicatorsTree}
// ============================================================================

use regex::Regex;

use compliance_core::BoundArgs;
use compliance_core::Context;
use compliance_core::ErrorKind;
use compliance_core::IndicatorsTree;
use compliance_core::ParamField;
use compliance_core::ParamType;
use compliance_core::Status;
use compliance_logic::EngineResult;
use compliance_logic::fold_all_of;

/// Runs `command`, folding a spawn/exit failure into `Status::Error`.
fn run(context: &dyn Context, command: &str) -> Result<String, Status> {
    context.execute(command).map_err(Status::system_error)
}

/// Compiles `pattern`, folding a syntax error into `Status::Error`.
fn regex(pattern: &str) -> Result<Regex, Status> {
    Regex::new(pattern).map_err(|err| Status::caller_error(format!("invalid pattern '{pattern}': {err}")))
}

// ============================================================================
// SECTION: dconf / gsettings
// ============================================================================

/// `DconfKeyIsSet` schema.
pub const DCONF_KEY_IS_SET_SCHEMA: &[ParamField] =
    &[ParamField { name: "key", ty: ParamType::String, required: true }, ParamField { name: "value", ty: ParamType::String, required: true }];

/// Reads a `dconf` key and compares it against the expected value.
pub fn dconf_key_is_set_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let key = args.string("key")?;
    let expected = args.string("value")?;
    let escaped = key.replace('\'', "'\\''");
    match run(context, &format!("dconf read '{escaped}'")) {
        Ok(actual) if actual.trim() == expected => Ok(indicators.compliant(format!("dconf key '{key}' is '{expected}'"))),
        Ok(actual) => Ok(indicators.non_compliant(format!("dconf key '{key}' is '{}', expected '{expected}'", actual.trim()))),
        Err(status) => Ok(apply(indicators, status)),
    }
}

/// `GsettingsKeyIsSet` schema.
pub const GSETTINGS_KEY_IS_SET_SCHEMA: &[ParamField] = &[
    ParamField { name: "schema", ty: ParamType::String, required: true },
    ParamField { name: "key", ty: ParamType::String, required: true },
    ParamField { name: "value", ty: ParamType::String, required: true },
];

/// Reads a `gsettings` key and compares it against the expected value.
pub fn gsettings_key_is_set_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let schema = args.string("schema")?;
    let key = args.string("key")?;
    let expected = args.string("value")?;
    match run(context, &format!("gsettings get '{schema}' '{key}'")) {
        Ok(actual) if actual.trim() == expected => Ok(indicators.compliant(format!("'{schema}:{key}' is '{expected}'"))),
        Ok(actual) => Ok(indicators.non_compliant(format!("'{schema}:{key}' is '{}', expected '{expected}'", actual.trim()))),
        Err(status) => Ok(apply(indicators, status)),
    }
}

// ============================================================================
// SECTION: Kernel module
// ============================================================================

/// `KernelModuleIsDisabled` schema.
pub const KERNEL_MODULE_IS_DISABLED_SCHEMA: &[ParamField] = &[ParamField { name: "moduleName", ty: ParamType::String, required: true }];

/// Verifies a kernel module is not currently loaded and is blacklisted from loading.
pub fn kernel_module_is_disabled_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let module = args.string("moduleName")?;
    let loaded = run(context, &format!("lsmod | grep -qw '{module}'")).is_ok();
    if loaded {
        return Ok(indicators.non_compliant(format!("module '{module}' is currently loaded")));
    }
    let blacklisted = run(context, &format!("grep -rl 'blacklist {module}' /etc/modprobe.d 2>/dev/null")).map(|out| !out.trim().is_empty()).unwrap_or(false);
    if blacklisted {
        Ok(indicators.compliant(format!("module '{module}' is not loaded and is blacklisted")))
    } else {
        Ok(indicators.non_compliant(format!("module '{module}' is not blacklisted")))
    }
}

// ============================================================================
// SECTION: Filesystem / mountpoint
// ============================================================================

/// `EnsureFilesystemOption` schema.
pub const ENSURE_FILESYSTEM_OPTION_SCHEMA: &[ParamField] =
    &[ParamField { name: "mountPoint", ty: ParamType::String, required: true }, ParamField { name: "option", ty: ParamType::String, required: true }];

/// Verifies `mountPoint` is mounted with `option` set, via `findmnt`.
pub fn ensure_filesystem_option_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let mount_point = args.string("mountPoint")?;
    let option = args.string("option")?;
    let Ok(output) = run(context, &format!("findmnt -no OPTIONS '{mount_point}'")) else {
        return Ok(indicators.non_compliant(format!("'{mount_point}' is not mounted")));
    };
    if output.split(',').any(|candidate| candidate.trim() == option) {
        Ok(indicators.compliant(format!("'{mount_point}' is mounted with '{option}'")))
    } else {
        Ok(indicators.non_compliant(format!("'{mount_point}' is missing option '{option}'")))
    }
}

/// `EnsureMountPointExists` schema.
pub const ENSURE_MOUNT_POINT_EXISTS_SCHEMA: &[ParamField] = &[ParamField { name: "mountPoint", ty: ParamType::String, required: true }];

/// Verifies `mountPoint` appears in the live mount table.
pub fn ensure_mount_point_exists_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let mount_point = args.string("mountPoint")?;
    match run(context, &format!("findmnt -no TARGET '{mount_point}'")) {
        Ok(_) => Ok(indicators.compliant(format!("'{mount_point}' is mounted"))),
        Err(_) => Ok(indicators.non_compliant(format!("'{mount_point}' is not mounted"))),
    }
}

// ============================================================================
// SECTION: Sysctl
// ============================================================================

/// `EnsureSysctlValue` schema.
pub const ENSURE_SYSCTL_VALUE_SCHEMA: &[ParamField] =
    &[ParamField { name: "key", ty: ParamType::String, required: true }, ParamField { name: "value", ty: ParamType::String, required: true }];

/// Verifies a running `sysctl` value.
pub fn ensure_sysctl_value_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let key = args.string("key")?;
    let expected = args.string("value")?;
    let Ok(output) = run(context, &format!("sysctl -n '{key}'")) else {
        return Ok(indicators.error(ErrorKind::System, format!("'sysctl -n {key}' failed")));
    };
    if output.trim() == expected {
        Ok(indicators.compliant(format!("sysctl '{key}' is '{expected}'")))
    } else {
        Ok(indicators.non_compliant(format!("sysctl '{key}' is '{}', expected '{expected}'", output.trim())))
    }
}

/// Sets a `sysctl` value both at runtime and persistently in `/etc/sysctl.d`.
pub fn ensure_sysctl_value_remediate(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let key = args.string("key")?;
    let value = args.string("value")?;
    let command = format!(
        "sysctl -w '{key}={value}' && echo '{key} = {value}' >> /etc/sysctl.d/60-compliance-engine.conf"
    );
    if run(context, &command).is_err() {
        return Ok(indicators.error(ErrorKind::System, format!("failed to set sysctl '{key}'")));
    }
    Ok(indicators.compliant(format!("sysctl '{key}' set to '{value}'")))
}

// ============================================================================
// SECTION: UFW / iptables
// ============================================================================

/// `UfwStatus` schema.
pub const UFW_STATUS_SCHEMA: &[ParamField] = &[ParamField { name: "expectedStatus", ty: ParamType::Enumeration(&["active", "inactive"]), required: true }];

/// Verifies `ufw status` reports the expected enabled/disabled state.
pub fn ufw_status_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let expected = args.enumeration("expectedStatus")?;
    let Ok(output) = run(context, "ufw status") else {
        return Ok(indicators.error(ErrorKind::System, "'ufw status' failed"));
    };
    let active = output.to_lowercase().contains("status: active");
    let matches = (expected == "active") == active;
    if matches {
        Ok(indicators.compliant(format!("ufw is {expected}")))
    } else {
        Ok(indicators.non_compliant(format!("ufw is not {expected}")))
    }
}

/// `EnsureUfwOpenPorts` schema.
pub const ENSURE_UFW_OPEN_PORTS_SCHEMA: &[ParamField] = &[ParamField { name: "ports", ty: ParamType::Separated(&ParamType::Int, ','), required: true }];

/// Verifies every listed port has an allow rule in `ufw status`.
pub fn ensure_ufw_open_ports_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let ports = args.list("ports")?;
    let Ok(output) = run(context, "ufw status") else {
        return Ok(indicators.error(ErrorKind::System, "'ufw status' failed"));
    };
    let mut statuses = Vec::new();
    for port in ports {
        let compliance_core::BoundValue::Int(port) = port else { continue };
        if output.contains(&format!("{port}/tcp")) || output.contains(&format!("{port}/udp")) || output.contains(&port.to_string()) {
            statuses.push(indicators.compliant(format!("port {port} is open in ufw")));
        } else {
            statuses.push(indicators.non_compliant(format!("port {port} is not open in ufw")));
        }
    }
    Ok(fold_all_of(statuses))
}

/// Opens every listed port with `ufw allow`.
pub fn ensure_ufw_open_ports_remediate(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let ports = args.list("ports")?;
    for port in ports {
        let compliance_core::BoundValue::Int(port) = port else { continue };
        if run(context, &format!("ufw allow {port}")).is_err() {
            return Ok(indicators.error(ErrorKind::System, format!("'ufw allow {port}' failed")));
        }
    }
    Ok(indicators.compliant("requested ports opened in ufw"))
}

/// `EnsureIptablesOpenPorts` schema, covering both IPv4 and IPv6 via `ipVersion`.
pub const ENSURE_IPTABLES_OPEN_PORTS_SCHEMA: &[ParamField] = &[
    ParamField { name: "ports", ty: ParamType::Separated(&ParamType::Int, ','), required: true },
    ParamField { name: "ipVersion", ty: ParamType::Enumeration(&["v4", "v6"]), required: true },
];

/// Verifies every listed port has an `ACCEPT` rule in `iptables`/`ip6tables`.
pub fn ensure_iptables_open_ports_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let ports = args.list("ports")?;
    let binary = if args.enumeration("ipVersion")? == "v6" { "ip6tables" } else { "iptables" };
    let Ok(output) = run(context, &format!("{binary} -L -n")) else {
        return Ok(indicators.error(ErrorKind::System, format!("'{binary} -L -n' failed")));
    };
    let mut statuses = Vec::new();
    for port in ports {
        let compliance_core::BoundValue::Int(port) = port else { continue };
        let pattern = format!(r"ACCEPT.*dpt:{port}\b");
        let matched = regex(&pattern).map(|re| re.is_match(&output));
        match matched {
            Ok(true) => statuses.push(indicators.compliant(format!("port {port} accepts traffic in {binary}"))),
            Ok(false) => statuses.push(indicators.non_compliant(format!("port {port} has no accept rule in {binary}"))),
            Err(status) => return Ok(apply(indicators, status)),
        }
    }
    Ok(fold_all_of(statuses))
}

// ============================================================================
// SECTION: Filesystem hygiene
// ============================================================================

/// `EnsureNoUnownedFiles` schema.
pub const ENSURE_NO_UNOWNED_FILES_SCHEMA: &[ParamField] = &[ParamField { name: "path", ty: ParamType::String, required: true }];

/// Verifies no file under `path` lacks a resolvable owning user or group.
pub fn ensure_no_unowned_files_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let path = args.string("path")?;
    let Ok(output) = run(context, &format!("find '{path}' -xdev \\( -nouser -o -nogroup \\)")) else {
        return Ok(indicators.error(ErrorKind::System, format!("'find {path}' failed")));
    };
    let offenders: Vec<&str> = output.lines().filter(|line| !line.is_empty()).collect();
    if offenders.is_empty() {
        Ok(indicators.compliant(format!("no unowned files under '{path}'")))
    } else {
        Ok(indicators.non_compliant(format!("{} unowned file(s) under '{path}'", offenders.len())))
    }
}

/// `EnsureNoWorldWritableFiles` schema.
pub const ENSURE_NO_WORLD_WRITABLE_FILES_SCHEMA: &[ParamField] = &[ParamField { name: "path", ty: ParamType::String, required: true }];

/// Verifies no regular file under `path` is world-writable.
pub fn ensure_no_world_writable_files_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let path = args.string("path")?;
    let Ok(output) = run(context, &format!("find '{path}' -xdev -type f -perm -0002")) else {
        return Ok(indicators.error(ErrorKind::System, format!("'find {path}' failed")));
    };
    let offenders: Vec<&str> = output.lines().filter(|line| !line.is_empty()).collect();
    if offenders.is_empty() {
        Ok(indicators.compliant(format!("no world-writable files under '{path}'")))
    } else {
        Ok(indicators.non_compliant(format!("{} world-writable file(s) under '{path}'", offenders.len())))
    }
}

/// `EnsureNoDuplicateEntriesExist` schema.
pub const ENSURE_NO_DUPLICATE_ENTRIES_EXIST_SCHEMA: &[ParamField] =
    &[ParamField { name: "path", ty: ParamType::String, required: true }, ParamField { name: "field", ty: ParamType::Int, required: true }];

/// Verifies a colon-delimited file (e.g. `/etc/passwd`) has no duplicate value in `field`.
pub fn ensure_no_duplicate_entries_exist_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let path = args.string("path")?;
    let field = args.int("field")?;
    let Ok(text) = context.get_file_contents(std::path::Path::new(path)) else {
        return Ok(indicators.error(ErrorKind::System, format!("could not read '{path}'")));
    };
    let mut seen = std::collections::BTreeSet::new();
    let mut duplicates = std::collections::BTreeSet::new();
    for line in text.lines() {
        let field_index = usize::try_from(field).unwrap_or(0);
        if let Some(value) = line.split(':').nth(field_index) {
            if !seen.insert(value.to_string()) {
                duplicates.insert(value.to_string());
            }
        }
    }
    if duplicates.is_empty() {
        Ok(indicators.compliant(format!("no duplicate entries in '{path}' field {field}")))
    } else {
        Ok(indicators.non_compliant(format!("duplicate entries in '{path}' field {field}: {duplicates:?}")))
    }
}

// ============================================================================
// SECTION: SSH keys and interactive home directories
// ============================================================================

/// `EnsureSshKeyFilePermissions` schema.
pub const ENSURE_SSH_KEY_FILE_PERMISSIONS_SCHEMA: &[ParamField] = &[ParamField { name: "directory", ty: ParamType::String, required: true }];

/// Verifies private keys (no `.pub` suffix) under `directory` are mode `0600` or tighter.
pub fn ensure_ssh_key_file_permissions_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let directory = args.string("directory")?;
    let Ok(output) = run(context, &format!("find '{directory}' -maxdepth 1 -type f ! -name '*.pub' -perm /077")) else {
        return Ok(indicators.error(ErrorKind::System, format!("'find {directory}' failed")));
    };
    let offenders: Vec<&str> = output.lines().filter(|line| !line.is_empty()).collect();
    if offenders.is_empty() {
        Ok(indicators.compliant(format!("all private keys under '{directory}' are mode 0600 or tighter")))
    } else {
        Ok(indicators.non_compliant(format!("{} key(s) under '{directory}' exceed mode 0600", offenders.len())))
    }
}

/// `EnsureInteractiveUsersHomeDirectoriesExist` schema.
pub const ENSURE_INTERACTIVE_USERS_HOME_DIRECTORIES_EXIST_SCHEMA: &[ParamField] = &[];

/// Verifies every interactive user (shell listed in `/etc/shells`) has an existing home directory.
pub fn ensure_interactive_users_home_directories_exist_audit(
    _args: &BoundArgs,
    context: &dyn Context,
    indicators: &mut IndicatorsTree,
) -> EngineResult<Status> {
    let users = crate::user_group::interactive_users_for_other(context);
    let mut missing = Vec::new();
    for (name, home) in users {
        if run(context, &format!("test -d '{home}'")).is_err() {
            missing.push(name);
        }
    }
    if missing.is_empty() {
        Ok(indicators.compliant("every interactive user has a home directory"))
    } else {
        Ok(indicators.non_compliant(format!("missing home directories for: {}", missing.join(", "))))
    }
}

// ============================================================================
// SECTION: Session and desktop hardening
// ============================================================================

/// `EnsureDefaultShellTimeoutIsConfigured` schema.
pub const ENSURE_DEFAULT_SHELL_TIMEOUT_IS_CONFIGURED_SCHEMA: &[ParamField] = &[ParamField { name: "maxSeconds", ty: ParamType::Int, required: true }];

/// Verifies `/etc/profile` sets `TMOUT` to at most `maxSeconds`.
pub fn ensure_default_shell_timeout_is_configured_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let max_seconds = args.int("maxSeconds")?;
    let Ok(text) = context.get_file_contents(std::path::Path::new("/etc/profile")) else {
        return Ok(indicators.error(ErrorKind::System, "could not read '/etc/profile'"));
    };
    let tmout = text.lines().rev().find_map(|line| line.trim().strip_prefix("TMOUT=")).and_then(|value| value.parse::<i64>().ok());
    match tmout {
        Some(value) if value > 0 && value <= max_seconds => Ok(indicators.compliant(format!("TMOUT is {value}"))),
        Some(value) => Ok(indicators.non_compliant(format!("TMOUT is {value}, expected at most {max_seconds}"))),
        None => Ok(indicators.non_compliant("TMOUT is not set")),
    }
}

/// Appends a `TMOUT` setting to `/etc/profile`.
pub fn ensure_default_shell_timeout_is_configured_remediate(
    args: &BoundArgs,
    context: &dyn Context,
    indicators: &mut IndicatorsTree,
) -> EngineResult<Status> {
    let max_seconds = args.int("maxSeconds")?;
    if run(context, &format!("echo 'TMOUT={max_seconds}' >> /etc/profile")).is_err() {
        return Ok(indicators.error(ErrorKind::System, "failed to append TMOUT to '/etc/profile'"));
    }
    Ok(indicators.compliant(format!("TMOUT set to {max_seconds}")))
}

/// `EnsureDefaultUmaskIsConfigured` schema.
pub const ENSURE_DEFAULT_UMASK_IS_CONFIGURED_SCHEMA: &[ParamField] = &[ParamField { name: "expectedUmask", ty: ParamType::OctalMode, required: true }];

/// Verifies `/etc/login.defs`' `UMASK` matches `expectedUmask`.
pub fn ensure_default_umask_is_configured_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let expected = args.octal("expectedUmask")?;
    let Ok(text) = context.get_file_contents(std::path::Path::new("/etc/login.defs")) else {
        return Ok(indicators.error(ErrorKind::System, "could not read '/etc/login.defs'"));
    };
    let actual = text.lines().rev().find_map(|line| {
        let mut parts = line.split_whitespace();
        (parts.next()? == "UMASK").then(|| parts.next()).flatten()
    });
    match actual.and_then(|value| u32::from_str_radix(value, 8).ok()) {
        Some(value) if value == expected => Ok(indicators.compliant(format!("UMASK is {expected:03o}"))),
        Some(value) => Ok(indicators.non_compliant(format!("UMASK is {value:03o}, expected {expected:03o}"))),
        None => Ok(indicators.non_compliant("UMASK is not set")),
    }
}

/// `EnsureWirelessIsDisabled` schema.
pub const ENSURE_WIRELESS_IS_DISABLED_SCHEMA: &[ParamField] = &[];

/// Verifies no wireless interface is reported by `nmcli` as enabled.
pub fn ensure_wireless_is_disabled_audit(_args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    match run(context, "nmcli radio wifi") {
        Ok(output) if output.trim().eq_ignore_ascii_case("disabled") => Ok(indicators.compliant("wireless radio is disabled")),
        Ok(_) => Ok(indicators.non_compliant("wireless radio is enabled")),
        Err(_) => Ok(indicators.compliant("no wireless radio management present")),
    }
}

/// Disables wireless radios via `nmcli`.
pub fn ensure_wireless_is_disabled_remediate(_args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    if run(context, "nmcli radio wifi off").is_err() {
        return Ok(indicators.error(ErrorKind::System, "failed to disable wireless radio"));
    }
    Ok(indicators.compliant("wireless radio disabled"))
}

/// `EnsureXdmcpIsNotEnabled` schema.
pub const ENSURE_XDMCP_IS_NOT_ENABLED_SCHEMA: &[ParamField] = &[];

/// Verifies GDM's `Enable` flag under `[xdmcp]` is not `true`.
pub fn ensure_xdmcp_is_not_enabled_audit(_args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let Ok(text) = context.get_file_contents(std::path::Path::new("/etc/gdm3/custom.conf")) else {
        return Ok(indicators.compliant("no GDM configuration present"));
    };
    let in_xdmcp_section = text.lines().scan(false, |in_section, line| {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("[xdmcp]") {
            *in_section = true;
        } else if trimmed.starts_with('[') {
            *in_section = false;
        }
        Some((*in_section, trimmed))
    });
    let enabled = in_xdmcp_section.any(|(in_section, line)| in_section && line.eq_ignore_ascii_case("enable=true"));
    if enabled {
        Ok(indicators.non_compliant("XDMCP is enabled in GDM"))
    } else {
        Ok(indicators.compliant("XDMCP is not enabled in GDM"))
    }
}

/// `EnsureAppArmorProfilesAreEnforced` schema.
pub const ENSURE_APP_ARMOR_PROFILES_ARE_ENFORCED_SCHEMA: &[ParamField] = &[ParamField { name: "minimumCount", ty: ParamType::Int, required: true }];

/// Verifies `aa-status` reports at least `minimumCount` profiles in enforce mode.
pub fn ensure_app_armor_profiles_are_enforced_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let minimum = args.int("minimumCount")?;
    let Ok(output) = run(context, "aa-status --enforced") else {
        return Ok(indicators.error(ErrorKind::System, "'aa-status --enforced' failed"));
    };
    let count: i64 = output.trim().parse().unwrap_or(0);
    if count >= minimum {
        Ok(indicators.compliant(format!("{count} profiles enforced")))
    } else {
        Ok(indicators.non_compliant(format!("{count} profiles enforced, expected at least {minimum}")))
    }
}

// ============================================================================
// SECTION: Generic escape hatches
// ============================================================================

/// `ExecuteCommandGrep` schema.
pub const EXECUTE_COMMAND_GREP_SCHEMA: &[ParamField] =
    &[ParamField { name: "command", ty: ParamType::String, required: true }, ParamField { name: "pattern", ty: ParamType::String, required: true }];

/// Runs an arbitrary command and checks whether any output line matches `pattern`.
pub fn execute_command_grep_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let command = args.string("command")?;
    let pattern = args.string("pattern")?;
    let Ok(output) = run(context, command) else {
        return Ok(indicators.error(ErrorKind::System, format!("command '{command}' failed")));
    };
    match regex(pattern) {
        Ok(re) if re.is_match(&output) => Ok(indicators.compliant(format!("'{command}' output matches '{pattern}'"))),
        Ok(_) => Ok(indicators.non_compliant(format!("'{command}' output does not match '{pattern}'"))),
        Err(status) => Ok(apply(indicators, status)),
    }
}

/// `SCE` (script-check-engine) schema: an external script, invoked with its `environment`
/// string passed through as the subprocess's environment block.
pub const SCE_SCHEMA: &[ParamField] = &[
    ParamField { name: "scriptPath", ty: ParamType::String, required: true },
    ParamField { name: "environment", ty: ParamType::Optional(&ParamType::String), required: false },
];

/// Invokes an external script, treating exit code 0 as `Compliant` and any other exit as `NonCompliant`.
pub fn sce_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let script = args.string("scriptPath")?;
    let environment = args.string_opt("environment")?.unwrap_or_default();
    let command = format!("env {environment} '{script}'");
    match run(context, &command) {
        Ok(_) => Ok(indicators.compliant(format!("'{script}' exited successfully"))),
        Err(_) => Ok(indicators.non_compliant(format!("'{script}' exited with a non-zero status"))),
    }
}

/// Folds a pre-computed `Status` into the current indicator node, preserving its evidence text.
fn apply(indicators: &mut IndicatorsTree, status: Status) -> Status {
    match &status {
        Status::Compliant => indicators.compliant("command succeeded"),
        Status::NonCompliant => indicators.non_compliant("command reported non-compliance"),
        Status::Error { kind, message } => indicators.error(*kind, message.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::ensure_sysctl_value_audit;
    use super::ensure_ufw_open_ports_audit;
    use super::execute_command_grep_audit;
    use super::kernel_module_is_disabled_audit;
    use super::ENSURE_SYSCTL_VALUE_SCHEMA;
    use super::ENSURE_UFW_OPEN_PORTS_SCHEMA;
    use super::EXECUTE_COMMAND_GREP_SCHEMA;
    use super::KERNEL_MODULE_IS_DISABLED_SCHEMA;
    use compliance_core::IndicatorsTree;
    use compliance_core::Status;
    use compliance_core::bind;
    use compliance_core::testing::MockContext;
    use std::collections::BTreeMap;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn sysctl_value_matches_expected() {
        let raw = args(&[("key", "net.ipv4.ip_forward"), ("value", "0")]);
        let bound = bind(ENSURE_SYSCTL_VALUE_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("sysctl -n net.ipv4.ip_forward", "0\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureSysctlValue");
        let status = ensure_sysctl_value_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
    }

    #[test]
    fn sysctl_value_mismatch_is_non_compliant() {
        let raw = args(&[("key", "net.ipv4.ip_forward"), ("value", "0")]);
        let bound = bind(ENSURE_SYSCTL_VALUE_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("sysctl -n net.ipv4.ip_forward", "1\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureSysctlValue");
        let status = ensure_sysctl_value_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }

    #[test]
    fn loaded_module_is_non_compliant() {
        let raw = args(&[("moduleName", "usb_storage")]);
        let bound = bind(KERNEL_MODULE_IS_DISABLED_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("lsmod | grep -qw 'usb_storage'", "");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("KernelModuleIsDisabled");
        let status = kernel_module_is_disabled_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }

    #[test]
    fn ufw_open_ports_reports_every_missing_port() {
        let raw = args(&[("ports", "22,443")]);
        let bound = bind(ENSURE_UFW_OPEN_PORTS_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("ufw status", "Status: active\n22/tcp ALLOW Anywhere\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureUfwOpenPorts");
        let status = ensure_ufw_open_ports_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }

    #[test]
    fn execute_command_grep_matches_output() {
        let raw = args(&[("command", "uname -r"), ("pattern", r"^\d+\.\d+")]);
        let bound = bind(EXECUTE_COMMAND_GREP_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("uname -r", "6.1.0\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("ExecuteCommandGrep");
        let status = execute_command_grep_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
    }
}
