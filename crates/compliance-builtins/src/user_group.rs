// compliance-builtins/src/user_group.rs
// ============================================================================
// Family: User/Group
// Description: EnsureInteractiveUsersDotFilesAccessIsConfigured and
// EnsureShadowContains.
// Purpose: Implement spec.md §4.4.5.
// Dependencies: regex, compliance_core::{BoundArgs, Context, IndicatorsTree,
// SpecialPath}
// ============================================================================

use regex::Regex;

use compliance_core::BoundArgs;
use compliance_core::Context;
use compliance_core::ErrorKind;
use compliance_core::IndicatorsTree;
use compliance_core::ParamField;
use compliance_core::ParamType;
use compliance_core::SpecialPath;
use compliance_core::Status;
use compliance_logic::EngineResult;
use compliance_logic::fold_all_of;

// ============================================================================
// SECTION: EnsureInteractiveUsersDotFilesAccessIsConfigured
// ============================================================================

/// No-parameter schema.
pub const DOTFILES_SCHEMA: &[ParamField] = &[];

/// One `/etc/passwd` row's name, home directory, and login shell.
struct PasswdEntry {
    name: String,
    home: String,
    shell: String,
}

/// Parses `getent passwd` output into its rows.
fn parse_passwd(text: &str) -> Vec<PasswdEntry> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?.to_string();
            let _passwd = fields.next()?;
            let _uid = fields.next()?;
            let _gid = fields.next()?;
            let _gecos = fields.next()?;
            let home = fields.next()?.to_string();
            let shell = fields.next().unwrap_or_default().to_string();
            Some(PasswdEntry { name, home, shell })
        })
        .collect()
}

/// Returns the interactive users: those whose shell is listed in `/etc/shells` and is not `nologin`.
fn interactive_users(context: &dyn Context) -> Vec<PasswdEntry> {
    let passwd = context.execute("getent passwd").unwrap_or_default();
    let shells_path = context.get_special_file_path(SpecialPath::Shells);
    let shells_text = context.get_file_contents(&shells_path).unwrap_or_default();
    let allowed: Vec<&str> = shells_text.lines().map(str::trim).filter(|line| !line.is_empty() && !line.starts_with('#')).collect();

    parse_passwd(&passwd)
        .into_iter()
        .filter(|entry| allowed.contains(&entry.shell.as_str()) && !entry.shell.contains("nologin"))
        .collect()
}

/// Returns each interactive user's name and home directory, for builtins outside this
/// family that only need that pair (e.g. home-directory existence checks).
pub(crate) fn interactive_users_for_other(context: &dyn Context) -> Vec<(String, String)> {
    interactive_users(context).into_iter().map(|entry| (entry.name, entry.home)).collect()
}

/// Lists dotfiles directly under `home` (regular files whose name starts with `.`).
fn list_dotfiles(context: &dyn Context, home: &str) -> Vec<String> {
    let escaped = home.replace('\'', "'\\''");
    let output = context.execute(&format!("find '{escaped}' -maxdepth 1 -type f -name '.*'")).unwrap_or_default();
    output.lines().filter(|line| !line.is_empty()).map(str::to_string).collect()
}

/// Checks one user's dotfiles; pushes one indicator child per file examined.
fn check_user_dotfiles(context: &dyn Context, user: &PasswdEntry, indicators: &mut IndicatorsTree, remediate: bool) -> Vec<Status> {
    let mut statuses = Vec::new();
    for path in list_dotfiles(context, &user.home) {
        let name = path.rsplit('/').next().unwrap_or(&path);
        indicators.push(name);
        let status = if name == ".forward" || name == ".rhost" {
            indicators.non_compliant(format!("'{path}' must not exist"))
        } else if name == ".netrc" || name == ".bash_history" {
            check_or_fix_mode(context, &path, &user.name, 0o177, indicators, remediate)
        } else {
            check_or_fix_mode(context, &path, &user.name, 0o133, indicators, remediate)
        };
        indicators.set_status(status.clone());
        indicators.pop();
        statuses.push(status);
    }
    statuses
}

/// Verifies (or, on remediation, repairs) one file's owner/group/mask triple.
fn check_or_fix_mode(context: &dyn Context, path: &str, user: &str, mask: u32, indicators: &mut IndicatorsTree, remediate: bool) -> Status {
    let escaped = path.replace('\'', "'\\''");
    let Ok(output) = context.execute(&format!("stat -c '%a %U %G' '{escaped}'")) else {
        return indicators.error(ErrorKind::System, format!("could not stat '{path}'"));
    };
    let mut fields = output.split_whitespace();
    let Some(mode) = fields.next().and_then(|text| u32::from_str_radix(text, 8).ok()) else {
        return indicators.error(ErrorKind::System, format!("unparsable stat output for '{path}'"));
    };
    let owner = fields.next().unwrap_or_default();
    let violation = owner != user || (mode & mask != 0);

    if !violation {
        return indicators.compliant(format!("'{path}' has correct ownership and mode"));
    }
    if !remediate {
        return indicators.non_compliant(format!("'{path}' has incorrect ownership or mode"));
    }
    let new_mode = mode & !mask;
    if context.execute(&format!("chown '{user}' '{escaped}' && chmod {new_mode:o} '{escaped}'")).is_err() {
        return indicators.error(ErrorKind::System, format!("failed to repair '{path}'"));
    }
    indicators.compliant(format!("'{path}' repaired to mode {new_mode:o}"))
}

/// `EnsureInteractiveUsersDotFilesAccessIsConfigured` audit entry point.
pub fn dotfiles_audit(_args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let mut all = Vec::new();
    for user in interactive_users(context) {
        all.extend(check_user_dotfiles(context, &user, indicators, false));
    }
    Ok(fold_all_of(all))
}

/// `EnsureInteractiveUsersDotFilesAccessIsConfigured` remediate entry point. Never deletes files.
pub fn dotfiles_remediate(_args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let mut all = Vec::new();
    for user in interactive_users(context) {
        all.extend(check_user_dotfiles(context, &user, indicators, true));
    }
    Ok(fold_all_of(all))
}

// ============================================================================
// SECTION: EnsureShadowContains
// ============================================================================

const SHADOW_FIELDS: &[&str] =
    &["username", "password", "chg_lst", "chg_allow", "chg_req", "exp_warn", "exp_inact", "exp_date", "flag", "encrypt_method"];
const SHADOW_OPS: &[&str] = &["eq", "ne", "lt", "le", "gt", "ge", "match"];

/// `EnsureShadowContains` schema.
pub const ENSURE_SHADOW_CONTAINS_SCHEMA: &[ParamField] = &[
    ParamField { name: "username", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "field", ty: ParamType::Enumeration(SHADOW_FIELDS), required: true },
    ParamField { name: "value", ty: ParamType::String, required: true },
    ParamField { name: "operation", ty: ParamType::Enumeration(SHADOW_OPS), required: true },
    ParamField { name: "test_etcShadowPath", ty: ParamType::Optional(&ParamType::String), required: false },
];

/// Extracts the named column from one `/etc/shadow` row. `encrypt_method` is derived
/// from the `password` field's leading `$id$` tag rather than a literal shadow column.
fn shadow_field<'a>(columns: &[&'a str], field: &str) -> Option<&'a str> {
    if field == "encrypt_method" {
        return columns.first().and_then(|password| password.strip_prefix('$')).and_then(|rest| rest.split('$').next());
    }
    let index = SHADOW_FIELDS.iter().position(|candidate| *candidate == field)?;
    columns.get(index).copied()
}

/// Evaluates `operation` between `actual` and `expected`, treating numeric ops as integer compares.
fn shadow_compare(operation: &str, actual: &str, expected: &str) -> Result<bool, String> {
    match operation {
        "eq" => Ok(actual == expected),
        "ne" => Ok(actual != expected),
        "match" => Regex::new(expected).map(|re| re.is_match(actual)).map_err(|err| err.to_string()),
        "lt" | "le" | "gt" | "ge" => {
            let actual_n: i64 = actual.parse().map_err(|_| format!("'{actual}' is not numeric"))?;
            let expected_n: i64 = expected.parse().map_err(|_| format!("'{expected}' is not numeric"))?;
            Ok(match operation {
                "lt" => actual_n < expected_n,
                "le" => actual_n <= expected_n,
                "gt" => actual_n > expected_n,
                _ => actual_n >= expected_n,
            })
        }
        _ => Err(format!("unsupported operation '{operation}'")),
    }
}

/// `EnsureShadowContains` audit entry point.
pub fn ensure_shadow_contains_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let username = args.string_opt("username")?;
    let field = args.enumeration("field")?;
    let value = args.string("value")?;
    let operation = args.enumeration("operation")?;

    let path = args
        .string_opt("test_etcShadowPath")?
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| context.get_special_file_path(SpecialPath::Shadow));
    let Ok(text) = context.get_file_contents(&path) else {
        return Ok(indicators.error(ErrorKind::System, "could not read the shadow database"));
    };

    let mut statuses = Vec::new();
    let mut matched_any_user = username.is_none();
    for line in text.lines() {
        let columns: Vec<&str> = line.split(':').collect();
        let Some(name) = columns.first() else { continue };
        if let Some(username) = username {
            if *name != username {
                continue;
            }
        }
        matched_any_user = true;
        let actual = shadow_field(&columns, field).unwrap_or_default();
        match shadow_compare(operation, actual, value) {
            Ok(true) => statuses.push(indicators.compliant(format!("'{name}' field '{field}' is '{actual}'"))),
            Ok(false) => statuses.push(indicators.non_compliant(format!("'{name}' field '{field}' is '{actual}', expected {operation} '{value}'"))),
            Err(err) => return Ok(indicators.error(ErrorKind::Caller, err)),
        }
    }
    if !matched_any_user {
        return Ok(indicators.non_compliant("requested username was not found in the shadow database"));
    }
    Ok(fold_all_of(statuses))
}

#[cfg(test)]
mod tests {
    use super::dotfiles_audit;
    use super::ensure_shadow_contains_audit;
    use super::DOTFILES_SCHEMA;
    use super::ENSURE_SHADOW_CONTAINS_SCHEMA;
    use compliance_core::IndicatorsTree;
    use compliance_core::SpecialPath;
    use compliance_core::Status;
    use compliance_core::bind;
    use compliance_core::testing::MockContext;
    use std::collections::BTreeMap;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn dotfiles_audit_flags_bash_history_with_group_write_bit() {
        let bound = bind(DOTFILES_SCHEMA, &BTreeMap::new()).expect("binds");
        let context = MockContext::new()
            .with_command("getent passwd", "alice:x:1000:1000::/home/alice:/bin/bash\n")
            .with_special_path(SpecialPath::Shells, "/etc/shells")
            .with_file("/etc/shells", "/bin/bash\n")
            .with_command("find '/home/alice' -maxdepth 1 -type f -name '.*'", "/home/alice/.bash_history\n")
            .with_command("stat -c '%a %U %G' '/home/alice/.bash_history'", "640 alice alice\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureInteractiveUsersDotFilesAccessIsConfigured");
        let status = dotfiles_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }

    #[test]
    fn dotfiles_audit_is_compliant_when_every_file_is_clean() {
        let bound = bind(DOTFILES_SCHEMA, &BTreeMap::new()).expect("binds");
        let context = MockContext::new()
            .with_command("getent passwd", "alice:x:1000:1000::/home/alice:/bin/bash\n")
            .with_special_path(SpecialPath::Shells, "/etc/shells")
            .with_file("/etc/shells", "/bin/bash\n")
            .with_command("find '/home/alice' -maxdepth 1 -type f -name '.*'", "/home/alice/.bashrc\n")
            .with_command("stat -c '%a %U %G' '/home/alice/.bashrc'", "644 alice alice\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureInteractiveUsersDotFilesAccessIsConfigured");
        let status = dotfiles_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
    }

    #[test]
    fn shadow_contains_matches_encrypt_method_from_hash_tag() {
        let raw = args(&[("username", "alice"), ("field", "encrypt_method"), ("value", "6"), ("operation", "eq"), ("test_etcShadowPath", "/tmp/shadow")]);
        let bound = bind(ENSURE_SHADOW_CONTAINS_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_file("/tmp/shadow", "alice:$6$rounds=5000$abcdef:19000:0:99999:7:::\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureShadowContains");
        let status = ensure_shadow_contains_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
    }

    #[test]
    fn shadow_contains_reports_non_compliant_for_weaker_hash() {
        let raw = args(&[("username", "bob"), ("field", "encrypt_method"), ("value", "6"), ("operation", "eq"), ("test_etcShadowPath", "/tmp/shadow")]);
        let bound = bind(ENSURE_SHADOW_CONTAINS_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_file("/tmp/shadow", "bob:$1$abc$def:19000:0:99999:7:::\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureShadowContains");
        let status = ensure_shadow_contains_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }
}
