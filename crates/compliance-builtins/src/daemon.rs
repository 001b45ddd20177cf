// compliance-builtins/src/daemon.rs
// ============================================================================
// Family: Daemon Configuration
// Description: EnsureSshdOption, SystemdParameter, SystemdUnitState,
// AuditdRulesCheck.
// Purpose: Implement spec.md §4.4.3.
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

// ============================================================================
// SECTION: EnsureSshdOption
// ============================================================================

const SSHD_OPS: &[&str] = &["equal", "not_equal", "regex_match", "ge_numeric"];
const SSHD_MODES: &[&str] = &["effective", "file"];

/// `EnsureSshdOption` schema.
pub const ENSURE_SSHD_OPTION_SCHEMA: &[ParamField] = &[
    ParamField { name: "option", ty: ParamType::String, required: true },
    ParamField { name: "value", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "op", ty: ParamType::Enumeration(SSHD_OPS), required: true },
    ParamField { name: "mode", ty: ParamType::Enumeration(SSHD_MODES), required: true },
];

/// Parses `key value` lines (one assignment per line, case-insensitive key) into a lookup.
fn parse_key_value_lines(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let mut parts = line.splitn(2, char::is_whitespace);
            let key = parts.next()?.to_string();
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((key, value))
        })
        .collect()
}

/// Finds the last value bound to `key`, matched case-insensitively.
fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().rev().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
}

/// Compares `actual` against `expected` per the bound `op`.
fn compare(op: &str, actual: &str, expected: &str) -> Result<bool, String> {
    match op {
        "equal" => Ok(actual == expected),
        "not_equal" => Ok(actual != expected),
        "regex_match" => Regex::new(expected).map(|re| re.is_match(actual)).map_err(|err| err.to_string()),
        "ge_numeric" => {
            let actual_n: i64 = actual.parse().map_err(|_| format!("'{actual}' is not numeric"))?;
            let expected_n: i64 = expected.parse().map_err(|_| format!("'{expected}' is not numeric"))?;
            Ok(actual_n >= expected_n)
        }
        _ => Err(format!("unsupported op '{op}'")),
    }
}

/// `EnsureSshdOption` audit entry point. Remediation is not modeled: sshd options are
/// edited by a configuration-management layer above this engine, not by this builtin.
pub fn ensure_sshd_option_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let option = args.string("option")?;
    let op = args.enumeration("op")?;
    let mode = args.enumeration("mode")?;
    let expected = args.string_opt("value")?.unwrap_or("");

    let text = match mode {
        "effective" => context.execute("sshd -T"),
        _ => {
            let path = context.get_special_file_path(SpecialPath::SshdConfig);
            context.get_file_contents(&path)
        }
    };
    let Ok(text) = text else { return Ok(indicators.error(ErrorKind::System, format!("failed to read sshd configuration for '{option}'"))) };

    let pairs = parse_key_value_lines(&text);
    let Some(actual) = last_value(&pairs, option) else {
        return Ok(indicators.non_compliant(format!("sshd option '{option}' is not set")));
    };

    match compare(op, actual, expected) {
        Ok(true) => Ok(indicators.compliant(format!("sshd option '{option}' is '{actual}'"))),
        Ok(false) => Ok(indicators.non_compliant(format!("sshd option '{option}' is '{actual}', expected '{expected}' ({op})"))),
        Err(err) => Ok(indicators.error(ErrorKind::Caller, err)),
    }
}

// ============================================================================
// SECTION: SystemdParameter
// ============================================================================

/// `SystemdParameter` schema.
pub const SYSTEMD_PARAMETER_SCHEMA: &[ParamField] = &[
    ParamField { name: "parameter", ty: ParamType::String, required: true },
    ParamField { name: "valueRegex", ty: ParamType::String, required: true },
    ParamField { name: "file", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "dir", ty: ParamType::Optional(&ParamType::String), required: false },
];

/// `SystemdParameter` audit entry point.
pub fn systemd_parameter_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let parameter = args.string("parameter")?;
    let value_regex = args.string("valueRegex")?;
    let file = args.string_opt("file")?;
    let dir = args.string_opt("dir")?;
    let target = match (file, dir) {
        (Some(target), None) | (None, Some(target)) => target,
        _ => return Ok(indicators.error(ErrorKind::Caller, "exactly one of 'file' or 'dir' is required")),
    };

    let escaped = target.replace('\'', "'\\''");
    let Ok(output) = context.execute(&format!("systemd-analyze cat-config '{escaped}'")) else {
        return Ok(indicators.error(ErrorKind::System, format!("'systemd-analyze cat-config {target}' failed")));
    };

    let pairs = parse_key_value_lines(&output);
    let Some(actual) = last_value(&pairs, parameter) else {
        return Ok(indicators.non_compliant(format!("parameter '{parameter}' is not set in '{target}'")));
    };

    let regex = Regex::new(value_regex).map_err(|err| compliance_logic::EngineError::Binding(format!("invalid valueRegex: {err}")))?;
    if regex.is_match(actual) {
        Ok(indicators.compliant(format!("'{parameter}' is '{actual}'")))
    } else {
        Ok(indicators.non_compliant(format!("'{parameter}' is '{actual}', does not match '{value_regex}'")))
    }
}

// ============================================================================
// SECTION: SystemdUnitState
// ============================================================================

/// `SystemdUnitState` schema.
pub const SYSTEMD_UNIT_STATE_SCHEMA: &[ParamField] = &[
    ParamField { name: "unitName", ty: ParamType::String, required: true },
    ParamField { name: "ActiveState", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "LoadState", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "UnitFileState", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "Unit", ty: ParamType::Optional(&ParamType::String), required: false },
];

/// `SystemdUnitState` audit entry point.
pub fn systemd_unit_state_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let unit = args.string("unitName")?;
    let escaped = unit.replace('\'', "'\\''");
    let Ok(output) = context.execute(&format!("systemctl show '{escaped}'")) else {
        return Ok(indicators.error(ErrorKind::System, format!("'systemctl show {unit}' failed")));
    };
    let pairs = parse_key_value_lines(&output);

    for key in ["ActiveState", "LoadState", "UnitFileState", "Unit"] {
        let Some(expected) = args.string_opt(key)? else { continue };
        let actual = last_value(&pairs, key).unwrap_or("");
        if actual != expected {
            return Ok(indicators.non_compliant(format!("unit '{unit}' has {key}='{actual}', expected '{expected}'")));
        }
    }
    Ok(indicators.compliant(format!("unit '{unit}' matches all expected properties")))
}

// ============================================================================
// SECTION: AuditdRulesCheck
// ============================================================================

/// `AuditdRulesCheck` schema.
pub const AUDITD_RULES_CHECK_SCHEMA: &[ParamField] = &[
    ParamField { name: "searchItem", ty: ParamType::String, required: true },
    ParamField { name: "excludeOption", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "requiredOptions", ty: ParamType::Separated(&ParamType::String, ':'), required: true },
];

/// Reads `UID_MIN` from `/etc/login.defs`, defaulting to the context's configured fallback when absent.
fn uid_min(context: &dyn Context) -> u32 {
    let fallback = context.uid_min_fallback();
    let path = context.get_special_file_path(SpecialPath::LoginDefs);
    let Ok(text) = context.get_file_contents(&path) else { return fallback };
    parse_key_value_lines(&text)
        .iter()
        .rev()
        .find(|(k, _)| k == "UID_MIN")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(fallback)
}

/// Resolves `SUDOLOGFILE` against the sudoers `logfile=` setting, if present.
fn resolve_sudo_logfile(context: &dyn Context, search_item: &str) -> String {
    if search_item != "SUDOLOGFILE" {
        return search_item.to_string();
    }
    let path = context.get_special_file_path(SpecialPath::Sudoers);
    let Ok(text) = context.get_file_contents(&path) else { return search_item.to_string() };
    text.lines()
        .filter_map(|line| line.trim().strip_prefix("logfile="))
        .next()
        .map(|value| value.trim_matches('"').to_string())
        .unwrap_or_else(|| search_item.to_string())
}

/// Reads every `.rules` file under the auditd rules directory and concatenates them.
fn read_rule_files(context: &dyn Context) -> String {
    let dir = context.get_special_file_path(SpecialPath::AuditRulesDir);
    let escaped = dir.display().to_string().replace('\'', "'\\''");
    context.execute(&format!("cat '{escaped}'/*.rules 2>/dev/null")).unwrap_or_default()
}

/// `AuditdRulesCheck` audit entry point.
pub fn auditd_rules_check_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let search_item = resolve_sudo_logfile(context, args.string("searchItem")?);
    let exclude = args.string_opt("excludeOption")?;
    let required: Vec<String> = args
        .list("requiredOptions")?
        .iter()
        .filter_map(|v| if let compliance_core::BoundValue::Str(s) = v { Some(s.clone()) } else { None })
        .collect();

    let min = uid_min(context).to_string();
    let substitute_auid = |text: String| -> String { Regex::new(r"auid>=\d+").map(|re| re.replace_all(&text, format!("auid>={min}")).into_owned()).unwrap_or(text) };

    let running = context.execute("auditctl -l").unwrap_or_default();
    let files = read_rule_files(context);
    let mut sources = Vec::new();
    if search_item == "-e 2" {
        sources.push(substitute_auid(files));
    } else {
        sources.push(substitute_auid(running));
        sources.push(substitute_auid(files));
    }

    let required_res: Result<Vec<Regex>, regex::Error> = required.iter().map(|pattern| Regex::new(pattern)).collect();
    let required_res = match required_res {
        Ok(patterns) => patterns,
        Err(err) => return Ok(indicators.error(ErrorKind::Caller, format!("invalid requiredOptions pattern: {err}"))),
    };

    let found = sources.iter().flat_map(|source| source.lines()).any(|line| {
        if !line.contains(&search_item) {
            return false;
        }
        if let Some(exclude) = exclude {
            if line.contains(exclude) {
                return false;
            }
        }
        required_res.iter().all(|re| re.is_match(line))
    });

    if found {
        Ok(indicators.compliant(format!("a rule matching '{search_item}' satisfies all required options")))
    } else {
        Ok(indicators.non_compliant(format!("no rule matching '{search_item}' satisfies all required options")))
    }
}

#[cfg(test)]
mod tests {
    use super::ensure_sshd_option_audit;
    use super::systemd_unit_state_audit;
    use super::ENSURE_SSHD_OPTION_SCHEMA;
    use super::SYSTEMD_UNIT_STATE_SCHEMA;
    use compliance_core::IndicatorsTree;
    use compliance_core::Status;
    use compliance_core::bind;
    use compliance_core::testing::MockContext;
    use std::collections::BTreeMap;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn sshd_option_matches_effective_value() {
        let raw = args(&[("option", "PermitRootLogin"), ("value", "no"), ("op", "equal"), ("mode", "effective")]);
        let bound = bind(ENSURE_SSHD_OPTION_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("sshd -T", "permitrootlogin no\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureSshdOption");
        let status = ensure_sshd_option_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
    }

    #[test]
    fn sshd_option_ge_numeric_fails_when_below_threshold() {
        let raw = args(&[("option", "ClientAliveCountMax"), ("value", "3"), ("op", "ge_numeric"), ("mode", "effective")]);
        let bound = bind(ENSURE_SSHD_OPTION_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("sshd -T", "clientalivecountmax 1\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureSshdOption");
        let status = ensure_sshd_option_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }

    #[test]
    fn systemd_unit_state_checks_every_requested_property() {
        let raw = args(&[("unitName", "sshd.service"), ("ActiveState", "active"), ("UnitFileState", "enabled")]);
        let bound = bind(SYSTEMD_UNIT_STATE_SCHEMA, &raw).expect("binds");
        let context = MockContext::new()
            .with_command("systemctl show 'sshd.service'", "ActiveState=active\nUnitFileState=disabled\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("SystemdUnitState");
        let status = systemd_unit_state_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }
}
