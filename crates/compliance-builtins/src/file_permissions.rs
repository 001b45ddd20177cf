// compliance-builtins/src/file_permissions.rs
// ============================================================================
// Family: File Permissions
// Description: EnsureFilePermissions and its directory-walking collection
// form.
// Purpose: Implement spec.md §4.4.1, grounded on
// original_source/.../EnsureFilePermissions.cpp and FilePermissionsHelpers.cpp.
// Dependencies: compliance_core::{BoundArgs, BoundValue, Context, IndicatorsTree}
// ============================================================================

//! `stat`/`chown`/`chmod` are dispatched through [`Context::execute`] rather
//! than direct syscalls: the evaluation seam this crate is built against
//! only exposes process execution and file reads, matching Design Note
//! "Command runner as a seam."

use compliance_core::BoundArgs;
use compliance_core::BoundValue;
use compliance_core::Context;
use compliance_core::ErrorKind;
use compliance_core::IndicatorsTree;
use compliance_core::ParamField;
use compliance_core::ParamType;
use compliance_core::Status;
use compliance_logic::EngineResult;

/// Mask applied when displaying the current mode, matching `FilePermissionsHelpers.cpp`'s `displayMask`.
const DISPLAY_MASK: u32 = 0o7777;

/// `EnsureFilePermissions` schema.
pub const FILE_PERMISSIONS_SCHEMA: &[ParamField] = &[
    ParamField { name: "filename", ty: ParamType::String, required: true },
    ParamField { name: "owner", ty: ParamType::Optional(&ParamType::Separated(&ParamType::String, '|')), required: false },
    ParamField { name: "group", ty: ParamType::Optional(&ParamType::Separated(&ParamType::String, '|')), required: false },
    ParamField { name: "permissions", ty: ParamType::Optional(&ParamType::OctalMode), required: false },
    ParamField { name: "mask", ty: ParamType::Optional(&ParamType::OctalMode), required: false },
];

/// `EnsureFilePermissionsCollection` schema: the scalar schema plus a directory and glob.
pub const FILE_PERMISSIONS_COLLECTION_SCHEMA: &[ParamField] = &[
    ParamField { name: "directory", ty: ParamType::String, required: true },
    ParamField { name: "ext", ty: ParamType::String, required: true },
    ParamField { name: "owner", ty: ParamType::Optional(&ParamType::Separated(&ParamType::String, '|')), required: false },
    ParamField { name: "group", ty: ParamType::Optional(&ParamType::Separated(&ParamType::String, '|')), required: false },
    ParamField { name: "permissions", ty: ParamType::Optional(&ParamType::OctalMode), required: false },
    ParamField { name: "mask", ty: ParamType::Optional(&ParamType::OctalMode), required: false },
];

/// One file's current owner/group/mode, read via `stat`.
struct Stat {
    mode: u32,
    owner: String,
    group: String,
}

/// Runs `stat -c '%a %U %G' <path>` and parses its output.
fn stat_file(context: &dyn Context, path: &str) -> Result<Stat, String> {
    let escaped = path.replace('\'', "'\\''");
    let output = context.execute(&format!("stat -c '%a %U %G' '{escaped}'"))?;
    let mut fields = output.split_whitespace();
    let mode = fields.next().and_then(|text| u32::from_str_radix(text, 8).ok()).ok_or_else(|| format!("unparsable stat output for '{path}'"))?;
    let owner = fields.next().ok_or_else(|| format!("unparsable stat output for '{path}'"))?.to_string();
    let group = fields.next().ok_or_else(|| format!("unparsable stat output for '{path}'"))?.to_string();
    Ok(Stat { mode, owner, group })
}

/// Extracts the `|`-separated string alternatives bound to an optional field.
fn alternatives(args: &BoundArgs, name: &str) -> EngineResult<Option<Vec<String>>> {
    let Some(values) = args.list_opt(name)? else { return Ok(None) };
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        if let BoundValue::Str(text) = value {
            out.push(text.clone());
        }
    }
    Ok(Some(out))
}

/// Audits one file's owner, group, required-minimum `permissions`, and forbidden `mask` bits.
fn audit_one(args: &BoundArgs, context: &dyn Context, filename: &str, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let stat = match stat_file(context, filename) {
        Ok(stat) => stat,
        Err(_) => return Ok(indicators.compliant(format!("File '{filename}' does not exist"))),
    };

    if let Some(owners) = alternatives(args, "owner")? {
        if !owners.iter().any(|candidate| candidate == &stat.owner) {
            return Ok(indicators.non_compliant(format!(
                "Invalid owner on '{filename}' - is '{}' should be '{}'",
                stat.owner,
                owners.join("|")
            )));
        }
    }
    if let Some(groups) = alternatives(args, "group")? {
        if !groups.iter().any(|candidate| candidate == &stat.group) {
            return Ok(indicators.non_compliant(format!(
                "Invalid group on '{filename}' - is '{}' should be '{}'",
                stat.group,
                groups.join("|")
            )));
        }
    }

    let permissions = args.octal_opt("permissions")?;
    let mask = args.octal_opt("mask")?;
    if let (Some(perms), Some(mask)) = (permissions, mask) {
        if perms & mask != 0 {
            return Ok(indicators.error(ErrorKind::Caller, "Invalid permissions and mask - same bits set in both"));
        }
    }
    if let Some(perms) = permissions {
        if stat.mode & perms != perms {
            return Ok(indicators.non_compliant(format!(
                "Invalid permissions on '{filename}' - are {:o} should be at least {perms:o}",
                stat.mode & DISPLAY_MASK
            )));
        }
    }
    if let Some(mask) = mask {
        if stat.mode & mask != 0 {
            let suggested = stat.mode & !mask & DISPLAY_MASK;
            return Ok(indicators.non_compliant(format!(
                "Invalid permissions on '{filename}' - are {:o} should be set to {suggested:03o} or a more restrictive value",
                stat.mode & DISPLAY_MASK
            )));
        }
    }
    Ok(indicators.compliant(format!("File '{filename}' has correct permissions and ownership")))
}

/// Remediates one file: `chown` to the first alternative (if mismatched), then `chmod` the diff.
fn remediate_one(args: &BoundArgs, context: &dyn Context, filename: &str, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let stat = match stat_file(context, filename) {
        Ok(stat) => stat,
        Err(_) => return Ok(indicators.non_compliant(format!("File '{filename}' does not exist"))),
    };

    let owners = alternatives(args, "owner")?;
    let groups = alternatives(args, "group")?;
    let owner_ok = owners.as_ref().is_none_or(|list| list.iter().any(|candidate| candidate == &stat.owner));
    let group_ok = groups.as_ref().is_none_or(|list| list.iter().any(|candidate| candidate == &stat.group));
    if !owner_ok || !group_ok {
        let target_owner = owners.as_ref().and_then(|list| list.first()).cloned().unwrap_or_else(|| stat.owner.clone());
        let target_group = groups.as_ref().and_then(|list| list.first()).cloned().unwrap_or_else(|| stat.group.clone());
        let escaped = filename.replace('\'', "'\\''");
        if context.execute(&format!("chown '{target_owner}:{target_group}' '{escaped}'")).is_err() {
            return Ok(indicators.error(ErrorKind::System, format!("failed to chown '{filename}'")));
        }
        indicators.back().evidence.push(format!("{filename} owner changed to {target_owner}:{target_group}"));
    }

    let permissions = args.octal_opt("permissions")?;
    let mask = args.octal_opt("mask")?;
    if let (Some(perms), Some(mask)) = (permissions, mask) {
        if perms & mask != 0 {
            return Ok(indicators.error(ErrorKind::Caller, "Invalid permissions and mask - same bits set in both"));
        }
    }
    let mut new_mode = stat.mode;
    if let Some(perms) = permissions {
        new_mode |= perms;
    }
    if let Some(mask) = mask {
        new_mode &= !mask;
    }
    if new_mode != stat.mode {
        let escaped = filename.replace('\'', "'\\''");
        if context.execute(&format!("chmod {new_mode:o} '{escaped}'")).is_err() {
            return Ok(indicators.error(ErrorKind::System, format!("failed to chmod '{filename}'")));
        }
        indicators.back().evidence.push(format!("{filename} permissions changed to {new_mode:o}"));
    }
    Ok(indicators.compliant(format!("File '{filename}' remediation succeeded")))
}

/// `EnsureFilePermissions` audit entry point.
pub fn ensure_file_permissions_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let filename = args.string("filename")?.to_string();
    audit_one(args, context, &filename, indicators)
}

/// `EnsureFilePermissions` remediate entry point.
pub fn ensure_file_permissions_remediate(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let filename = args.string("filename")?.to_string();
    remediate_one(args, context, &filename, indicators)
}

/// Lists the regular files directly under `directory` whose name matches the `ext` glob.
///
/// Dispatches `find <dir> -maxdepth 1 -type f -name <ext>` through `Context::execute`
/// rather than walking the filesystem directly, for the same reason `stat_file` shells out.
fn list_matching(context: &dyn Context, directory: &str, ext: &str) -> Result<Vec<String>, String> {
    let escaped_dir = directory.replace('\'', "'\\''");
    let escaped_ext = ext.replace('\'', "'\\''");
    let output = context.execute(&format!("find '{escaped_dir}' -maxdepth 1 -type f -name '{escaped_ext}'"))?;
    Ok(output.lines().map(str::to_string).filter(|line| !line.is_empty()).collect())
}

/// Shared body for `EnsureFilePermissionsCollection`'s audit and remediate entry points.
fn collection(
    args: &BoundArgs,
    context: &dyn Context,
    indicators: &mut IndicatorsTree,
    per_file: fn(&BoundArgs, &dyn Context, &str, &mut IndicatorsTree) -> EngineResult<Status>,
) -> EngineResult<Status> {
    let directory = args.string("directory")?.to_string();
    let ext = args.string("ext")?.to_string();
    let Ok(files) = list_matching(context, &directory, &ext) else {
        return Ok(indicators.compliant(format!("Directory '{directory}' does not exist")));
    };
    if files.is_empty() {
        return Ok(indicators.compliant(format!("No files in '{directory}' match the pattern")));
    }
    for file in &files {
        let status = per_file(args, context, file, indicators)?;
        if !status.is_compliant() {
            return Ok(status);
        }
    }
    Ok(indicators.compliant(format!("All matching files in '{directory}' match expected permissions")))
}

/// `EnsureFilePermissionsCollection` audit entry point.
pub fn ensure_file_permissions_collection_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    collection(args, context, indicators, audit_one)
}

/// `EnsureFilePermissionsCollection` remediate entry point.
pub fn ensure_file_permissions_collection_remediate(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    collection(args, context, indicators, remediate_one)
}

#[cfg(test)]
mod tests {
    use super::ensure_file_permissions_audit;
    use super::ensure_file_permissions_remediate;
    use super::FILE_PERMISSIONS_SCHEMA;
    use compliance_core::IndicatorsTree;
    use compliance_core::Status;
    use compliance_core::bind;
    use compliance_core::testing::MockContext;
    use std::collections::BTreeMap;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn happy_path_matches_minimum_permissions() {
        let raw = args(&[("filename", "/tmp/T"), ("permissions", "444")]);
        let bound = bind(FILE_PERMISSIONS_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("stat -c '%a %U %G' '/tmp/T'", "644 root root\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureFilePermissions");
        let status = ensure_file_permissions_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
        assert!(indicators.back().evidence[0].contains("correct permissions and ownership"));
    }

    #[test]
    fn mask_violation_reports_suggested_mode() {
        let raw = args(&[("filename", "/tmp/T"), ("mask", "0004")]);
        let bound = bind(FILE_PERMISSIONS_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_command("stat -c '%a %U %G' '/tmp/T'", "644 root root\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("EnsureFilePermissions");
        let status = ensure_file_permissions_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
        assert!(indicators.back().evidence[0].contains("should be set to 640"));
    }

    #[test]
    fn missing_file_is_compliant_on_audit_but_not_on_remediate() {
        let raw = args(&[("filename", "/tmp/missing")]);
        let bound = bind(FILE_PERMISSIONS_SCHEMA, &raw).expect("binds");
        let context = MockContext::new();
        let mut audit_indicators = IndicatorsTree::new("X");
        audit_indicators.push("EnsureFilePermissions");
        assert_eq!(ensure_file_permissions_audit(&bound, &context, &mut audit_indicators).expect("audits"), Status::Compliant);

        let mut remediate_indicators = IndicatorsTree::new("X");
        remediate_indicators.push("EnsureFilePermissions");
        assert_eq!(
            ensure_file_permissions_remediate(&bound, &context, &mut remediate_indicators).expect("remediates"),
            Status::NonCompliant
        );
    }
}
