// compliance-builtins/src/content.rs
// ============================================================================
// Family: Content Inspection
// Description: FileRegexMatch, scanning files under a directory line-by-line
// against OVAL-style existence semantics.
// Purpose: Implement spec.md §4.4.2.
// Dependencies: regex, compliance_core::{BoundArgs, Context, IndicatorsTree}
// ============================================================================

use regex::RegexBuilder;

use compliance_core::BoundArgs;
use compliance_core::Context;
use compliance_core::ErrorKind;
use compliance_core::IndicatorsTree;
use compliance_core::ParamField;
use compliance_core::ParamType;
use compliance_core::Status;
use compliance_logic::EngineResult;

/// `FileRegexMatch`'s `behavior` values, per spec.md §4.4.2's OVAL existence table.
const BEHAVIORS: &[&str] = &["all_exist", "any_exist", "at_least_one_exists", "none_exist", "only_one_exists"];

/// `FileRegexMatch` schema.
pub const FILE_REGEX_MATCH_SCHEMA: &[ParamField] = &[
    ParamField { name: "path", ty: ParamType::String, required: true },
    ParamField { name: "filenamePattern", ty: ParamType::String, required: true },
    ParamField { name: "matchPattern", ty: ParamType::String, required: true },
    ParamField { name: "statePattern", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "ignoreCase", ty: ParamType::Optional(&ParamType::Bool), required: false },
    ParamField { name: "behavior", ty: ParamType::Enumeration(BEHAVIORS), required: true },
];

/// Lists regular files directly under `path` whose name matches `filename_pattern`.
fn list_candidates(context: &dyn Context, path: &str, filename_pattern: &regex::Regex) -> Result<Vec<String>, String> {
    let escaped = path.replace('\'', "'\\''");
    let output = context.execute(&format!("find '{escaped}' -maxdepth 1 -type f"))?;
    Ok(output
        .lines()
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let name = line.rsplit('/').next().unwrap_or(line);
            filename_pattern.is_match(name)
        })
        .map(str::to_string)
        .collect())
}

/// Scans one file line-by-line for `match_pattern`, optionally re-checking the capture against `state_pattern`.
fn scan_file(
    context: &dyn Context,
    file: &str,
    match_pattern: &regex::Regex,
    state_pattern: Option<&regex::Regex>,
) -> Result<bool, String> {
    let contents = context.get_file_contents(std::path::Path::new(file))?;
    for line in contents.lines() {
        let Some(captures) = match_pattern.captures(line) else { continue };
        let Some(state_pattern) = state_pattern else { return Ok(true) };
        let checked = captures.get(1).or_else(|| captures.get(0)).map_or("", |m| m.as_str());
        if state_pattern.is_match(checked) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `FileRegexMatch` audit entry point. There is no remediation: content inspection is read-only.
pub fn file_regex_match_audit(args: &BoundArgs, context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    let path = args.string("path")?;
    let ignore_case = args.bool_flag("ignoreCase")?;
    let behavior = args.enumeration("behavior")?.to_string();

    let filename_pattern = RegexBuilder::new(args.string("filenamePattern")?)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|err| compliance_logic::EngineError::Binding(format!("invalid filenamePattern: {err}")))?;
    let match_pattern = RegexBuilder::new(args.string("matchPattern")?)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|err| compliance_logic::EngineError::Binding(format!("invalid matchPattern: {err}")))?;
    let state_pattern = args
        .string_opt("statePattern")?
        .map(|pattern| RegexBuilder::new(pattern).case_insensitive(ignore_case).build())
        .transpose()
        .map_err(|err| compliance_logic::EngineError::Binding(format!("invalid statePattern: {err}")))?;

    let Ok(candidates) = list_candidates(context, path, &filename_pattern) else {
        return Ok(indicators.non_compliant(format!("Directory '{path}' does not exist or could not be listed")));
    };

    let file_count = candidates.len();
    let mut match_count = 0usize;
    let mut errors = 0usize;
    for file in &candidates {
        match scan_file(context, file, &match_pattern, state_pattern.as_ref()) {
            Ok(true) => match_count += 1,
            Ok(false) => {}
            Err(_) => errors += 1,
        }
    }

    let Some(verdict) = (match behavior.as_str() {
        "all_exist" => Some(match_count == file_count && errors == 0),
        "any_exist" => Some(!(match_count == 0 && errors > 0)),
        "at_least_one_exists" => Some(match_count >= 1),
        "none_exist" => Some(match_count == 0),
        "only_one_exists" => Some(match_count == 1),
        _ => None,
    }) else {
        return Ok(indicators.error(ErrorKind::Caller, format!("unsupported behavior '{behavior}'")));
    };

    if errors > 0 && !verdict {
        return Ok(indicators.error(
            ErrorKind::System,
            format!("{errors} file(s) under '{path}' could not be read ({match_count}/{file_count} matched)"),
        ));
    }

    if verdict {
        Ok(indicators.compliant(format!("{match_count}/{file_count} file(s) under '{path}' satisfy {behavior}")))
    } else {
        Ok(indicators.non_compliant(format!("{match_count}/{file_count} file(s) under '{path}' satisfy {behavior}")))
    }
}

#[cfg(test)]
mod tests {
    use super::file_regex_match_audit;
    use super::FILE_REGEX_MATCH_SCHEMA;
    use compliance_core::IndicatorsTree;
    use compliance_core::Status;
    use compliance_core::bind;
    use compliance_core::testing::MockContext;
    use std::collections::BTreeMap;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn all_exist_is_compliant_when_every_candidate_matches() {
        let raw = args(&[
            ("path", "/etc/cron.d"),
            ("filenamePattern", r"\.conf$"),
            ("matchPattern", r"^enabled=(\w+)"),
            ("behavior", "all_exist"),
        ]);
        let bound = bind(FILE_REGEX_MATCH_SCHEMA, &raw).expect("binds");
        let context = MockContext::new()
            .with_command("find '/etc/cron.d' -maxdepth 1 -type f", "/etc/cron.d/job.conf\n")
            .with_file("/etc/cron.d/job.conf", "enabled=yes\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("FileRegexMatch");
        let status = file_regex_match_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
    }

    #[test]
    fn none_exist_is_non_compliant_when_a_candidate_matches() {
        let raw = args(&[
            ("path", "/etc/cron.d"),
            ("filenamePattern", r"\.conf$"),
            ("matchPattern", r"^enabled=yes"),
            ("behavior", "none_exist"),
        ]);
        let bound = bind(FILE_REGEX_MATCH_SCHEMA, &raw).expect("binds");
        let context = MockContext::new()
            .with_command("find '/etc/cron.d' -maxdepth 1 -type f", "/etc/cron.d/job.conf\n")
            .with_file("/etc/cron.d/job.conf", "enabled=yes\n");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("FileRegexMatch");
        let status = file_regex_match_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }

    #[test]
    fn missing_directory_is_non_compliant() {
        let raw = args(&[
            ("path", "/does/not/exist"),
            ("filenamePattern", r".*"),
            ("matchPattern", r".*"),
            ("behavior", "any_exist"),
        ]);
        let bound = bind(FILE_REGEX_MATCH_SCHEMA, &raw).expect("binds");
        let context = MockContext::new().with_failing_command("find '/does/not/exist' -maxdepth 1 -type f", "no such directory");
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("FileRegexMatch");
        let status = file_regex_match_audit(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }
}
