// compliance-builtins/src/meta.rs
// ============================================================================
// Family: Testing / Meta
// Description: Unconditional leaf verdicts and a parameter-echo builtin used
// to verify the compiler/binder/evaluator plumbing without touching the
// live system.
// Purpose: Implement spec.md §4.4.6.
// Dependencies: compliance_core::{BoundArgs, Context, IndicatorsTree}
// ============================================================================

use compliance_core::BoundArgs;
use compliance_core::Context;
use compliance_core::IndicatorsTree;
use compliance_core::ParamField;
use compliance_core::ParamType;
use compliance_core::Status;
use compliance_logic::EngineResult;

/// `AuditSuccess` / `RemediationSuccess` schema: no parameters.
pub const EMPTY_SCHEMA: &[ParamField] = &[];

/// `AuditGetParamValues` schema: three fixed, optional string slots.
pub const AUDIT_GET_PARAM_VALUES_SCHEMA: &[ParamField] = &[
    ParamField { name: "KEY1", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "KEY2", ty: ParamType::Optional(&ParamType::String), required: false },
    ParamField { name: "KEY3", ty: ParamType::Optional(&ParamType::String), required: false },
];

/// Always returns `Compliant`, for harness verification.
pub fn audit_success(_args: &BoundArgs, _context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    Ok(indicators.compliant("harness success"))
}

/// Always returns `NonCompliant`, for harness verification.
pub fn audit_failure(_args: &BoundArgs, _context: &dyn Context, indicators: &mut IndicatorsTree) -> EngineResult<Status> {
    Ok(indicators.non_compliant("harness failure"))
}

/// Always returns `Compliant`, for harness verification of the remediate path.
pub fn remediation_success(
    _args: &BoundArgs,
    _context: &dyn Context,
    indicators: &mut IndicatorsTree,
) -> EngineResult<Status> {
    Ok(indicators.compliant("harness remediation success"))
}

/// Always returns `NonCompliant`, for harness verification of the remediate path.
pub fn remediation_failure(
    _args: &BoundArgs,
    _context: &dyn Context,
    indicators: &mut IndicatorsTree,
) -> EngineResult<Status> {
    Ok(indicators.non_compliant("harness remediation failure"))
}

/// Echoes the bound `KEY1`/`KEY2`/`KEY3` values into the indicator tree, verifying binding.
pub fn audit_get_param_values(
    args: &BoundArgs,
    _context: &dyn Context,
    indicators: &mut IndicatorsTree,
) -> EngineResult<Status> {
    for key in ["KEY1", "KEY2", "KEY3"] {
        let value = args.string_opt(key)?.unwrap_or("<absent>");
        indicators.back().evidence.push(format!("{key}={value}"));
    }
    Ok(indicators.compliant("parameters echoed"))
}

#[cfg(test)]
mod tests {
    use super::audit_failure;
    use super::audit_get_param_values;
    use super::audit_success;
    use super::AUDIT_GET_PARAM_VALUES_SCHEMA;
    use super::EMPTY_SCHEMA;
    use compliance_core::IndicatorsTree;
    use compliance_core::Status;
    use compliance_core::bind;
    use compliance_core::testing::MockContext;
    use std::collections::BTreeMap;

    #[test]
    fn audit_success_is_always_compliant() {
        let bound = bind(EMPTY_SCHEMA, &BTreeMap::new()).expect("binds");
        let context = MockContext::new();
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("AuditSuccess");
        let status = audit_success(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
    }

    #[test]
    fn audit_failure_is_always_non_compliant() {
        let bound = bind(EMPTY_SCHEMA, &BTreeMap::new()).expect("binds");
        let context = MockContext::new();
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("AuditFailure");
        let status = audit_failure(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::NonCompliant);
    }

    #[test]
    fn param_values_echoes_bound_and_absent_keys() {
        let raw: BTreeMap<String, String> = [("KEY1".to_string(), "hello".to_string())].into_iter().collect();
        let bound = bind(AUDIT_GET_PARAM_VALUES_SCHEMA, &raw).expect("binds");
        let context = MockContext::new();
        let mut indicators = IndicatorsTree::new("X");
        indicators.push("AuditGetParamValues");
        let status = audit_get_param_values(&bound, &context, &mut indicators).expect("audits");
        assert_eq!(status, Status::Compliant);
        let evidence = &indicators.back().evidence;
        assert!(evidence.iter().any(|line| line == "KEY1=hello"));
        assert!(evidence.iter().any(|line| line == "KEY2=<absent>"));
    }
}
