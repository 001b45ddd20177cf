// compliance-core/src/engine.rs
// ============================================================================
// Module: Engine
// Description: The four-verb MMI-compatible dispatch surface over a per-rule
// slot map.
// Purpose: Implement spec.md §4.7/§6.3.
// Dependencies: crate::{compile, data, eval, error, registry}
// ============================================================================

//! ## Overview
//! `Engine` owns one `ProcedureTree` per rule, keyed by rule name. The four
//! verbs are dispatched by splitting the MMI-style object name
//! (`"procedure" + rule`, `"init" + rule`, `"remediate" + rule`,
//! `"audit" + rule`) into a prefix and a rule suffix. `procedure` is the only
//! verb that may create a slot; `init`/`remediate` against an unknown rule
//! are out-of-order operations, while `audit` against an unknown rule is
//! reported as `Rule not found` — the wire contract (spec.md §6.3) uses
//! distinct wording for the write path versus the read path even though both
//! stem from the same missing-slot condition.

use std::collections::BTreeMap;

use compliance_logic::Status;

use crate::compile::ProcedureTree;
use crate::compile::compile;
use crate::data::context::Context;
use crate::data::params::ParameterDictionary;
use crate::error::EngineVerbError;
use crate::eval::Action;
use crate::eval::Indicator;
use crate::eval::IndicatorsTree;
use crate::eval::evaluate;
use crate::registry::Registry;

/// MMI object-name prefixes recognized by the engine, checked in this order.
const VERB_PREFIXES: [&str; 4] = ["procedure", "init", "remediate", "audit"];

// ============================================================================
// SECTION: MmiSet Outcome
// ============================================================================

/// What a successful `MmiSet` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum MmiSetOutcome {
    /// `"procedure" + rule` compiled and (over)wrote the rule's slot.
    ProcedureStored,
    /// `"init" + rule` overlaid the parameter dictionary; no evaluation ran.
    ParamsOverlaid,
    /// `"remediate" + rule` overlaid parameters and evaluated the remediate branch,
    /// carrying the root indicator accumulated while doing so.
    Remediated(Status, Indicator),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Owns one compiled [`ProcedureTree`] per rule and dispatches the four MMI verbs.
pub struct Engine<'r> {
    /// The builtin registry used to compile newly-set procedures.
    registry: &'r dyn Registry,
    /// One compiled tree per rule, keyed by rule name.
    rules: BTreeMap<String, ProcedureTree>,
    /// Whether `remediate` is permitted to run at all.
    remediation_enabled: bool,
}

impl<'r> Engine<'r> {
    /// Creates an engine with no rules set, backed by `registry`.
    #[must_use]
    pub fn new(registry: &'r dyn Registry, remediation_enabled: bool) -> Self {
        Self { registry, rules: BTreeMap::new(), remediation_enabled }
    }

    /// Dispatches an `MmiSet` call against `object` with raw JSON or `K=V` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineVerbError`] per spec.md §6.3.
    pub fn mmi_set(
        &mut self,
        object: &str,
        payload: &[u8],
        context: &dyn Context,
    ) -> Result<MmiSetOutcome, EngineVerbError> {
        let (verb, rule) = split_object(object)?;
        match verb {
            "procedure" => self.set_procedure(rule, payload),
            "init" => self.overlay_params(rule, payload).map(|()| MmiSetOutcome::ParamsOverlaid),
            "remediate" => self.remediate(rule, payload, context),
            _ => Err(EngineVerbError::InvalidObjectName),
        }
    }

    /// Dispatches an `MmiGet` call against `object`, returning the aggregate status
    /// and the root indicator accumulated while evaluating it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineVerbError`] per spec.md §6.3.
    pub fn mmi_get(
        &self,
        object: &str,
        context: &dyn Context,
    ) -> Result<(Status, Indicator), EngineVerbError> {
        let (verb, rule) = split_object(object)?;
        if verb != "audit" {
            return Err(EngineVerbError::InvalidObjectName);
        }
        let tree = self.rules.get(rule).ok_or(EngineVerbError::RuleNotFound)?;
        let mut indicators = IndicatorsTree::new(rule);
        let status = evaluate(tree, Action::Audit, &tree.parameters, context, &mut indicators)?;
        Ok((status, indicators.into_root()))
    }

    /// Compiles `payload` and (over)writes `rule`'s slot.
    fn set_procedure(&mut self, rule: &str, payload: &[u8]) -> Result<MmiSetOutcome, EngineVerbError> {
        let doc: serde_json::Value =
            serde_json::from_slice(payload).map_err(|_| EngineVerbError::JsonParse)?;
        let tree = compile(&doc, self.registry)?;
        self.rules.insert(rule.to_string(), tree);
        Ok(MmiSetOutcome::ProcedureStored)
    }

    /// Applies a `"K=V\nK=V"` overlay onto `rule`'s parameter dictionary.
    fn overlay_params(&mut self, rule: &str, payload: &[u8]) -> Result<(), EngineVerbError> {
        let tree = self.rules.get_mut(rule).ok_or(EngineVerbError::OutOfOrder)?;
        let text = std::str::from_utf8(payload).map_err(|_| EngineVerbError::JsonParse)?;
        tree.parameters.apply_overlay(text)?;
        Ok(())
    }

    /// Overlays `rule`'s parameters, then evaluates its remediate branch.
    fn remediate(
        &mut self,
        rule: &str,
        payload: &[u8],
        context: &dyn Context,
    ) -> Result<MmiSetOutcome, EngineVerbError> {
        if !self.rules.contains_key(rule) {
            return Err(EngineVerbError::OutOfOrder);
        }
        if !self.remediation_enabled {
            return Err(EngineVerbError::RemediationDisabled);
        }
        self.overlay_params(rule, payload)?;
        let tree = self.rules.get(rule).ok_or(EngineVerbError::OutOfOrder)?;
        let mut indicators = IndicatorsTree::new(rule);
        let status = evaluate(tree, Action::Remediate, &tree.parameters, context, &mut indicators)?;
        Ok(MmiSetOutcome::Remediated(status, indicators.into_root()))
    }

    /// Returns the rule's declared parameter dictionary, for debug-output rendering.
    #[must_use]
    pub fn parameters(&self, rule: &str) -> Option<&ParameterDictionary> {
        self.rules.get(rule).map(|tree| &tree.parameters)
    }
}

/// Splits an MMI object name into its verb prefix and rule suffix.
fn split_object(object: &str) -> Result<(&str, &str), EngineVerbError> {
    if object.is_empty() {
        return Err(EngineVerbError::InvalidObjectName);
    }
    for prefix in VERB_PREFIXES {
        if let Some(rule) = object.strip_prefix(prefix) {
            if rule.is_empty() {
                return Err(EngineVerbError::EmptyRuleName);
            }
            return Ok((prefix, rule));
        }
    }
    Err(EngineVerbError::InvalidObjectName)
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use super::MmiSetOutcome;
    use crate::registry::BuiltinEntry;
    use crate::registry::Registry;
    use crate::testing::MockContext;
    use compliance_logic::Status;

    struct EmptyRegistry;
    impl Registry for EmptyRegistry {
        fn find(&self, _name: &str) -> Option<&BuiltinEntry> {
            None
        }
    }

    #[test]
    fn procedure_then_audit_empty_all_of_is_compliant() {
        let registry = EmptyRegistry;
        let mut engine = Engine::new(&registry, true);
        let context = MockContext::new();
        engine
            .mmi_set("procedureX", br#"{"audit":{"allOf":[]}}"#, &context)
            .expect("procedure stores");
        let (status, indicator) = engine.mmi_get("auditX", &context).expect("audit runs");
        assert_eq!(status, Status::Compliant);
        assert_eq!(indicator.label, "X");
    }

    #[test]
    fn init_before_procedure_is_out_of_order() {
        let registry = EmptyRegistry;
        let mut engine = Engine::new(&registry, true);
        let context = MockContext::new();
        let err = engine.mmi_set("initX", b"K=1", &context).expect_err("out of order");
        assert_eq!(err.to_string(), "Out-of-order operation: procedure must be set first");
    }

    #[test]
    fn audit_unknown_rule_is_rule_not_found() {
        let registry = EmptyRegistry;
        let engine = Engine::new(&registry, true);
        let context = MockContext::new();
        let err = engine.mmi_get("auditX", &context).expect_err("unknown rule");
        assert_eq!(err.to_string(), "Rule not found");
    }

    #[test]
    fn empty_object_name_is_invalid() {
        let registry = EmptyRegistry;
        let mut engine = Engine::new(&registry, true);
        let context = MockContext::new();
        let err = engine.mmi_set("", b"{}", &context).expect_err("empty object");
        assert_eq!(err.to_string(), "Invalid object name");
    }

    #[test]
    fn remediate_disabled_by_configuration() {
        let registry = EmptyRegistry;
        let mut engine = Engine::new(&registry, false);
        let context = MockContext::new();
        engine
            .mmi_set("procedureX", br#"{"audit":{"allOf":[]},"remediate":{"allOf":[]}}"#, &context)
            .expect("procedure stores");
        let err = engine
            .mmi_set("remediateX", b"", &context)
            .expect_err("remediation disabled");
        assert_eq!(err.to_string(), "Remediation is disabled by configuration");
    }

    #[test]
    fn remediate_runs_when_enabled() {
        let registry = EmptyRegistry;
        let mut engine = Engine::new(&registry, true);
        let context = MockContext::new();
        engine
            .mmi_set("procedureX", br#"{"audit":{"allOf":[]},"remediate":{"allOf":[]}}"#, &context)
            .expect("procedure stores");
        let outcome = engine.mmi_set("remediateX", b"", &context).expect("remediates");
        assert!(matches!(&outcome, MmiSetOutcome::Remediated(Status::Compliant, _)));
        if let MmiSetOutcome::Remediated(_, indicator) = outcome {
            assert_eq!(indicator.label, "X");
        }
    }

    #[test]
    fn parameters_returns_none_for_unknown_rule() {
        let registry = EmptyRegistry;
        let engine = Engine::new(&registry, true);
        assert!(engine.parameters("X").is_none());
    }
}
