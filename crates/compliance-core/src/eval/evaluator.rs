// compliance-core/src/eval/evaluator.rs
// ============================================================================
// Module: Evaluator
// Description: Walks a compiled procedure tree for one action, binding
// arguments, dispatching builtins, and accumulating indicators.
// Purpose: Implement spec.md §4.5.
// Dependencies: compliance_logic::{Node, Status, fold_all_of, fold_any_of}
// ============================================================================

//! ## Overview
//! `compliance-logic`'s `Node::eval` folds a generic leaf type without
//! knowledge of an indicator tree; the evaluator here re-walks `Node<Call>`
//! directly so it can push an indicator on entry to *every* node (not just
//! calls) and pop on exit, per spec.md §4.6. The fold semantics themselves
//! are not reimplemented: [`compliance_logic::fold_all_of`] and
//! [`compliance_logic::fold_any_of`] are reused so the combinator algebra
//! stays defined in exactly one place.

use compliance_logic::EngineError;
use compliance_logic::EngineResult;
use compliance_logic::Node;
use compliance_logic::Status;
use compliance_logic::fold_all_of;
use compliance_logic::fold_any_of;

use crate::compile::Call;
use crate::compile::ProcedureTree;
use crate::data::context::Context;
use crate::data::params::ParameterDictionary;
use crate::registry::bind;

use super::indicators::IndicatorsTree;

// ============================================================================
// SECTION: Action
// ============================================================================

/// The branch an evaluation walks: `audit` or `remediate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Evaluate whether the system already satisfies the rule.
    Audit,
    /// Attempt to bring the system into compliance.
    Remediate,
}

impl Action {
    /// Returns the action's name, as used in `EngineError::MissingBranch`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audit => "audit",
            Self::Remediate => "remediate",
        }
    }
}

// ============================================================================
// SECTION: Evaluator Entry Point
// ============================================================================

/// Evaluates `tree`'s `action` branch against `context`, accumulating evidence into `indicators`.
///
/// # Errors
///
/// Returns [`EngineError::MissingBranch`] when the requested branch is
/// absent, and otherwise whatever evaluation-time error aborted the branch
/// (unresolved `$name` reference, binding failure, unknown builtin at a
/// late-bound call site).
pub fn evaluate(
    tree: &ProcedureTree,
    action: Action,
    params: &ParameterDictionary,
    context: &dyn Context,
    indicators: &mut IndicatorsTree,
) -> EngineResult<Status> {
    let branch = match action {
        Action::Audit => Some(&tree.audit),
        Action::Remediate => tree.remediate.as_ref(),
    };
    let Some(branch) = branch else {
        return Err(EngineError::MissingBranch { action: action.as_str().to_string() });
    };
    eval_node(branch, action, params, context, indicators)
}

/// Walks one node, pushing/popping an indicator around it and dispatching by variant.
fn eval_node(
    node: &Node<Call>,
    action: Action,
    params: &ParameterDictionary,
    context: &dyn Context,
    indicators: &mut IndicatorsTree,
) -> EngineResult<Status> {
    match node {
        Node::Call(call) => eval_call(call, action, params, context, indicators),
        Node::Not(child) => {
            indicators.push("not");
            let result = eval_node(child, action, params, context, indicators).map(Status::negate);
            if let Ok(status) = &result {
                indicators.set_status(status.clone());
            }
            indicators.pop();
            result
        }
        Node::AllOf(children) => {
            indicators.push("allOf");
            let result = eval_fold(children, action, params, context, indicators, true);
            if let Ok(status) = &result {
                indicators.set_status(status.clone());
            }
            indicators.pop();
            result
        }
        Node::AnyOf(children) => {
            indicators.push("anyOf");
            let result = eval_fold(children, action, params, context, indicators, false);
            if let Ok(status) = &result {
                indicators.set_status(status.clone());
            }
            indicators.pop();
            result
        }
    }
}

/// Evaluates `children` left to right, short-circuiting per `all_of`/`any_of` semantics.
fn eval_fold(
    children: &[Box<Node<Call>>],
    action: Action,
    params: &ParameterDictionary,
    context: &dyn Context,
    indicators: &mut IndicatorsTree,
    all_of: bool,
) -> EngineResult<Status> {
    let mut statuses = Vec::with_capacity(children.len());
    for child in children {
        let status = eval_node(child, action, params, context, indicators)?;
        let stop = if all_of { !status.is_compliant() } else { status.is_compliant() };
        statuses.push(status);
        if stop {
            break;
        }
    }
    Ok(if all_of { fold_all_of(statuses) } else { fold_any_of(statuses) })
}

/// Substitutes `$name` tokens, binds arguments, and invokes the resolved builtin function.
fn eval_call(
    call: &Call,
    action: Action,
    params: &ParameterDictionary,
    context: &dyn Context,
    indicators: &mut IndicatorsTree,
) -> EngineResult<Status> {
    indicators.push(call.entry.name);
    let outcome = (|| {
        let mut resolved = std::collections::BTreeMap::new();
        for (key, raw) in &call.args {
            resolved.insert(key.clone(), substitute(raw, params)?);
        }
        let bound = bind(call.entry.schema, &resolved)?;
        let function = match action {
            Action::Audit => call.entry.audit,
            Action::Remediate => call.entry.remediate,
        };
        let function = function.ok_or_else(|| {
            EngineError::Binding(format!("'{}' has no {} implementation", call.entry.name, action.as_str()))
        })?;
        function(&bound, context, indicators)
    })();
    if let Ok(status) = &outcome {
        indicators.set_status(status.clone());
    }
    indicators.pop();
    outcome
}

/// Replaces every `$name` token in `raw` with its resolved value from `params`.
fn substitute(raw: &str, params: &ParameterDictionary) -> EngineResult<String> {
    let mut output = String::with_capacity(raw.len());
    let mut chars = raw.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if ch != '$' {
            output.push(ch);
            continue;
        }
        let name_start = start + 1;
        let mut name_end = name_start;
        while let Some(&(idx, next_ch)) = chars.peek() {
            if next_ch.is_alphanumeric() || next_ch == '_' {
                name_end = idx + next_ch.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let name = &raw[name_start..name_end];
        if name.is_empty() {
            output.push('$');
            continue;
        }
        let value = params
            .get(name)
            .ok_or_else(|| EngineError::MissingParameter { name: name.to_string() })?;
        output.push_str(value);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::substitute;
    use crate::data::params::ParameterDictionary;

    #[test]
    fn substitute_replaces_known_token() {
        let mut dict = ParameterDictionary::new();
        dict.declare("mode", Some("0644".to_string()));
        assert_eq!(substitute("perm=$mode", &dict).expect("resolves"), "perm=0644");
    }

    #[test]
    fn substitute_fails_on_unresolved_token() {
        let dict = ParameterDictionary::new();
        let err = substitute("perm=$mode", &dict).expect_err("unresolved token must fail");
        assert_eq!(err.to_string(), "Missing required '$mode' parameter");
    }
}
