// compliance-core/src/compile/document.rs
// ============================================================================
// Module: Procedure Document Compilation
// Description: JSON -> Node<Call> tree compilation, per spec.md §4.2.
// Purpose: Resolve combinators and builtin names once; defer argument
// binding to evaluation time.
// Dependencies: serde_json::Value, compliance_logic::Node, crate::registry::Registry
// ============================================================================

use std::collections::BTreeMap;

use compliance_logic::Node;
use serde_json::Value;

use crate::data::params::ParameterDictionary;
use crate::error::CompileError;
use crate::registry::BuiltinEntry;
use crate::registry::Registry;

// ============================================================================
// SECTION: Call
// ============================================================================

/// A compiled `Call` leaf: a resolved registry entry plus its raw, unbound arguments.
///
/// Argument binding is deferred to evaluation time so one compiled tree can
/// be re-evaluated under different parameter overlays (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct Call {
    /// The resolved registry entry for this builtin.
    pub entry: &'static BuiltinEntry,
    /// Raw, unsubstituted argument strings, keyed by argument name.
    pub args: BTreeMap<String, String>,
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.entry, other.entry) && self.args == other.args
    }
}

impl Eq for Call {}

// ============================================================================
// SECTION: Procedure Tree
// ============================================================================

/// The compiled form of one rule: an audit branch, an optional remediate
/// branch, and the rule's parameter dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureTree {
    /// The required audit branch.
    pub audit: Node<Call>,
    /// The optional remediate branch.
    pub remediate: Option<Node<Call>>,
    /// The rule's declared parameters, with defaults from the document.
    pub parameters: ParameterDictionary,
}

// ============================================================================
// SECTION: Compiler Entry Point
// ============================================================================

/// Compiles a decoded procedure document into a [`ProcedureTree`].
///
/// # Errors
///
/// Returns [`CompileError`] per spec.md §4.2: a missing `audit` key, a
/// non-object `audit`/`remediate`/`parameters` value, an unresolved builtin
/// name, or a malformed `parameters` entry.
pub fn compile(doc: &Value, registry: &dyn Registry) -> Result<ProcedureTree, CompileError> {
    let audit_value = doc.get("audit").ok_or(CompileError::MissingAudit)?;
    if !audit_value.is_object() {
        return Err(CompileError::NotObject { key: "audit".to_string() });
    }
    let audit = compile_node(audit_value, registry)?;

    let remediate = match doc.get("remediate") {
        None => None,
        Some(value) => {
            if !value.is_object() {
                return Err(CompileError::NotObject { key: "remediate".to_string() });
            }
            Some(compile_node(value, registry)?)
        }
    };

    let parameters = compile_parameters(doc.get("parameters"))?;

    Ok(ProcedureTree { audit, remediate, parameters })
}

/// Compiles one `<node>` per spec.md §4.2's grammar: a single-key object
/// naming either a combinator (`allOf`/`anyOf`/`not`) or a registered builtin.
fn compile_node(value: &Value, registry: &dyn Registry) -> Result<Node<Call>, CompileError> {
    let Value::Object(map) = value else {
        return Err(CompileError::MalformedNode);
    };
    let mut entries = map.iter();
    let (key, payload) = entries.next().ok_or(CompileError::MalformedNode)?;
    if entries.next().is_some() {
        return Err(CompileError::MalformedNode);
    }

    match key.as_str() {
        "allOf" => Ok(Node::all_of(compile_children(payload, registry)?)),
        "anyOf" => Ok(Node::any_of(compile_children(payload, registry)?)),
        "not" => Ok(Node::not(compile_node(payload, registry)?)),
        name => {
            let entry = registry
                .find(name)
                .ok_or_else(|| CompileError::UnknownFunction { name: name.to_string() })?;
            let args = compile_args(name, payload)?;
            Ok(Node::call(Call { entry, args }))
        }
    }
}

/// Compiles the array of children for `allOf`/`anyOf`.
fn compile_children(value: &Value, registry: &dyn Registry) -> Result<Vec<Node<Call>>, CompileError> {
    let Value::Array(items) = value else {
        return Err(CompileError::MalformedNode);
    };
    items.iter().map(|item| compile_node(item, registry)).collect()
}

/// Compiles a `Call` node's argument object into raw, unsubstituted strings.
fn compile_args(builtin: &str, value: &Value) -> Result<BTreeMap<String, String>, CompileError> {
    let Value::Object(map) = value else {
        return Err(CompileError::NotObject { key: builtin.to_string() });
    };
    let mut args = BTreeMap::new();
    for (key, arg_value) in map {
        let Value::String(text) = arg_value else {
            return Err(CompileError::ArgumentNotString {
                builtin: builtin.to_string(),
                key: key.clone(),
            });
        };
        args.insert(key.clone(), text.clone());
    }
    Ok(args)
}

/// Compiles the `"parameters": {"name": "default", ...}` object into a [`ParameterDictionary`].
fn compile_parameters(value: Option<&Value>) -> Result<ParameterDictionary, CompileError> {
    let mut dict = ParameterDictionary::new();
    let Some(value) = value else {
        return Ok(dict);
    };
    let Value::Object(map) = value else {
        return Err(CompileError::NotObject { key: "parameters".to_string() });
    };
    for (name, default_value) in map {
        let Value::String(default) = default_value else {
            return Err(CompileError::BadParameterEntry);
        };
        dict.declare(name.clone(), Some(default.clone()));
    }
    Ok(dict)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::compile;
    use crate::error::CompileError;
    use crate::registry::BuiltinEntry;
    use crate::registry::Registry;

    struct FixedRegistry(Vec<BuiltinEntry>);

    impl Registry for FixedRegistry {
        fn find(&self, name: &str) -> Option<&BuiltinEntry> {
            self.0.iter().find(|entry| entry.name == name)
        }
    }

    fn audit_success_registry() -> FixedRegistry {
        FixedRegistry(vec![BuiltinEntry {
            name: "AuditSuccess",
            schema: &[],
            audit: None,
            remediate: None,
        }])
    }

    #[test]
    fn missing_audit_is_an_error() {
        let registry = audit_success_registry();
        let err = compile(&json!({}), &registry).expect_err("missing audit must fail");
        assert_eq!(err, CompileError::MissingAudit);
    }

    #[test]
    fn empty_all_of_compiles() {
        let registry = audit_success_registry();
        let doc = json!({ "audit": { "allOf": [] } });
        let tree = compile(&doc, &registry).expect("trivial allOf compiles");
        assert!(tree.remediate.is_none());
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        let registry = audit_success_registry();
        let doc = json!({ "audit": { "FunctionThatDoesNotExist": {} } });
        let err = compile(&doc, &registry).expect_err("unknown builtin must fail");
        assert_eq!(
            err,
            CompileError::UnknownFunction { name: "FunctionThatDoesNotExist".to_string() }
        );
    }

    #[test]
    fn parameters_carry_defaults() {
        let registry = audit_success_registry();
        let doc = json!({
            "audit": { "AuditSuccess": {} },
            "parameters": { "mode": "0644" },
        });
        let tree = compile(&doc, &registry).expect("compiles");
        assert_eq!(tree.parameters.get("mode"), Some("0644"));
    }
}
