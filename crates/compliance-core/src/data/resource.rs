// compliance-core/src/data/resource.rs
// ============================================================================
// Module: Resource
// Description: One policy record as read off the wire, before compilation.
// Purpose: Carry the rule name, benchmark section, and decoded procedure
// document through to the compiler; dropped once compiled.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A `Resource` is a short-lived value: the Resource Reader (`crate::io::mof`)
//! produces one per MOF block, and the Procedure Compiler consumes it
//! immediately to produce a `ProcedureTree`. Resources are never retained
//! once their rule's tree is compiled.

use serde_json::Value;

// ============================================================================
// SECTION: Resource
// ============================================================================

/// One policy record: a rule name, benchmark placement, and its procedure document.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// The rule's dispatch key, used as the suffix on every `MmiSet`/`MmiGet` object name.
    pub rule_name: String,
    /// The dotted benchmark section tag used by `--section` filtering.
    pub benchmark_section: String,
    /// The decoded `{"audit": ..., "remediate": ..., "parameters": ...}` document.
    pub procedure: Value,
    /// The decoded `"K=V\nK=V"` initial-audit payload, if `PayloadKey` was present.
    pub payload: Option<String>,
    /// Whether `PayloadKey` was present on the wire.
    pub has_init_audit: bool,
}
