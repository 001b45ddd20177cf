// compliance-core/src/compile/mod.rs
// ============================================================================
// Module: Procedure Compiler
// Description: Walks a decoded JSON procedure document once, producing an
// immutable Procedure Tree with deferred argument binding.
// Purpose: Implement spec.md §4.2.
// Dependencies: serde_json, compliance_logic::Node, crate::registry
// ============================================================================

//! ## Overview
//! The compiler resolves combinator nodes and builtin names exactly once per
//! rule; the resulting [`ProcedureTree`] can be re-evaluated against many
//! different parameter overlays without recompiling, since `Call` nodes
//! retain only raw string arguments plus a pointer to the registry entry
//! (see spec.md §4.2 "Contracts").

mod document;

pub use document::Call;
pub use document::ProcedureTree;
pub use document::compile;
