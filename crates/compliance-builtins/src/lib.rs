// compliance-builtins/src/lib.rs
// ============================================================================
// Crate: compliance-builtins
// Description: The concrete builtin procedures (audit/remediate function
// pointers) compliance-core's evaluator dispatches into, plus the static
// registry table wiring them together.
// Purpose: Implement spec.md §4.4's builtin families.
// Dependencies: compliance-core, compliance-logic, regex
// ============================================================================

//! ## Overview
//! Every module here owns one family from spec.md §4.4: a handful of typed
//! schema constants and a matching set of `audit`/`remediate` function
//! pointers with the [`compliance_core::BuiltinFn`] signature. None of them
//! touch the live system directly; every system interaction goes through
//! the [`compliance_core::Context`] trait object the evaluator hands in,
//! per Design Note "Command runner as a seam". [`registry::BUILTINS`] is the
//! `&'static [BuiltinEntry]` table [`compliance_core::Engine`] is built
//! against.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "unit tests assert via expect/unwrap on deterministic fixtures"
    )
)]

pub mod content;
pub mod daemon;
pub mod file_permissions;
pub mod meta;
pub mod other;
pub mod package;
pub mod registry;
pub mod rpm_version;
pub mod user_group;

pub use registry::BUILTINS;
