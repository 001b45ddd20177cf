// compliance-core/src/lib.rs
// ============================================================================
// Crate: compliance-core
// Description: The compliance domain: resources, parameters, the procedure
// compiler, the evaluator, the indicators tree, the formatters, the MOF
// resource reader, and the four-verb engine.
// Purpose: Implement spec.md §§3-4, 6.2-6.4, 7 on top of compliance-logic's
// generic Node<C>/Status algebra.
// Dependencies: compliance-logic
// ============================================================================

//! ## Overview
//! `compliance-core` is the domain layer: it knows about resources, rules,
//! builtins, and the live system, but not about any particular builtin's
//! implementation (those live in `compliance-builtins`) or the CLI shell
//! (that lives in `compliance-cli`). The pipeline it implements:
//!
//! 1. [`io::ResourceReader`] parses MOF-style blocks into [`data::Resource`]
//!    values.
//! 2. [`compile::compile`] turns a resource's decoded procedure document into
//!    a [`compile::ProcedureTree`], resolving builtin names against a
//!    [`registry::Registry`].
//! 3. [`engine::Engine`] owns one tree per rule and dispatches the four MMI
//!    verbs (`procedure`/`init`/`remediate`/`audit`).
//! 4. [`eval::evaluate`] walks a tree for one action, binding arguments via
//!    [`registry::bind`] and accumulating an [`eval::IndicatorsTree`].
//! 5. The formatters in [`eval::formatters`] render a rule's status and
//!    indicators as JSON, compact list, nested list, or debug text.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "unit tests assert via expect/unwrap on deterministic fixtures"
    )
)]

pub mod compile;
pub mod data;
pub mod engine;
pub mod error;
pub mod eval;
pub mod io;
pub mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use compliance_logic::ErrorKind;
pub use compliance_logic::Status;

pub use compile::Call;
pub use compile::ProcedureTree;
pub use compile::compile;

pub use data::Context;
pub use data::ParameterDictionary;
pub use data::ParameterEntry;
pub use data::Resource;
pub use data::SpecialPath;
pub use data::SystemContext;

pub use engine::Engine;
pub use engine::MmiSetOutcome;

pub use error::CompileError;
pub use error::EngineVerbError;
pub use error::ResourceError;
pub use error::UnknownParameterError;

pub use eval::Action;
pub use eval::CompactListFormatter;
pub use eval::DebugFormatter;
pub use eval::FormatEntry;
pub use eval::FormatError;
pub use eval::Indicator;
pub use eval::IndicatorsTree;
pub use eval::JsonFormatter;
pub use eval::NestedListFormatter;
pub use eval::ResultFormatter;
pub use eval::evaluate;

pub use io::ResourceReader;

pub use registry::BoundArgs;
pub use registry::BoundValue;
pub use registry::BuiltinEntry;
pub use registry::BuiltinFn;
pub use registry::ParamField;
pub use registry::ParamType;
pub use registry::Registry;
pub use registry::bind;
