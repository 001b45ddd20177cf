// compliance-core/src/error.rs
// ============================================================================
// Module: Compliance Core Error Taxonomy
// Description: Boundary error enums for resource reading, compilation, and
// the four-verb engine dispatch.
// Purpose: Give each pipeline stage a `thiserror`-derived error type whose
// `Display` renders the literal wire diagnostics the engine contract expects.
// Dependencies: thiserror, compliance_logic::EngineError
// ============================================================================

//! ## Overview
//! Three boundary error types cover the pipeline: [`ResourceError`] (MOF
//! parsing), [`CompileError`] (procedure-document compilation), and
//! [`EngineVerbError`] (the four-verb dispatch surface). A fourth, tiny
//! [`UnknownParameterError`] backs parameter-dictionary overlay application
//! and is re-expressed with a capitalized message at the `EngineVerbError`
//! boundary, since spec wording differs between the internal data-model
//! description and the wire contract table.

use thiserror::Error;

// ============================================================================
// SECTION: Resource Reader Errors
// ============================================================================

/// Errors raised while reading MOF-style resource blocks.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A block opened with `instance of OsConfigResource as` never closed with `};`.
    #[error("unterminated resource block starting at line {line}")]
    UnterminatedBlock {
        /// 1-based line number where the block opened.
        line: usize,
    },

    /// A block closed without ever setting `ProcedureObjectValue`.
    #[error("resource block ending at line {line} is missing a procedure")]
    MissingProcedure {
        /// 1-based line number of the block's closing `};`.
        line: usize,
    },

    /// `ProcedureObjectValue` or `PayloadKey` failed to base64-decode.
    #[error("invalid base64 payload for '{key}' at line {line}: {source}")]
    InvalidBase64 {
        /// The MOF key whose value failed to decode.
        key: String,
        /// 1-based line number of the offending `key = value;` line.
        line: usize,
        /// Underlying decode failure.
        #[source]
        source: base64::DecodeError,
    },

    /// The base64-decoded `ProcedureObjectValue` was not valid JSON.
    #[error("invalid JSON procedure payload at line {line}: {source}")]
    InvalidJson {
        /// 1-based line number of the `ProcedureObjectValue` line.
        line: usize,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// SECTION: Procedure Compiler Errors
// ============================================================================

/// Errors raised while compiling a procedure document into a [`crate::compile::ProcedureTree`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The document has no `audit` key.
    #[error("Missing 'audit' object")]
    MissingAudit,

    /// `audit`, `remediate`, or `parameters` was present but not a JSON object.
    #[error("The '{key}' value is not an object")]
    NotObject {
        /// The offending top-level key.
        key: String,
    },

    /// A `Call` node referenced a name with no registry entry.
    #[error("Unknown function {name}")]
    UnknownFunction {
        /// The unresolved builtin name.
        name: String,
    },

    /// A `parameters` entry was not a string default value.
    #[error("Failed to get parameter name and value")]
    BadParameterEntry,

    /// A `Call` node's argument value was not a JSON string.
    #[error("argument '{key}' for '{builtin}' must be a string")]
    ArgumentNotString {
        /// The builtin whose argument failed to parse.
        builtin: String,
        /// The offending argument key.
        key: String,
    },

    /// A node was not the required single-key object shape.
    #[error("procedure node must be a single-key object")]
    MalformedNode,
}

// ============================================================================
// SECTION: Parameter Dictionary Errors
// ============================================================================

/// A user-supplied overlay referenced a parameter the rule does not declare.
///
/// Mirrors spec.md §3's lowercase wording; [`EngineVerbError`] re-renders
/// this at the wire boundary with the capitalized wording from §6.3.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("user parameter '{key}' not found")]
pub struct UnknownParameterError {
    /// The offending overlay key.
    pub key: String,
}

// ============================================================================
// SECTION: Engine Verb Errors
// ============================================================================

/// Errors raised by the four-verb `MmiSet`/`MmiGet` dispatch surface.
///
/// `Display` renders the literal diagnostics from spec.md §6.3 so any caller
/// (the CLI or a future MPI facade) gets the verbatim wire contract.
#[derive(Debug, Error)]
pub enum EngineVerbError {
    /// The object name was empty or matched no known verb prefix.
    #[error("Invalid object name")]
    InvalidObjectName,

    /// A known verb prefix was followed by an empty rule name.
    #[error("Rule name is empty")]
    EmptyRuleName,

    /// `init`/`remediate` was dispatched before `procedure` populated the slot.
    #[error("Out-of-order operation: procedure must be set first")]
    OutOfOrder,

    /// `audit` was dispatched against a rule with no stored procedure.
    #[error("Rule not found")]
    RuleNotFound,

    /// The raw payload bytes for `procedure`/`init`/`remediate` were not valid JSON
    /// (`procedure`) or not valid UTF-8 (`init`/`remediate`).
    #[error("Failed to parse JSON")]
    JsonParse,

    /// Remediation was requested while `compliance-config` disabled it.
    #[error("Remediation is disabled by configuration")]
    RemediationDisabled,

    /// Procedure-document compilation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A user parameter overlay referenced an undeclared key.
    #[error("User parameter '{key}' not found")]
    UnknownUserParameter {
        /// The offending overlay key.
        key: String,
    },

    /// Procedure-tree evaluation failed before any builtin could produce a verdict.
    #[error(transparent)]
    Eval(#[from] compliance_logic::EngineError),
}

impl From<UnknownParameterError> for EngineVerbError {
    fn from(value: UnknownParameterError) -> Self {
        Self::UnknownUserParameter { key: value.key }
    }
}
