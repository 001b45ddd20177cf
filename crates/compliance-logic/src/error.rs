// compliance-logic/src/error.rs
// ============================================================================
// Module: Evaluation Error Definitions
// Description: Structured diagnostics for procedure-tree evaluation.
// Purpose: Provide the error channel that short-circuits a branch before any
// Status can be produced (unknown builtin, bad binding, unresolved parameter).
// Dependencies: std::fmt
// ============================================================================

//! ## Overview
//! `EngineError` is the channel for evaluation-time failures that happen
//! *before* a builtin produces a verdict: an unresolved `$name` reference, a
//! parameter that fails to bind against a builtin's schema, or (only via a
//! stale compiled tree) a builtin name with no registry entry. These are
//! distinct from [`crate::Status::Error`], which is a builtin's own verdict
//! after it ran and observed something wrong with the system under test.

use std::fmt;

/// Errors that can occur while evaluating a procedure tree
///
/// # Invariants
/// - None. Variants capture structured evaluation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No branch of the requested action exists on this tree (`"no audit branch"` etc.)
    MissingBranch {
        /// The action that was requested (`audit` or `remediate`)
        action: String,
    },

    /// A `Call` node referenced a builtin with no matching registry entry
    UnknownFunction {
        /// The unresolved builtin name
        name: String,
    },

    /// A `$name` token in an argument string had no corresponding parameter value
    MissingParameter {
        /// The unresolved parameter name
        name: String,
    },

    /// Parameter binding against a builtin's declared schema failed
    Binding(String),

    /// A user-supplied parameter overlay referenced a key the rule does not declare
    UnknownUserParameter {
        /// The offending key
        key: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBranch { action } => write!(f, "no {action} branch"),
            Self::UnknownFunction { name } => write!(f, "Unknown function {name}"),
            Self::MissingParameter { name } => {
                write!(f, "Missing required '${name}' parameter")
            }
            Self::Binding(message) => write!(f, "{message}"),
            Self::UnknownUserParameter { key } => {
                write!(f, "user parameter '{key}' not found")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Convenient result alias for procedure tree evaluation
pub type EngineResult<T> = Result<T, EngineError>;
