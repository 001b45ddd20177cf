// compliance-logic/src/status.rs
// ============================================================================
// Module: Tri-State Compliance Status
// Description: The Compliant/NonCompliant/Error verdict and its fold rules.
// Purpose: Give AllOf/AnyOf/Not a single, deterministic algebra to combine
// child verdicts over, matching the OVAL-style short-circuit semantics.
// Dependencies: serde::{Deserialize, Serialize}
// ============================================================================

//! ## Overview
//! `Status` is the tri-state verdict every procedure node produces: the
//! system either satisfies the rule (`Compliant`), definitely does not
//! (`NonCompliant`), or the builtin that inspected it hit a condition it
//! cannot classify either way (`Error`). Unlike a generic tri-state "unknown"
//! value, `Error` always carries a message and a [`ErrorKind`] so evidence
//! never loses the reason a verdict could not be reached.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// Coarse classification for a [`Status::Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid arguments, unknown rule, parse failure — the caller's fault
    Caller,
    /// I/O, process spawn, or syscall failure — carries errno context in the message
    System,
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Tri-state compliance verdict
///
/// # Invariants
/// - `Error` is a first-class result distinct from `NonCompliant`: a stat
///   failure on an unexpected path is an error, an existing file with wrong
///   bits is `NonCompliant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Status {
    /// The system satisfies the rule
    Compliant,
    /// The system does not satisfy the rule
    NonCompliant,
    /// The verdict could not be determined
    Error {
        /// Coarse error classification
        kind: ErrorKind,
        /// Human-readable explanation
        message: String,
    },
}

impl Status {
    /// Builds an [`ErrorKind::System`] status from a message
    #[must_use]
    pub fn system_error(message: impl Into<String>) -> Self {
        Self::Error {
            kind: ErrorKind::System,
            message: message.into(),
        }
    }

    /// Builds an [`ErrorKind::Caller`] status from a message
    #[must_use]
    pub fn caller_error(message: impl Into<String>) -> Self {
        Self::Error {
            kind: ErrorKind::Caller,
            message: message.into(),
        }
    }

    /// Returns true if the value is `Compliant`
    #[must_use]
    pub const fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant)
    }

    /// Returns true if the value is `NonCompliant`
    #[must_use]
    pub const fn is_non_compliant(&self) -> bool {
        matches!(self, Self::NonCompliant)
    }

    /// Returns true if the value is `Error`
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Short label used by the compact-list and nested-list formatters
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::NonCompliant => "NonCompliant",
            Self::Error { .. } => "Error",
        }
    }

    /// Inverts `Compliant` and `NonCompliant`; `Error` passes through unchanged
    ///
    /// `Not(Not(x))` is therefore behaviourally equal to `x`.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Compliant => Self::NonCompliant,
            Self::NonCompliant => Self::Compliant,
            other @ Self::Error { .. } => other,
        }
    }

    /// True when this status should stop an `AllOf`/`AnyOf` fold early as a failure
    const fn is_fold_failure(&self) -> bool {
        !matches!(self, Self::Compliant)
    }
}

// ============================================================================
// SECTION: Fold Helpers
// ============================================================================

/// Folds child statuses with `AllOf` semantics: success iff every child is
/// `Compliant`, short-circuiting on the first `NonCompliant` or `Error`.
///
/// An empty iterator is trivially `Compliant`.
pub fn fold_all_of<I: IntoIterator<Item = Status>>(children: I) -> Status {
    let mut last = Status::Compliant;
    for child in children {
        let stop = child.is_fold_failure();
        last = child;
        if stop {
            return last;
        }
    }
    last
}

/// Folds child statuses with `AnyOf` semantics: success iff some child is
/// `Compliant`, short-circuiting on the first `Compliant`.
///
/// An empty iterator is trivially `NonCompliant`. When no child is
/// `Compliant`, the last `Error` observed (if any) is returned in preference
/// to `NonCompliant`, so an `AnyOf` does not silently swallow a system error.
pub fn fold_any_of<I: IntoIterator<Item = Status>>(children: I) -> Status {
    let mut last_error: Option<Status> = None;
    let mut saw_any = false;
    for child in children {
        saw_any = true;
        if child.is_compliant() {
            return child;
        }
        if child.is_error() {
            last_error = Some(child);
        }
    }
    if !saw_any {
        return Status::NonCompliant;
    }
    last_error.unwrap_or(Status::NonCompliant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_of_empty_is_compliant() {
        assert_eq!(fold_all_of(Vec::new()), Status::Compliant);
    }

    #[test]
    fn any_of_empty_is_non_compliant() {
        assert_eq!(fold_any_of(Vec::new()), Status::NonCompliant);
    }

    #[test]
    fn all_of_short_circuits_on_first_failure() {
        let children = vec![Status::Compliant, Status::NonCompliant, Status::Compliant];
        assert_eq!(fold_all_of(children), Status::NonCompliant);
    }

    #[test]
    fn any_of_short_circuits_on_first_success() {
        let children = vec![Status::NonCompliant, Status::Compliant, Status::NonCompliant];
        assert_eq!(fold_any_of(children), Status::Compliant);
    }

    #[test]
    fn any_of_prefers_error_over_non_compliant_when_nothing_compliant() {
        let children = vec![Status::NonCompliant, Status::system_error("boom")];
        assert_eq!(fold_any_of(children), Status::system_error("boom"));
    }

    #[test]
    fn not_not_is_identity() {
        for status in [
            Status::Compliant,
            Status::NonCompliant,
            Status::system_error("x"),
        ] {
            assert_eq!(status.clone().negate().negate(), status);
        }
    }

    #[test]
    fn error_passes_through_negate() {
        let err = Status::caller_error("bad");
        assert_eq!(err.clone().negate(), err);
    }
}
