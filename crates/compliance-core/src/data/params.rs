// compliance-core/src/data/params.rs
// ============================================================================
// Module: Parameter Dictionary
// Description: The rule-scoped map of user-overridable parameters.
// Purpose: Hold declared defaults from the procedure document and apply
// "K=V" overlay payloads atomically, matching spec.md §3.
// Dependencies: std::collections::BTreeMap
// ============================================================================

//! ## Overview
//! A [`ParameterDictionary`] is built once at compile time from a procedure
//! document's `"parameters"` object (name -> default string) and is
//! thereafter read-only during evaluation except for the atomic overlay
//! applied by `init`/`remediate`. The wire format in spec.md §4.2 only
//! carries defaults; `validation_regex` and `mandatory` exist on
//! [`ParameterEntry`] for data-model parity with spec.md §3 and are left
//! unset by the compiler today, with room for a future wire extension to
//! populate them.

use std::collections::BTreeMap;

use crate::error::UnknownParameterError;

// ============================================================================
// SECTION: Parameter Entry
// ============================================================================

/// One declared parameter: a default, an optional validation pattern, and a
/// mandatory flag, overlaid at most once by a user-supplied value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterEntry {
    /// The default value from the procedure document, if any.
    pub default: Option<String>,
    /// An optional ECMAScript-style validation pattern for overlay values.
    pub validation_regex: Option<String>,
    /// Whether a value (default or overlay) is required for the parameter to resolve.
    pub mandatory: bool,
    /// The user-supplied overlay value, if `init`/`remediate` has set one.
    pub overlay: Option<String>,
}

impl ParameterEntry {
    /// Returns the entry's resolved value: the overlay if set, else the default.
    #[must_use]
    pub fn resolved(&self) -> Option<&str> {
        self.overlay.as_deref().or(self.default.as_deref())
    }
}

// ============================================================================
// SECTION: Parameter Dictionary
// ============================================================================

/// A rule-scoped map of user-overridable parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterDictionary {
    /// Declared parameters, keyed by name.
    entries: BTreeMap<String, ParameterEntry>,
}

impl ParameterDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a parameter with the given default, if the document supplied one.
    pub fn declare(&mut self, name: impl Into<String>, default: Option<String>) {
        self.entries.insert(
            name.into(),
            ParameterEntry {
                default,
                validation_regex: None,
                mandatory: false,
                overlay: None,
            },
        );
    }

    /// Returns the resolved value for `name`, if declared and resolvable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(ParameterEntry::resolved)
    }

    /// Returns whether `name` is declared on this dictionary.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Applies a whitespace-separated `"K=V K=V"` overlay payload atomically.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownParameterError`] for the first token whose key is not
    /// declared on this dictionary; no tokens are applied when any fail,
    /// preserving the "mutated once, atomically" lifecycle from spec.md §3.
    pub fn apply_overlay(&mut self, payload: &str) -> Result<(), UnknownParameterError> {
        let mut staged = Vec::new();
        for token in payload.split_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            if !self.entries.contains_key(key) {
                return Err(UnknownParameterError { key: key.to_string() });
            }
            staged.push((key.to_string(), value.to_string()));
        }
        for (key, value) in staged {
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.overlay = Some(value);
            }
        }
        Ok(())
    }

    /// Returns an iterator over declared names and their resolved values, for debug dumps.
    pub fn iter_resolved(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry.resolved()))
    }
}

#[cfg(test)]
mod tests {
    use super::ParameterDictionary;

    #[test]
    fn overlay_sets_declared_key() {
        let mut dict = ParameterDictionary::new();
        dict.declare("mode", Some("0644".to_string()));
        dict.apply_overlay("mode=0600").expect("known key overlays");
        assert_eq!(dict.get("mode"), Some("0600"));
    }

    #[test]
    fn overlay_rejects_unknown_key() {
        let mut dict = ParameterDictionary::new();
        dict.declare("mode", Some("0644".to_string()));
        let err = dict.apply_overlay("bogus=1").expect_err("unknown key must fail");
        assert_eq!(err.key, "bogus");
        assert_eq!(dict.get("mode"), Some("0644"), "rejected overlay must not mutate other keys");
    }

    #[test]
    fn default_resolves_without_overlay() {
        let mut dict = ParameterDictionary::new();
        dict.declare("owner", Some("root".to_string()));
        assert_eq!(dict.get("owner"), Some("root"));
    }
}
