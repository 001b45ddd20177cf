// compliance-core/src/registry.rs
// ============================================================================
// Module: Builtin Registry Contract
// Description: The static table shape builtin procedures are registered
// under, the typed parameter schema, and the generic argument binder.
// Purpose: Let compliance-builtins declare ~45 builtins against a shared
// contract without compliance-core depending back on that crate.
// Dependencies: compliance_logic::{EngineError, EngineResult, Status}
// ============================================================================

//! ## Overview
//! `compliance-builtins` depends on `compliance-core`, never the reverse, so
//! the registry *shape* — what a builtin entry looks like, how its
//! parameters are typed, and how raw string arguments bind against that
//! typing — lives here. The concrete `'static [BuiltinEntry]` table is
//! assembled by `compliance-builtins` and handed to [`crate::engine::Engine`]
//! as a trait object. Design Note "Global registry of function pointers" is
//! realized as a linear scan over a small `'static` slice rather than a
//! binary search: the table is short enough (~45 entries) that a manual sort
//! order cannot be verified without running the test suite, and correctness
//! of lookup matters more than the microbenchmark a binary search would win.

use std::collections::BTreeMap;
use std::fmt;

use compliance_logic::EngineError;
use compliance_logic::EngineResult;
use compliance_logic::Status;

use crate::data::context::Context;
use crate::eval::indicators::IndicatorsTree;

// ============================================================================
// SECTION: Parameter Schema
// ============================================================================

/// The typed vocabulary a builtin's declared parameter can take.
///
/// Mirrors spec.md §4.3's type vocabulary. `Separated` and `Optional` wrap
/// another `'static ParamType` rather than owning a boxed value, so the
/// whole schema can be built as a `const`/`static` table.
#[derive(Debug, Clone, Copy)]
pub enum ParamType {
    /// A UTF-8 string, taken verbatim.
    String,
    /// A signed 64-bit integer.
    Int,
    /// `true` or `false`, case-sensitive.
    Bool,
    /// An octal file-mode mask, parsed base-8 and restricted to `0..=0o7777`.
    OctalMode,
    /// One of a fixed set of accepted spellings.
    Enumeration(&'static [&'static str]),
    /// A list of items split on a separator character.
    Separated(&'static ParamType, char),
    /// A field whose absence is legal; present values parse as the wrapped type.
    Optional(&'static ParamType),
}

/// One declared field in a builtin's parameter schema.
#[derive(Debug, Clone, Copy)]
pub struct ParamField {
    /// The wire-level argument key.
    pub name: &'static str,
    /// The field's type.
    pub ty: ParamType,
    /// Whether binding fails when the key is absent.
    ///
    /// A field whose `ty` is `ParamType::Optional` should also set this to
    /// `false`; the two are independent so a non-optional type can still be
    /// declared non-mandatory with a fallback supplied by the builtin.
    pub required: bool,
}

// ============================================================================
// SECTION: Bound Arguments
// ============================================================================

/// A single bound, type-checked argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    /// A bound string.
    Str(String),
    /// A bound integer.
    Int(i64),
    /// A bound boolean.
    Bool(bool),
    /// A bound octal mode, already masked to `0..=0o7777`.
    Octal(u32),
    /// A bound enumeration member, as the matched wire spelling.
    Enum(String),
    /// A bound `Separated<Item, sep>` list.
    List(Vec<BoundValue>),
    /// A bound `Optional<T>` field whose key was absent.
    Absent,
}

impl fmt::Display for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) | Self::Enum(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Octal(value) => write!(f, "{value:o}"),
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", rendered.join(","))
            }
            Self::Absent => write!(f, ""),
        }
    }
}

/// The bound, type-checked argument set passed to a builtin function.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs(BTreeMap<String, BoundValue>);

impl BoundArgs {
    /// Returns the bound string at `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is absent or of the wrong type.
    pub fn string(&self, name: &str) -> EngineResult<&str> {
        match self.0.get(name) {
            Some(BoundValue::Str(value)) => Ok(value.as_str()),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound string at `name`, or `None` for an absent `Optional` field.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is present with the wrong type.
    pub fn string_opt(&self, name: &str) -> EngineResult<Option<&str>> {
        match self.0.get(name) {
            Some(BoundValue::Str(value)) => Ok(Some(value.as_str())),
            Some(BoundValue::Absent) | None => Ok(None),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound integer at `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is absent or of the wrong type.
    pub fn int(&self, name: &str) -> EngineResult<i64> {
        match self.0.get(name) {
            Some(BoundValue::Int(value)) => Ok(*value),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound integer at `name`, or `None` for an absent `Optional` field.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is present with the wrong type.
    pub fn int_opt(&self, name: &str) -> EngineResult<Option<i64>> {
        match self.0.get(name) {
            Some(BoundValue::Int(value)) => Ok(Some(*value)),
            Some(BoundValue::Absent) | None => Ok(None),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound boolean at `name`, defaulting to `false` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is present with the wrong type.
    pub fn bool_flag(&self, name: &str) -> EngineResult<bool> {
        match self.0.get(name) {
            Some(BoundValue::Bool(value)) => Ok(*value),
            Some(BoundValue::Absent) | None => Ok(false),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound octal mode at `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is absent or of the wrong type.
    pub fn octal(&self, name: &str) -> EngineResult<u32> {
        match self.0.get(name) {
            Some(BoundValue::Octal(value)) => Ok(*value),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound octal mode at `name`, or `None` for an absent `Optional` field.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is present with the wrong type.
    pub fn octal_opt(&self, name: &str) -> EngineResult<Option<u32>> {
        match self.0.get(name) {
            Some(BoundValue::Octal(value)) => Ok(Some(*value)),
            Some(BoundValue::Absent) | None => Ok(None),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound enumeration spelling at `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is absent or of the wrong type.
    pub fn enumeration(&self, name: &str) -> EngineResult<&str> {
        match self.0.get(name) {
            Some(BoundValue::Enum(value)) => Ok(value.as_str()),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound list at `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is absent or of the wrong type.
    pub fn list(&self, name: &str) -> EngineResult<&[BoundValue]> {
        match self.0.get(name) {
            Some(BoundValue::List(values)) => Ok(values.as_slice()),
            _ => Err(binding_error(name)),
        }
    }

    /// Returns the bound list at `name`, or `None` for an absent `Optional` field.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Binding`] when `name` is present with the wrong type.
    pub fn list_opt(&self, name: &str) -> EngineResult<Option<&[BoundValue]>> {
        match self.0.get(name) {
            Some(BoundValue::List(values)) => Ok(Some(values.as_slice())),
            Some(BoundValue::Absent) | None => Ok(None),
            _ => Err(binding_error(name)),
        }
    }
}

/// Builds the `EngineError::Binding` raised when a builtin reads a field
/// under the wrong accessor or a name the schema never declared.
fn binding_error(name: &str) -> EngineError {
    EngineError::Binding(format!("parameter '{name}' has no value of the requested type"))
}

// ============================================================================
// SECTION: Binder
// ============================================================================

/// Binds a raw `name -> value` argument map against a builtin's declared schema.
///
/// # Errors
///
/// Returns [`EngineError::Binding`] for every violation in spec.md §4.3:
/// unknown fields, missing required fields, arity overflow, and type/enum
/// coercion failures.
pub fn bind(schema: &[ParamField], raw: &BTreeMap<String, String>) -> EngineResult<BoundArgs> {
    if raw.len() > schema.len() {
        return Err(EngineError::Binding("Too many arguments provided".to_string()));
    }
    for key in raw.keys() {
        if !schema.iter().any(|field| field.name == key) {
            return Err(EngineError::Binding(format!("Unknown parameter '{key}'")));
        }
    }

    let mut bound = BTreeMap::new();
    for field in schema {
        let raw_value = raw.get(field.name);
        if raw_value.is_none() && field.required {
            return Err(EngineError::Binding(format!(
                "Missing required '{}' parameter",
                field.name
            )));
        }
        let value = bind_one(field.name, &field.ty, raw_value)?;
        bound.insert(field.name.to_string(), value);
    }
    Ok(BoundArgs(bound))
}

/// Binds a single field's raw string against its declared type.
fn bind_one(name: &str, ty: &ParamType, raw: Option<&String>) -> EngineResult<BoundValue> {
    match ty {
        ParamType::Optional(inner) => match raw {
            None => Ok(BoundValue::Absent),
            Some(_) => bind_one(name, inner, raw),
        },
        ParamType::String => Ok(BoundValue::Str(raw.cloned().unwrap_or_default())),
        ParamType::Int => {
            let text = raw.map(String::as_str).unwrap_or_default();
            text.parse::<i64>()
                .map(BoundValue::Int)
                .map_err(|_| EngineError::Binding(format!("Invalid value '{text}' for integer parameter '{name}'")))
        }
        ParamType::Bool => {
            let text = raw.map(String::as_str).unwrap_or_default();
            match text {
                "true" => Ok(BoundValue::Bool(true)),
                "false" => Ok(BoundValue::Bool(false)),
                other => Err(EngineError::Binding(format!("Invalid value '{other}' for boolean parameter '{name}'"))),
            }
        }
        ParamType::OctalMode => {
            let text = raw.map(String::as_str).unwrap_or_default();
            let parsed = u32::from_str_radix(text, 8)
                .map_err(|_| EngineError::Binding(format!("Invalid value '{text}' for octal parameter '{name}'")))?;
            if parsed > 0o7777 {
                return Err(EngineError::Binding(format!("Invalid value '{text}' for octal parameter '{name}'")));
            }
            Ok(BoundValue::Octal(parsed))
        }
        ParamType::Enumeration(allowed) => {
            let text = raw.map(String::as_str).unwrap_or_default();
            if allowed.contains(&text) {
                Ok(BoundValue::Enum(text.to_string()))
            } else {
                Err(EngineError::Binding(format!("Invalid value '{text}' for enumeration parameter")))
            }
        }
        ParamType::Separated(item_ty, sep) => {
            let text = raw.map(String::as_str).unwrap_or_default();
            if text.is_empty() {
                return Ok(BoundValue::List(Vec::new()));
            }
            let mut items = Vec::new();
            for piece in text.split(*sep) {
                let owned = piece.to_string();
                items.push(bind_one(name, item_ty, Some(&owned))?);
            }
            Ok(BoundValue::List(items))
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// The function signature every builtin's audit/remediate implementation shares.
pub type BuiltinFn = fn(&BoundArgs, &dyn Context, &mut IndicatorsTree) -> EngineResult<Status>;

/// One registered builtin procedure.
pub struct BuiltinEntry {
    /// The builtin's name as referenced from a procedure document.
    pub name: &'static str,
    /// The builtin's declared parameter schema.
    pub schema: &'static [ParamField],
    /// The audit implementation, if the builtin supports auditing.
    pub audit: Option<BuiltinFn>,
    /// The remediate implementation, if the builtin supports remediation.
    pub remediate: Option<BuiltinFn>,
}

/// Resolves builtin names to their registry entries.
///
/// Implemented for `&'static [BuiltinEntry]` so `compliance-builtins`'s
/// static table can be handed to [`crate::engine::Engine`] directly.
pub trait Registry {
    /// Looks up a builtin by name.
    fn find(&self, name: &str) -> Option<&BuiltinEntry>;
}

impl Registry for &'static [BuiltinEntry] {
    fn find(&self, name: &str) -> Option<&BuiltinEntry> {
        self.iter().find(|entry| entry.name == name)
    }
}
