// compliance-core/src/eval/formatters.rs
// ============================================================================
// Module: Output Formatters
// Description: The four result renderings from spec.md §4.6/§6.4.
// Purpose: Turn a rule's Status + IndicatorsTree into Json, CompactList,
// NestedList, or Debug text.
// Dependencies: serde_json, compliance_logic::Status
// ============================================================================

//! ## Overview
//! Each formatter implements `begin(action)`, `add_entry(entry)`,
//! `finish(aggregate)` per spec.md §4.6. `begin`/`finish` are infallible in
//! every formatter but the signature keeps the door open for a sink that can
//! fail (e.g. a formatter that streams straight to a file).

use compliance_logic::Status;
use thiserror::Error;

use crate::data::params::ParameterDictionary;

use super::indicators::Indicator;

// ============================================================================
// SECTION: Formatter Contract
// ============================================================================

/// Errors a formatter can raise while rendering.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The JSON formatter failed to serialize an entry.
    #[error("failed to render JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

/// One rule's worth of input to a formatter.
pub struct FormatEntry<'a> {
    /// The rule name.
    pub rule: &'a str,
    /// The rule's aggregate status for the action just evaluated.
    pub status: &'a Status,
    /// The rule's root indicator, as accumulated during evaluation.
    pub indicator: &'a Indicator,
    /// The rule's resolved parameters, included only by [`DebugFormatter`].
    pub params: &'a ParameterDictionary,
}

/// Renders a batch of rule results into one output string.
pub trait ResultFormatter {
    /// Called once before any entries, naming the action (`"audit"`/`"remediate"`).
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] if the formatter cannot start rendering.
    fn begin(&mut self, action: &str) -> Result<(), FormatError>;

    /// Called once per rule result, in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] if the entry cannot be rendered.
    fn add_entry(&mut self, entry: &FormatEntry<'_>) -> Result<(), FormatError>;

    /// Called once after all entries, with the overall aggregate status.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] if the final render fails.
    fn finish(&mut self, aggregate: &Status) -> Result<String, FormatError>;
}

/// Renders a `Status` to the short label used outside JSON (`Compliant`/`NonCompliant`/`Error`).
fn status_label(status: &Status) -> &'static str {
    status.label()
}

// ============================================================================
// SECTION: Json Formatter
// ============================================================================

/// Renders results as a single RFC 8259 JSON object keyed by rule.
#[derive(Debug, Default)]
pub struct JsonFormatter {
    /// Rule entries collected so far.
    rules: Vec<serde_json::Value>,
}

impl JsonFormatter {
    /// Creates an empty JSON formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultFormatter for JsonFormatter {
    fn begin(&mut self, _action: &str) -> Result<(), FormatError> {
        self.rules.clear();
        Ok(())
    }

    fn add_entry(&mut self, entry: &FormatEntry<'_>) -> Result<(), FormatError> {
        self.rules.push(serde_json::json!({
            "name": entry.rule,
            "status": status_label(entry.status),
            "indicators": indicator_to_json(entry.indicator),
        }));
        Ok(())
    }

    fn finish(&mut self, aggregate: &Status) -> Result<String, FormatError> {
        let document = serde_json::json!({
            "rules": self.rules,
            "aggregate": status_label(aggregate),
        });
        serde_json::to_string_pretty(&document).map_err(FormatError::from)
    }
}

/// Recursively renders an indicator subtree as a JSON array entry.
fn indicator_to_json(indicator: &Indicator) -> serde_json::Value {
    serde_json::json!({
        "label": indicator.label,
        "status": indicator.status.as_ref().map(status_label),
        "evidence": indicator.evidence,
        "children": indicator.children.iter().map(indicator_to_json).collect::<Vec<_>>(),
    })
}

// ============================================================================
// SECTION: Compact List Formatter
// ============================================================================

/// Renders one `<rule> <STATUS>` line per rule, followed by the aggregate.
#[derive(Debug, Default)]
pub struct CompactListFormatter {
    /// Lines rendered so far.
    lines: Vec<String>,
}

impl CompactListFormatter {
    /// Creates an empty compact-list formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultFormatter for CompactListFormatter {
    fn begin(&mut self, _action: &str) -> Result<(), FormatError> {
        self.lines.clear();
        Ok(())
    }

    fn add_entry(&mut self, entry: &FormatEntry<'_>) -> Result<(), FormatError> {
        self.lines.push(format!("{} {}", entry.rule, status_label(entry.status)));
        Ok(())
    }

    fn finish(&mut self, aggregate: &Status) -> Result<String, FormatError> {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(status_label(aggregate));
        out.push('\n');
        Ok(out)
    }
}

// ============================================================================
// SECTION: Nested List Formatter
// ============================================================================

/// Renders an indented tree, one line per indicator, two-space indent per level.
#[derive(Debug, Default)]
pub struct NestedListFormatter {
    /// Lines rendered so far.
    lines: Vec<String>,
}

impl NestedListFormatter {
    /// Creates an empty nested-list formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultFormatter for NestedListFormatter {
    fn begin(&mut self, _action: &str) -> Result<(), FormatError> {
        self.lines.clear();
        Ok(())
    }

    fn add_entry(&mut self, entry: &FormatEntry<'_>) -> Result<(), FormatError> {
        self.lines.push(format!("{} {}", entry.rule, status_label(entry.status)));
        render_nested(entry.indicator, 1, &mut self.lines, None);
        Ok(())
    }

    fn finish(&mut self, aggregate: &Status) -> Result<String, FormatError> {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(status_label(aggregate));
        out.push('\n');
        Ok(out)
    }
}

/// Appends one indented line per indicator node, recursing into its children.
fn render_nested(indicator: &Indicator, depth: usize, lines: &mut Vec<String>, params: Option<&ParameterDictionary>) {
    let indent = "  ".repeat(depth);
    let status = indicator.status.as_ref().map_or("(unset)", status_label);
    lines.push(format!("{indent}{} {status}", indicator.label));
    for line in &indicator.evidence {
        lines.push(format!("{indent}  {line}"));
    }
    if depth == 1 {
        if let Some(params) = params {
            let dump: Vec<String> = params
                .iter_resolved()
                .map(|(name, value)| format!("{name}={}", value.unwrap_or("<unset>")))
                .collect();
            if !dump.is_empty() {
                lines.push(format!("{indent}params={}", dump.join(" ")));
            }
        }
    }
    for child in &indicator.children {
        render_nested(child, depth + 1, lines, None);
    }
}

// ============================================================================
// SECTION: Debug Formatter
// ============================================================================

/// Like [`NestedListFormatter`], but also dumps each rule's resolved parameter overlay.
#[derive(Debug, Default)]
pub struct DebugFormatter {
    /// Lines rendered so far.
    lines: Vec<String>,
}

impl DebugFormatter {
    /// Creates an empty debug formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultFormatter for DebugFormatter {
    fn begin(&mut self, action: &str) -> Result<(), FormatError> {
        self.lines.clear();
        self.lines.push(format!("# action={action}"));
        Ok(())
    }

    fn add_entry(&mut self, entry: &FormatEntry<'_>) -> Result<(), FormatError> {
        self.lines.push(format!("{} {}", entry.rule, status_label(entry.status)));
        render_nested(entry.indicator, 1, &mut self.lines, Some(entry.params));
        Ok(())
    }

    fn finish(&mut self, aggregate: &Status) -> Result<String, FormatError> {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("aggregate={}", status_label(aggregate)));
        out.push('\n');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use compliance_logic::Status;

    use super::CompactListFormatter;
    use super::FormatEntry;
    use super::Indicator;
    use super::ResultFormatter;
    use crate::data::params::ParameterDictionary;

    #[test]
    fn compact_list_renders_rule_then_aggregate() {
        let mut formatter = CompactListFormatter::new();
        let indicator = Indicator::new("RuleX");
        let params = ParameterDictionary::new();
        formatter.begin("audit").expect("begin");
        formatter
            .add_entry(&FormatEntry {
                rule: "RuleX",
                status: &Status::Compliant,
                indicator: &indicator,
                params: &params,
            })
            .expect("add_entry");
        let out = formatter.finish(&Status::Compliant).expect("finish");
        assert_eq!(out, "RuleX Compliant\nCompliant\n");
    }
}
