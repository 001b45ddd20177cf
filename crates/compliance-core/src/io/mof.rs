// compliance-core/src/io/mof.rs
// ============================================================================
// Module: Resource Reader
// Description: Parses MOF-style `instance of OsConfigResource as { ... };`
// blocks off a text stream into Resource values.
// Purpose: Implement spec.md §4.1/§6.2.
// Dependencies: base64, serde_json, crate::error::ResourceError, crate::data::Resource
// ============================================================================

//! ## Overview
//! The reader is line-oriented and lazy: [`ResourceReader`] is an `Iterator`
//! that scans for header lines and yields one `Result<Resource,
//! ResourceError>` per matched block, in source order. Unknown `key = value;`
//! lines inside a block are ignored; only `RuleName`, `ProcedureObjectValue`,
//! `PayloadKey`, and `BenchmarkSection` are recognized.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::data::resource::Resource;
use crate::error::ResourceError;

/// The header substring that opens a resource block.
const BLOCK_HEADER: &str = "instance of OsConfigResource as";

// ============================================================================
// SECTION: Resource Reader
// ============================================================================

/// Reads `Resource` values lazily out of an MOF-style text stream.
pub struct ResourceReader<'a> {
    /// Remaining source lines, 0-based index paired with text.
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> ResourceReader<'a> {
    /// Creates a reader over `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { lines: text.lines().enumerate() }
    }

    /// Parses one block's body, starting immediately after its header line.
    ///
    /// `header_line` is the 1-based line number of the header, used in
    /// `UnterminatedBlock` if the block never closes.
    fn parse_block(&mut self, header_line: usize) -> Result<Resource, ResourceError> {
        let mut rule_name = String::new();
        let mut benchmark_section = String::new();
        let mut procedure_raw: Option<(usize, String)> = None;
        let mut payload_raw: Option<(usize, String)> = None;
        let mut close_line = header_line;

        loop {
            let Some((idx, line)) = self.lines.next() else {
                return Err(ResourceError::UnterminatedBlock { line: header_line });
            };
            let line_number = idx + 1;
            let trimmed = line.trim();
            if trimmed == "};" {
                close_line = line_number;
                break;
            }
            let Some((key, value)) = split_key_value(trimmed) else {
                continue;
            };
            match key {
                "RuleName" => rule_name = value.to_string(),
                "BenchmarkSection" => benchmark_section = value.to_string(),
                "ProcedureObjectValue" => procedure_raw = Some((line_number, value.to_string())),
                "PayloadKey" => payload_raw = Some((line_number, value.to_string())),
                _ => {}
            }
        }

        let Some((procedure_line, procedure_b64)) = procedure_raw else {
            return Err(ResourceError::MissingProcedure { line: close_line });
        };
        let procedure_bytes =
            BASE64
                .decode(procedure_b64)
                .map_err(|source| ResourceError::InvalidBase64 {
                    key: "ProcedureObjectValue".to_string(),
                    line: procedure_line,
                    source,
                })?;
        let procedure: serde_json::Value =
            serde_json::from_slice(&procedure_bytes).map_err(|source| ResourceError::InvalidJson {
                line: procedure_line,
                source,
            })?;

        let (payload, has_init_audit) = match payload_raw {
            None => (None, false),
            Some((payload_line, payload_b64)) => {
                let bytes = BASE64.decode(payload_b64).map_err(|source| ResourceError::InvalidBase64 {
                    key: "PayloadKey".to_string(),
                    line: payload_line,
                    source,
                })?;
                let text = String::from_utf8_lossy(&bytes).into_owned();
                (Some(text), true)
            }
        };

        Ok(Resource { rule_name, benchmark_section, procedure, payload, has_init_audit })
    }
}

impl Iterator for ResourceReader<'_> {
    type Item = Result<Resource, ResourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, line) = self.lines.next()?;
            if line.contains(BLOCK_HEADER) {
                return Some(self.parse_block(idx + 1));
            }
        }
    }
}

/// Splits one `key = value;` line, trimming whitespace, trailing `;`, and surrounding quotes.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, rest) = line.split_once('=')?;
    let key = key.trim();
    let value = rest.trim().strip_suffix(';').unwrap_or(rest.trim()).trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::ResourceReader;
    use crate::error::ResourceError;

    fn encode(value: &str) -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(value)
    }

    #[test]
    fn parses_one_resource_block() {
        let doc = encode(r#"{"audit":{"allOf":[]}}"#);
        let text = format!(
            "instance of OsConfigResource as $Resource\n\
             {{\n\
             RuleName = \"X\";\n\
             ProcedureObjectValue = \"{doc}\";\n\
             BenchmarkSection = \"1.1\";\n\
             }};\n"
        );
        let mut reader = ResourceReader::new(&text);
        let resource = reader.next().expect("one block").expect("parses");
        assert_eq!(resource.rule_name, "X");
        assert_eq!(resource.benchmark_section, "1.1");
        assert!(!resource.has_init_audit);
        assert!(reader.next().is_none());
    }

    #[test]
    fn missing_procedure_is_an_error() {
        let text = "instance of OsConfigResource as $Resource\n{\nRuleName = \"X\";\n};\n";
        let mut reader = ResourceReader::new(text);
        let err = reader.next().expect("one block").expect_err("missing procedure");
        assert!(matches!(err, ResourceError::MissingProcedure { line: 4 }));
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let text = "instance of OsConfigResource as $Resource\nRuleName = \"X\";\n";
        let mut reader = ResourceReader::new(text);
        let err = reader.next().expect("one block").expect_err("never closes");
        assert!(matches!(err, ResourceError::UnterminatedBlock { line: 1 }));
    }

    #[test]
    fn payload_key_sets_has_init_audit() {
        let doc = encode(r#"{"audit":{"allOf":[]}}"#);
        let payload = encode("K=1");
        let text = format!(
            "instance of OsConfigResource as $Resource\n\
             {{\n\
             RuleName = \"X\";\n\
             ProcedureObjectValue = \"{doc}\";\n\
             PayloadKey = \"{payload}\";\n\
             }};\n"
        );
        let mut reader = ResourceReader::new(&text);
        let resource = reader.next().expect("one block").expect("parses");
        assert!(resource.has_init_audit);
        assert_eq!(resource.payload.as_deref(), Some("K=1"));
    }
}
