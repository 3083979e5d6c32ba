//! Decoding of label text carried in object metadata fields.
//!
//! Each field is named after a class and holds base64 text of
//! newline-separated `[class_id] x y w h` lines. A leading numeric class id is
//! dropped; the registry id of the field's class replaces it.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::core::registry::ClassRegistry;

/// Standard alphabet, padding optional
const TRANSPORT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("invalid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("decoded payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One emitted label line. Geometry tokens are kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelLine {
    pub class_id: u32,
    pub geometry: [String; 4],
}

impl LabelLine {
    pub fn to_line(&self) -> String {
        format!("{} {}", self.class_id, self.geometry.join(" "))
    }
}

impl fmt::Display for LabelLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Lines parsed out of a single decoded field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldLines {
    pub lines: Vec<LabelLine>,
    /// Non-empty lines with a token count other than 4 (or 5 with a numeric id)
    pub discarded: usize,
}

/// Per-field counts once parsing succeeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldStats {
    pub records: usize,
    pub discarded: usize,
}

/// What happened to one metadata field that matched a registry class
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub class_name: String,
    pub class_id: u32,
    pub result: Result<FieldStats, FieldError>,
}

/// All label lines for one object plus the per-field outcomes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelExtraction {
    pub lines: Vec<LabelLine>,
    pub fields: Vec<FieldOutcome>,
}

impl LabelExtraction {
    /// Label file contents: records joined by `\n`, no trailing newline
    pub fn label_text(&self) -> String {
        self.lines
            .iter()
            .map(LabelLine::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn failed_fields(&self) -> usize {
        self.fields.iter().filter(|f| f.result.is_err()).count()
    }

    pub fn discarded_lines(&self) -> usize {
        self.fields
            .iter()
            .filter_map(|f| f.result.as_ref().ok())
            .map(|stats| stats.discarded)
            .sum()
    }
}

/// Undo the transport encoding of a metadata value.
pub fn decode_field(raw: &str) -> Result<String, FieldError> {
    let bytes = TRANSPORT.decode(raw.trim())?;
    Ok(String::from_utf8(bytes)?)
}

fn is_numeric_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Turn decoded field text into label lines tagged with `class_id`.
pub fn parse_field_lines(text: &str, class_id: u32) -> FieldLines {
    let mut parsed = FieldLines::default();

    for line in text.trim().lines() {
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        // The embedded class id is never trusted
        if tokens.len() == 5 && is_numeric_token(tokens[0]) {
            tokens.remove(0);
        }

        match tokens.as_slice() {
            [x, y, w, h] => parsed.lines.push(LabelLine {
                class_id,
                geometry: [x.to_string(), y.to_string(), w.to_string(), h.to_string()],
            }),
            _ => parsed.discarded += 1,
        }
    }

    parsed
}

/// Extract label lines from every metadata field named after a registry class.
///
/// Fields are visited in registry order. A field that fails to decode is
/// recorded in `fields` and contributes no lines; the others are unaffected.
pub fn extract_labels(
    metadata: &BTreeMap<String, String>,
    registry: &ClassRegistry,
) -> LabelExtraction {
    let mut extraction = LabelExtraction::default();

    for (class_id, class_name) in registry.iter() {
        let Some(raw) = metadata.get(class_name) else {
            continue;
        };

        let result = match decode_field(raw) {
            Ok(text) => {
                let field = parse_field_lines(&text, class_id);
                if field.discarded > 0 {
                    debug!(
                        "Discarded {} malformed lines in field {:?}",
                        field.discarded, class_name
                    );
                }
                let stats = FieldStats {
                    records: field.lines.len(),
                    discarded: field.discarded,
                };
                extraction.lines.extend(field.lines);
                Ok(stats)
            }
            Err(e) => {
                warn!("Skipping metadata field {:?}: {}", class_name, e);
                Err(e)
            }
        };

        extraction.fields.push(FieldOutcome {
            class_name: class_name.to_string(),
            class_id,
            result,
        });
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(text)
    }

    fn metadata(fields: &[(&str, String)]) -> BTreeMap<String, String> {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_decode_field() {
        assert_eq!(decode_field(&encode("0.1 0.2 0.3 0.4")).unwrap(), "0.1 0.2 0.3 0.4");
        // Missing padding and surrounding whitespace are tolerated
        assert_eq!(decode_field(" YWI \n").unwrap(), "ab");
        assert!(matches!(decode_field("not base64!"), Err(FieldError::Decode(_))));
        let invalid_utf8 = base64::engine::general_purpose::STANDARD.encode([0xff, 0xfe]);
        assert!(matches!(decode_field(&invalid_utf8), Err(FieldError::Utf8(_))));
    }

    #[test]
    fn test_embedded_class_id_is_replaced() {
        let field = parse_field_lines("0 0.5 0.5 0.2 0.3\n0.1 0.1 0.05 0.05", 1);
        let lines: Vec<String> = field.lines.iter().map(LabelLine::to_line).collect();
        assert_eq!(lines, vec!["1 0.5 0.5 0.2 0.3", "1 0.1 0.1 0.05 0.05"]);
        assert_eq!(field.discarded, 0);
    }

    #[test]
    fn test_bad_token_counts_are_discarded() {
        let text = "0.1 0.2 0.3\n7 0.1 0.2 0.3 0.4 0.5\na 0.1 0.2 0.3 0.4\n   \n12 .5 .5 .1 .1";
        let field = parse_field_lines(text, 3);
        assert_eq!(field.lines.len(), 1);
        assert_eq!(field.lines[0].to_line(), "3 .5 .5 .1 .1");
        assert_eq!(field.discarded, 3);
    }

    #[test]
    fn test_geometry_tokens_are_verbatim() {
        let field = parse_field_lines("1.50 -0.2 abc 1e-3", 0);
        assert_eq!(field.lines[0].to_line(), "0 1.50 -0.2 abc 1e-3");
    }

    #[test]
    fn test_extract_uses_registry_order_and_ids() {
        let registry = ClassRegistry::default();
        let meta = metadata(&[
            ("preamble", encode("4 0.5 0.1 0.9 0.1")),
            ("table", encode("0 0.5 0.5 0.2 0.3\n0.1 0.1 0.05 0.05")),
            ("unknown", encode("0.1 0.1 0.1 0.1")),
        ]);

        let extraction = extract_labels(&meta, &registry);

        assert_eq!(
            extraction.label_text(),
            "1 0.5 0.5 0.2 0.3\n1 0.1 0.1 0.05 0.05\n3 0.5 0.1 0.9 0.1"
        );
        assert_eq!(extraction.fields.len(), 2);
        assert_eq!(extraction.failed_fields(), 0);
    }

    #[test]
    fn test_decode_failure_does_not_affect_other_fields() {
        let registry = ClassRegistry::default();
        let meta = metadata(&[
            ("schematic", "%%%".to_string()),
            ("qcm", encode("0.2 0.2 0.1 0.1\nbad line")),
        ]);

        let extraction = extract_labels(&meta, &registry);

        assert_eq!(extraction.label_text(), "2 0.2 0.2 0.1 0.1");
        assert_eq!(extraction.failed_fields(), 1);
        assert_eq!(extraction.discarded_lines(), 1);
        assert!(extraction.fields[0].result.is_err());
        assert_eq!(extraction.fields[0].class_name, "schematic");
    }

    #[test]
    fn test_no_matching_fields_gives_empty_text() {
        let registry = ClassRegistry::default();
        let extraction = extract_labels(&BTreeMap::new(), &registry);
        assert_eq!(extraction.label_text(), "");
        assert!(extraction.fields.is_empty());
    }
}
