//! Best-effort format sniffing for submitted documents.

use serde_json::Value;
use thiserror::Error;

/// The wire format a document appears to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

/// A document that could not be parsed in either format.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ParseError(String);

/// Sniff the document format: JSON when the text begins with `{`, YAML
/// otherwise. Callers supplying ambiguous input accept this heuristic's
/// outcome.
#[must_use]
pub fn detect_format(text: &str) -> DocumentFormat {
    if text.as_bytes().first() == Some(&b'{') {
        DocumentFormat::Json
    } else {
        DocumentFormat::Yaml
    }
}

/// Parses a submitted document with the sniffed parser, falling back to the
/// other one before giving up.
///
/// # Errors
///
/// Returns a [`ParseError`] only when the text parses as neither JSON nor
/// YAML; the error message carries the sniffed parser's diagnostic.
pub fn parse_document(text: &str) -> Result<Value, ParseError> {
    match detect_format(text) {
        DocumentFormat::Json => serde_json::from_str(text).or_else(|json_error| {
            serde_yaml::from_str(text).map_err(|_| {
                ParseError(format!(
                    "Document cannot be parsed as JSON or YAML: {json_error}"
                ))
            })
        }),
        DocumentFormat::Yaml => serde_yaml::from_str(text).or_else(|yaml_error| {
            serde_json::from_str(text).map_err(|_| {
                ParseError(format!(
                    "Document cannot be parsed as YAML or JSON: {yaml_error}"
                ))
            })
        }),
    }
}
