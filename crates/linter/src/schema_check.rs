//! Structural validation of a document against its declared schema.

use crate::violation::{LintOrigin, LintResult, Location, Point, Severity, Violation};
use apiscan_registry::{RegistryError, SchemaRegistry, SchemaType};
use serde_json::Value;

const NO_SCHEMA_FOUND: &str = "No schema found";

/// Validates a parsed document against the schema its version field selects.
///
/// The schema is chosen from the document's `openapi`, `swagger` or
/// `asyncapi` field (`openapi` and `swagger` both key the OpenAPI family).
/// A missing field or an unregistered version fails closed: a single
/// "No schema found" error violation, not an exception. Structural errors
/// carry the schema keyword as `code` and the instance path as
/// `location.path`; this mechanism cannot produce real positions, so they
/// are zeroed.
#[tracing::instrument(skip_all)]
#[must_use]
pub fn evaluate_schema(document: &Value, registry: &SchemaRegistry) -> LintResult {
    let Some((schema_type, version)) = declared_schema(document) else {
        tracing::info!("Document declares no schema version");
        return no_schema_found();
    };

    let entry = match registry.find(schema_type, version) {
        Ok(entry) => entry,
        Err(RegistryError::SchemaNotFound { .. }) => {
            tracing::info!(%schema_type, version, "No schema registered for declared version");
            return no_schema_found();
        }
        Err(e) => return LintResult::failure(LintOrigin::Schema, e.to_string()),
    };
    let Some(schema) = entry.schema.as_deref() else {
        return LintResult::failure(
            LintOrigin::Schema,
            format!("Schema {schema_type} {version} has no usable state"),
        );
    };

    tracing::info!(%schema_type, version, "Validating document structure");
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(e) => {
            return LintResult::failure(
                LintOrigin::Schema,
                format!("Failed to compile schema {schema_type} {version}: {e}"),
            )
        }
    };

    let violations: Vec<Violation> = validator
        .iter_errors(document)
        .map(|error| Violation {
            severity: Severity::Error,
            message: error.to_string(),
            code: Some(schema_keyword(&error)),
            location: Some(Location {
                path: Some(error.instance_path().to_string()),
                start: Some(Point::unknown()),
                end: Some(Point::unknown()),
            }),
        })
        .collect();

    let errors = u32::try_from(violations.len()).unwrap_or(u32::MAX);
    LintResult {
        valid: errors == 0,
        origin: LintOrigin::Schema,
        violations,
        infos: 0,
        warnings: 0,
        errors,
    }
}

/// The (type, version) pair the document declares, if any.
fn declared_schema(document: &Value) -> Option<(SchemaType, &str)> {
    if let Some(version) = document.get("openapi").and_then(Value::as_str) {
        return Some((SchemaType::Openapi, version));
    }
    if let Some(version) = document.get("swagger").and_then(Value::as_str) {
        return Some((SchemaType::Openapi, version));
    }
    if let Some(version) = document.get("asyncapi").and_then(Value::as_str) {
        return Some((SchemaType::Asyncapi, version));
    }
    None
}

fn no_schema_found() -> LintResult {
    LintResult {
        valid: false,
        origin: LintOrigin::Schema,
        violations: vec![Violation {
            severity: Severity::Error,
            message: NO_SCHEMA_FOUND.to_string(),
            code: Some("unknown".to_string()),
            location: Some(Location {
                path: Some(String::new()),
                start: Some(Point::unknown()),
                end: Some(Point::unknown()),
            }),
        }],
        infos: 0,
        warnings: 0,
        errors: 1,
    }
}

/// The final segment of the failing keyword's location in the schema.
fn schema_keyword(error: &jsonschema::ValidationError<'_>) -> String {
    let path = error.schema_path().to_string();
    path.rsplit('/')
        .find(|segment| !segment.is_empty() && segment.parse::<usize>().is_err())
        .unwrap_or("schema")
        .to_string()
}
