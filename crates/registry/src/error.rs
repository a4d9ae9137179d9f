use crate::schema::SchemaType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors surfaced by registry lookups.
///
/// Fetch and bundle failures never appear here — they are absorbed into the
/// affected entry's health state. Only directly-addressed lookups fail.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The ruleset name was never registered.
    #[error("No ruleset called '{name}' exists.")]
    RulesetNotFound { name: String },

    /// The ruleset is registered but failed to load and no previous good
    /// state is available to serve.
    #[error("Ruleset '{name}' is unavailable: {message}")]
    RulesetUnavailable { name: String, message: String },

    /// No schema was registered under this (type, version) pair.
    #[error("No schema found for {schema_type} {version}")]
    SchemaNotFound {
        schema_type: SchemaType,
        version: String,
    },

    /// The schema is registered but its download or bundling failed.
    /// Unlike rulesets, schema lookups never serve stale state.
    #[error("{message}")]
    SchemaInvalid { message: String },
}
