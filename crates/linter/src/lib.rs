//! Two-mechanism lint engine for API description documents.
//!
//! Validation runs through two independent mechanisms sharing one output
//! shape: configurable rule evaluation (behind the [`RuleEngine`] trait —
//! this crate orchestrates engines, it does not implement a rule language)
//! and JSON-Schema structural validation. Outcomes are normalized into
//! [`LintResult`]s and merged into a [`LintReport`] under an explicit
//! [`VerdictPolicy`].
//!
//! Evaluation never fails: malformed documents, unknown rulesets and broken
//! registry entries all surface as finite all-error results so a caller can
//! always persist the outcome.

mod document;
mod engine;
mod rules;
mod schema_check;
mod violation;

pub use document::{detect_format, parse_document, DocumentFormat, ParseError};
pub use engine::{LintEngine, LintReport, VerdictPolicy};
pub use rules::{
    format_outcome, DiagnosticPosition, DiagnosticRange, RuleDiagnostic, RuleEngine,
    RuleEngineError,
};
pub use schema_check::evaluate_schema;
pub use violation::{
    LintOrigin, LintResult, Location, Point, Severity, Violation, UNRECOGNIZED_FORMAT,
};
