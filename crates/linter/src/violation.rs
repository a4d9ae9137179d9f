//! The normalized result shape shared by both evaluation mechanisms.

use serde::{Deserialize, Serialize};

/// Special diagnostic code that is always reported at error severity,
/// whatever numeric severity the rule engine assigned it.
pub const UNRECOGNIZED_FORMAT: &str = "unrecognized-format";

/// Severity of a single violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Information,
    Warning,
    Error,
}

impl Severity {
    /// Maps a rule engine's numeric severity (0 = error, 1 = warning,
    /// anything else = information) to the violation severity, forcing
    /// [`UNRECOGNIZED_FORMAT`] diagnostics to error.
    #[must_use]
    pub fn from_diagnostic(level: u32, code: &str) -> Self {
        if code == UNRECOGNIZED_FORMAT {
            return Self::Error;
        }
        match level {
            0 => Self::Error,
            1 => Self::Warning,
            _ => Self::Information,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Information => write!(f, "information"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A position in the source document. 1-based when derived from a parse,
/// 0 when the mechanism cannot produce real positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub line: u32,
    pub column: u32,
}

impl Point {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The zeroed position used when no real location exists.
    #[must_use]
    pub const fn unknown() -> Self {
        Self { line: 0, column: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Point>,
}

/// One diagnostic finding from either evaluation mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Violation {
    /// A bare error violation with no code or location.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            code: None,
            location: None,
        }
    }
}

/// Which mechanism produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintOrigin {
    Schema,
    Rules,
}

/// The normalized outcome of one evaluation mechanism.
///
/// Validity is deliberately asymmetric between the two origins: schema
/// evaluation is valid iff it produced zero structural errors, while rule
/// evaluation carries an explicit verdict that tolerates information-level
/// findings. Callers must not recompute validity from the counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintResult {
    pub valid: bool,
    pub origin: LintOrigin,
    pub violations: Vec<Violation>,
    pub infos: u32,
    pub warnings: u32,
    pub errors: u32,
}

impl LintResult {
    /// A zero-confidence result: one error violation describing why the
    /// mechanism could not run. Evaluation always produces a result, never
    /// a process-level failure.
    #[must_use]
    pub fn failure(origin: LintOrigin, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            origin,
            violations: vec![Violation::error(message)],
            infos: 0,
            warnings: 0,
            errors: 1,
        }
    }
}
