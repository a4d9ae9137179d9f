//! Rule-engine seam and diagnostic normalization.
//!
//! The rule-evaluation language itself lives behind [`RuleEngine`]; this
//! module only defines the diagnostic shape an engine yields and the
//! normalization into the shared [`LintResult`] form.

use crate::violation::{LintOrigin, LintResult, Location, Point, Severity, Violation};
use serde_json::Value;
use thiserror::Error;

/// A 0-based position as reported by a rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagnosticPosition {
    pub line: u32,
    pub character: u32,
}

/// A 0-based source range as reported by a rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagnosticRange {
    pub start: DiagnosticPosition,
    pub end: DiagnosticPosition,
}

/// One finding from a rule engine, in the engine's native shape:
/// numeric severity (0 = error, 1 = warning, anything else = information),
/// a JSON path into the document, and 0-based positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDiagnostic {
    pub code: String,
    pub message: String,
    pub severity: u32,
    pub path: String,
    pub range: DiagnosticRange,
}

/// A rule engine failed to process the ruleset or document.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RuleEngineError(pub String);

/// The external rule-evaluation capability.
///
/// Given a parsed document and a bundled ruleset document, an engine yields
/// diagnostics and nothing else — normalization, severity mapping and
/// verdicts are this crate's job.
pub trait RuleEngine: Send + Sync {
    fn evaluate(
        &self,
        document: &Value,
        ruleset: &Value,
    ) -> Result<Vec<RuleDiagnostic>, RuleEngineError>;
}

/// Normalizes raw engine diagnostics into a [`LintResult`].
///
/// Counts tally the engine's numeric severities; the per-violation label
/// additionally applies the `unrecognized-format` override, so a forced
/// violation can read "error" while still counting under its numeric class.
/// Positions are converted from the engine's 0-based ranges to 1-based on
/// both line and column, both ends. The verdict is explicit:
/// `errors == 0 && warnings == 0`, so information-only outcomes stay valid.
#[must_use]
pub fn format_outcome(diagnostics: Vec<RuleDiagnostic>) -> LintResult {
    let mut infos = 0;
    let mut warnings = 0;
    let mut errors = 0;

    let violations: Vec<Violation> = diagnostics
        .into_iter()
        .map(|diagnostic| {
            match diagnostic.severity {
                0 => errors += 1,
                1 => warnings += 1,
                _ => infos += 1,
            }
            let severity = Severity::from_diagnostic(diagnostic.severity, &diagnostic.code);
            Violation {
                severity,
                message: diagnostic.message,
                code: Some(diagnostic.code),
                location: Some(Location {
                    path: Some(diagnostic.path),
                    start: Some(Point::new(
                        diagnostic.range.start.line + 1,
                        diagnostic.range.start.character + 1,
                    )),
                    end: Some(Point::new(
                        diagnostic.range.end.line + 1,
                        diagnostic.range.end.character + 1,
                    )),
                }),
            }
        })
        .collect();

    LintResult {
        valid: errors == 0 && warnings == 0,
        origin: LintOrigin::Rules,
        violations,
        infos,
        warnings,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::UNRECOGNIZED_FORMAT;

    fn diagnostic(severity: u32, code: &str) -> RuleDiagnostic {
        RuleDiagnostic {
            code: code.to_string(),
            message: format!("{code} fired"),
            severity,
            path: "paths./pets.get".to_string(),
            range: DiagnosticRange {
                start: DiagnosticPosition { line: 4, character: 2 },
                end: DiagnosticPosition { line: 4, character: 10 },
            },
        }
    }

    #[test]
    fn counts_follow_numeric_severity() {
        let result = format_outcome(vec![
            diagnostic(0, "a"),
            diagnostic(1, "b"),
            diagnostic(1, "c"),
            diagnostic(2, "d"),
        ]);
        assert_eq!(result.errors, 1);
        assert_eq!(result.warnings, 2);
        assert_eq!(result.infos, 1);
        assert!(!result.valid);
    }

    #[test]
    fn information_only_outcome_is_valid() {
        let result = format_outcome(vec![diagnostic(2, "style-hint"), diagnostic(3, "note")]);
        assert!(result.valid);
        assert_eq!(result.errors, 0);
        assert_eq!(result.warnings, 0);
        assert_eq!(result.infos, 2);
    }

    #[test]
    fn positions_become_one_based() {
        let result = format_outcome(vec![diagnostic(0, "a")]);
        let location = result.violations[0]
            .location
            .as_ref()
            .expect("rule diagnostics carry locations");
        assert_eq!(location.start, Some(Point::new(5, 3)));
        assert_eq!(location.end, Some(Point::new(5, 11)));
        assert_eq!(location.path.as_deref(), Some("paths./pets.get"));
    }

    #[test]
    fn unrecognized_format_label_is_forced_but_counts_stay_numeric() {
        let result = format_outcome(vec![diagnostic(1, UNRECOGNIZED_FORMAT)]);
        assert_eq!(result.violations[0].severity, Severity::Error);
        // Numeric class still decides the tally and the verdict.
        assert_eq!(result.errors, 0);
        assert_eq!(result.warnings, 1);
        assert!(!result.valid);
    }

    #[test]
    fn empty_outcome_is_valid() {
        let result = format_outcome(Vec::new());
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }
}
