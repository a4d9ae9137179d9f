//! The lint engine: one entry point running both evaluation mechanisms and
//! merging their outputs into a single normalized report.

use crate::document;
use crate::rules::{format_outcome, RuleEngine};
use crate::schema_check;
use crate::violation::{LintOrigin, LintResult, Violation};
use apiscan_registry::{RulesetEntry, RulesetRegistry, SchemaRegistry};
use serde_json::Value;
use std::sync::Arc;

/// How schema-evaluation validity composes with the rule-evaluation verdict.
///
/// The composition is an explicit orchestrator decision, not a hard-coded
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerdictPolicy {
    /// Only rule evaluation runs; its verdict is the scan verdict.
    #[default]
    RulesOnly,
    /// Schema evaluation also runs and contributes violations and counts,
    /// but the rule verdict alone decides validity.
    SchemaAdditive,
    /// Both mechanisms run and both must be valid.
    RequireBoth,
}

/// The merged outcome of one scan run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    pub valid: bool,
    pub infos: u32,
    pub warnings: u32,
    pub errors: u32,
    pub violations: Vec<Violation>,
}

impl From<LintResult> for LintReport {
    fn from(result: LintResult) -> Self {
        Self {
            valid: result.valid,
            infos: result.infos,
            warnings: result.warnings,
            errors: result.errors,
            violations: result.violations,
        }
    }
}

/// Runs rule evaluation (and, policy permitting, schema evaluation) over
/// submitted documents.
///
/// The engine borrows resolved rulesets and schemas only for the duration of
/// one evaluation; a concurrent registry refresh replaces entries without
/// affecting in-flight runs.
pub struct LintEngine {
    rule_engine: Arc<dyn RuleEngine>,
    policy: VerdictPolicy,
}

impl std::fmt::Debug for LintEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LintEngine")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl LintEngine {
    #[must_use]
    pub fn new(rule_engine: Arc<dyn RuleEngine>) -> Self {
        Self {
            rule_engine,
            policy: VerdictPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: VerdictPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> VerdictPolicy {
        self.policy
    }

    /// Rule evaluation against an already-resolved ruleset entry.
    ///
    /// A stale entry (marked failed but holding its last good ruleset) is
    /// used as-is; an entry with no usable document yields a zero-confidence
    /// failure result.
    #[must_use]
    pub fn evaluate_rules(&self, parsed: &Value, entry: &RulesetEntry) -> LintResult {
        let Some(ruleset) = entry.ruleset.as_deref() else {
            return LintResult::failure(
                LintOrigin::Rules,
                entry
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("Ruleset '{}' has no usable state", entry.name)),
            );
        };

        match self.rule_engine.evaluate(parsed, ruleset) {
            Ok(diagnostics) => format_outcome(diagnostics),
            Err(e) => LintResult::failure(LintOrigin::Rules, e.to_string()),
        }
    }

    /// Runs a full evaluation of raw document text against a named ruleset.
    ///
    /// Always produces a report: unparseable documents, unknown ruleset
    /// names and unavailable registry entries all come back as finite
    /// all-error results rather than failures.
    #[tracing::instrument(skip(self, text, rulesets, schemas))]
    #[must_use]
    pub fn run(
        &self,
        text: &str,
        ruleset_name: &str,
        rulesets: &RulesetRegistry,
        schemas: &SchemaRegistry,
    ) -> LintReport {
        let parsed = match document::parse_document(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "Document is unparseable");
                return LintReport::from(LintResult::failure(LintOrigin::Rules, e.to_string()));
            }
        };

        let rule_result = match rulesets.resolve(ruleset_name) {
            Ok(entry) => self.evaluate_rules(&parsed, &entry),
            Err(e) => {
                tracing::debug!(ruleset = ruleset_name, error = %e, "Ruleset not usable");
                LintResult::failure(LintOrigin::Rules, e.to_string())
            }
        };

        match self.policy {
            VerdictPolicy::RulesOnly => LintReport::from(rule_result),
            VerdictPolicy::SchemaAdditive => merge(
                rule_result,
                schema_check::evaluate_schema(&parsed, schemas),
                false,
            ),
            VerdictPolicy::RequireBoth => merge(
                rule_result,
                schema_check::evaluate_schema(&parsed, schemas),
                true,
            ),
        }
    }
}

/// Concatenates the schema mechanism's findings onto the rule result.
/// The rule verdict stays authoritative unless both mechanisms must pass.
fn merge(rules: LintResult, schema: LintResult, require_both: bool) -> LintReport {
    let valid = if require_both {
        rules.valid && schema.valid
    } else {
        rules.valid
    };

    let mut violations = rules.violations;
    violations.extend(schema.violations);

    LintReport {
        valid,
        infos: rules.infos + schema.infos,
        warnings: rules.warnings + schema.warnings,
        errors: rules.errors + schema.errors,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{DiagnosticRange, RuleDiagnostic, RuleEngineError};
    use apiscan_registry::{FetchClient, RulesetSource};

    /// Test engine that replays a fixed set of diagnostics.
    struct StaticRuleEngine(Vec<RuleDiagnostic>);

    impl RuleEngine for StaticRuleEngine {
        fn evaluate(
            &self,
            _document: &Value,
            _ruleset: &Value,
        ) -> Result<Vec<RuleDiagnostic>, RuleEngineError> {
            Ok(self.0.clone())
        }
    }

    struct FailingRuleEngine;

    impl RuleEngine for FailingRuleEngine {
        fn evaluate(
            &self,
            _document: &Value,
            _ruleset: &Value,
        ) -> Result<Vec<RuleDiagnostic>, RuleEngineError> {
            Err(RuleEngineError("engine exploded".to_string()))
        }
    }

    fn clean_engine() -> LintEngine {
        LintEngine::new(Arc::new(StaticRuleEngine(Vec::new())))
    }

    fn warning_diagnostic() -> RuleDiagnostic {
        RuleDiagnostic {
            code: "style".to_string(),
            message: "consider a description".to_string(),
            severity: 1,
            path: "info".to_string(),
            range: DiagnosticRange::default(),
        }
    }

    async fn registries_with_oas() -> (Arc<RulesetRegistry>, SchemaRegistry) {
        let rulesets = Arc::new(RulesetRegistry::new(FetchClient::new()));
        rulesets
            .register(
                "oas",
                RulesetSource::Inline(r#"{"rules": {}}"#.to_string()),
                None,
            )
            .await;
        (rulesets, SchemaRegistry::new(FetchClient::new()))
    }

    #[tokio::test]
    async fn clean_run_is_valid() {
        let (rulesets, schemas) = registries_with_oas().await;
        let report = clean_engine().run(
            r#"{"openapi": "3.0.0", "info": {"title": "x", "version": "1"}, "paths": {}}"#,
            "oas",
            &rulesets,
            &schemas,
        );
        assert!(report.valid);
        assert_eq!(report.errors, 0);
        assert!(report.violations.is_empty());
    }

    #[tokio::test]
    async fn unknown_ruleset_yields_finite_error_result() {
        let (rulesets, schemas) = registries_with_oas().await;
        let report = clean_engine().run("{}", "does-not-exist", &rulesets, &schemas);
        assert!(!report.valid);
        assert_eq!(report.errors, 1);
        assert_eq!(
            report.violations[0].message,
            "No ruleset called 'does-not-exist' exists."
        );
    }

    #[tokio::test]
    async fn unavailable_ruleset_yields_zero_confidence_result() {
        let rulesets = Arc::new(RulesetRegistry::new(FetchClient::new()));
        rulesets
            .register(
                "broken",
                RulesetSource::Url("file:///does/not/exist.json".to_string()),
                None,
            )
            .await;
        let schemas = SchemaRegistry::new(FetchClient::new());

        let report = clean_engine().run("{}", "broken", &rulesets, &schemas);
        assert!(!report.valid);
        assert_eq!(report.errors, 1);
        assert!(report.violations[0].message.contains("unavailable"));
    }

    #[tokio::test]
    async fn unparseable_document_yields_evaluation_failure() {
        let (rulesets, schemas) = registries_with_oas().await;
        let report = clean_engine().run("{broken: [", "oas", &rulesets, &schemas);
        assert!(!report.valid);
        assert_eq!(report.errors, 1);
        assert!(report.violations[0].message.contains("cannot be parsed"));
    }

    #[tokio::test]
    async fn engine_failure_is_a_result_not_a_panic() {
        let (rulesets, schemas) = registries_with_oas().await;
        let engine = LintEngine::new(Arc::new(FailingRuleEngine));
        let report = engine.run("{}", "oas", &rulesets, &schemas);
        assert!(!report.valid);
        assert_eq!(report.violations[0].message, "engine exploded");
    }

    #[tokio::test]
    async fn rules_only_policy_skips_schema_evaluation() {
        let (rulesets, schemas) = registries_with_oas().await;
        // No schema registered for 3.0.0; RulesOnly must not care.
        let report = clean_engine().run(r#"{"openapi": "3.0.0"}"#, "oas", &rulesets, &schemas);
        assert!(report.valid);
        assert!(report.violations.is_empty());
    }

    #[tokio::test]
    async fn schema_additive_policy_adds_violations_without_overriding_verdict() {
        let (rulesets, schemas) = registries_with_oas().await;
        let engine = clean_engine().with_policy(VerdictPolicy::SchemaAdditive);

        // Rule evaluation is clean, schema evaluation fails closed with
        // "No schema found" — additive policy keeps the rule verdict.
        let report = engine.run(r#"{"openapi": "9.9"}"#, "oas", &rulesets, &schemas);
        assert!(report.valid);
        assert_eq!(report.errors, 1);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].message, "No schema found");
    }

    #[tokio::test]
    async fn require_both_policy_lets_schema_evaluation_veto() {
        let (rulesets, schemas) = registries_with_oas().await;
        let engine = clean_engine().with_policy(VerdictPolicy::RequireBoth);

        let report = engine.run(r#"{"openapi": "9.9"}"#, "oas", &rulesets, &schemas);
        assert!(!report.valid);
        assert_eq!(report.errors, 1);
    }

    #[tokio::test]
    async fn rule_warnings_invalidate_but_merge_counts_add_up() {
        let (rulesets, schemas) = registries_with_oas().await;
        let engine = LintEngine::new(Arc::new(StaticRuleEngine(vec![warning_diagnostic()])))
            .with_policy(VerdictPolicy::SchemaAdditive);

        let report = engine.run(r#"{"openapi": "9.9"}"#, "oas", &rulesets, &schemas);
        assert!(!report.valid);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.violations.len(), 2);
    }
}
