//! End-to-end flows over the scan orchestrator with a stub rule engine.

use apiscan_config::AppConfig;
use apiscan_linter::{
    LintEngine, RuleDiagnostic, RuleEngine, RuleEngineError, VerdictPolicy,
};
use apiscan_registry::{FetchClient, RulesetRegistry, RulesetSource, SchemaRegistry};
use apiscan_scan::{ProbeStatus, ScanError, ScanService, ScanStatus, ScanStore};
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

const VALID_OPENAPI: &str =
    r#"{"openapi":"3.0.0","info":{"title":"x","version":"1"},"paths":{}}"#;

/// Rule engine that reports nothing — every document passes rule
/// evaluation.
struct QuietRuleEngine;

impl RuleEngine for QuietRuleEngine {
    fn evaluate(
        &self,
        _document: &Value,
        _ruleset: &Value,
    ) -> Result<Vec<RuleDiagnostic>, RuleEngineError> {
        Ok(Vec::new())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn service_with_oas() -> ScanService {
    init_tracing();
    let rulesets = Arc::new(RulesetRegistry::new(FetchClient::new()));
    rulesets
        .register(
            "oas",
            RulesetSource::Inline(r#"{"extends": ["spectral:oas"], "rules": {}}"#.to_string()),
            None,
        )
        .await;
    let schemas = Arc::new(SchemaRegistry::new(FetchClient::new()));
    ScanService::new(
        rulesets,
        schemas,
        LintEngine::new(Arc::new(QuietRuleEngine)),
        Arc::new(ScanStore::new()),
    )
}

#[tokio::test]
async fn valid_document_produces_a_valid_scan_with_provenance() -> anyhow::Result<()> {
    let service = service_with_oas().await;

    let scan = service.scan(VALID_OPENAPI.to_string(), Some("oas"), Vec::new(), false)?;

    assert_eq!(scan.status, ScanStatus::Valid);
    assert!(scan.info.valid);
    assert_eq!(scan.info.errors, 0);
    assert_eq!(scan.ruleset.name, "oas");
    assert!(!scan.ruleset.hash.is_empty());
    assert!(scan.available_until > scan.created_at);
    Ok(())
}

#[tokio::test]
async fn unknown_ruleset_fails_before_any_record_exists() {
    let service = service_with_oas().await;

    let err = service
        .scan(VALID_OPENAPI.to_string(), Some("does-not-exist"), Vec::new(), false)
        .expect_err("unknown ruleset");

    assert!(matches!(err, ScanError::RulesetNotFound { .. }));
    assert_eq!(err.to_string(), "No ruleset called 'does-not-exist' exists.");
    assert!(service.store().is_empty());
}

#[tokio::test]
async fn default_ruleset_is_used_when_none_is_named() -> anyhow::Result<()> {
    let service = service_with_oas().await;
    let scan = service.scan(VALID_OPENAPI.to_string(), None, Vec::new(), false)?;
    assert_eq!(scan.ruleset.name, "oas");
    Ok(())
}

#[tokio::test]
async fn tag_filter_is_conjunctive() -> anyhow::Result<()> {
    let service = service_with_oas().await;

    let first = service.scan(
        VALID_OPENAPI.to_string(),
        Some("oas"),
        vec!["team-a".to_string()],
        false,
    )?;
    service.scan(
        VALID_OPENAPI.to_string(),
        Some("oas"),
        vec!["team-b".to_string()],
        false,
    )?;
    let both = service.scan(
        VALID_OPENAPI.to_string(),
        Some("oas"),
        vec!["team-a".to_string(), "team-b".to_string()],
        false,
    )?;

    let team_a = service.get_scans(None, &["team-a".to_string()]);
    assert_eq!(team_a.len(), 2);
    assert!(team_a.iter().any(|scan| scan.id == first.id));
    assert!(team_a.iter().any(|scan| scan.id == both.id));

    let exactly_both =
        service.get_scans(None, &["team-a".to_string(), "team-b".to_string()]);
    assert_eq!(exactly_both.len(), 1);
    assert_eq!(exactly_both[0].id, both.id);

    assert!(service
        .get_scans(None, &["team-a".to_string(), "team-c".to_string()])
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn listing_right_after_two_scans_returns_only_the_matching_one() -> anyhow::Result<()> {
    let service = service_with_oas().await;

    let first = service.scan(
        VALID_OPENAPI.to_string(),
        Some("oas"),
        vec!["team-a".to_string()],
        false,
    )?;
    service.scan(
        VALID_OPENAPI.to_string(),
        Some("oas"),
        vec!["team-b".to_string()],
        false,
    )?;

    let results = service.get_scans(None, &["team-a".to_string()]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, first.id);
    Ok(())
}

#[tokio::test]
async fn list_results_filter_by_status() -> anyhow::Result<()> {
    let service = service_with_oas().await;
    service.scan(VALID_OPENAPI.to_string(), Some("oas"), Vec::new(), false)?;
    // An unparseable document persists as invalid, never as an error.
    service.scan("{broken: [".to_string(), Some("oas"), Vec::new(), false)?;

    assert_eq!(service.get_scans(Some(ScanStatus::Valid), &[]).len(), 1);
    assert_eq!(service.get_scans(Some(ScanStatus::Invalid), &[]).len(), 1);
    assert_eq!(service.get_scans(None, &[]).len(), 2);
    Ok(())
}

#[tokio::test]
async fn documents_are_elided_except_on_request() -> anyhow::Result<()> {
    let service = service_with_oas().await;

    let stripped = service.scan(VALID_OPENAPI.to_string(), Some("oas"), Vec::new(), false)?;
    assert!(stripped.document.is_none());

    let included = service.scan(VALID_OPENAPI.to_string(), Some("oas"), Vec::new(), true)?;
    assert_eq!(included.document.as_deref(), Some(VALID_OPENAPI));

    // Point lookups honor the flag; list results never include documents.
    assert!(service.get_scan(&stripped.id, false)?.document.is_none());
    assert_eq!(
        service.get_scan(&stripped.id, true)?.document.as_deref(),
        Some(VALID_OPENAPI)
    );
    assert!(service
        .get_scans(None, &[])
        .iter()
        .all(|scan| scan.document.is_none()));

    // The raw document stays retrievable through its own accessor.
    assert_eq!(service.get_document(&stripped.id)?, VALID_OPENAPI);
    Ok(())
}

#[tokio::test]
async fn expired_scans_vanish_within_a_sweep_interval() -> anyhow::Result<()> {
    let service = service_with_oas()
        .await
        .with_availability_window(Duration::ZERO);
    let sweeper = service.store().spawn_sweeper(Duration::from_millis(20));

    let scan = service.scan(VALID_OPENAPI.to_string(), Some("oas"), Vec::new(), false)?;
    tokio::time::sleep(Duration::from_millis(120)).await;

    let err = service
        .get_scan(&scan.id, false)
        .expect_err("record expired and swept");
    assert!(matches!(err, ScanError::ScanNotFound { .. }));
    assert!(service.get_scans(None, &[]).is_empty());

    sweeper.abort();
    Ok(())
}

#[tokio::test]
async fn provenance_hash_survives_a_failed_refresh() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rules.json");
    fs::write(&path, r#"{"rules": {"a": "warn"}}"#)?;

    let rulesets = Arc::new(RulesetRegistry::new(FetchClient::new()));
    rulesets
        .register(
            "oas",
            RulesetSource::Url(format!("file://{}", path.display())),
            None,
        )
        .await;
    let good_hash = rulesets.resolve("oas")?.hash.clone();

    fs::remove_file(&path)?;
    rulesets.refresh("oas").await;

    let service = ScanService::new(
        rulesets,
        Arc::new(SchemaRegistry::new(FetchClient::new())),
        LintEngine::new(Arc::new(QuietRuleEngine)),
        Arc::new(ScanStore::new()),
    );

    // Stale-but-available: the scan still runs and records the last good
    // hash as provenance.
    let scan = service.scan(VALID_OPENAPI.to_string(), Some("oas"), Vec::new(), false)?;
    assert_eq!(scan.status, ScanStatus::Valid);
    assert_eq!(Some(scan.ruleset.hash), good_hash);
    Ok(())
}

#[tokio::test]
async fn probes_reflect_registry_health() {
    let service = service_with_oas().await;
    let probes = service.probes();
    assert_eq!(probes.ready().status, ProbeStatus::Up);
    assert_eq!(probes.live().status, ProbeStatus::Up);
    assert_eq!(probes.startup().status, ProbeStatus::Up);

    // A ruleset that fails to load flips every probe group down.
    service
        .rulesets()
        .register(
            "broken",
            RulesetSource::Url("file:///does/not/exist.json".to_string()),
            None,
        )
        .await;

    let report = service.probes().ready();
    assert_eq!(report.status, ProbeStatus::Down);
    assert!(report
        .components
        .iter()
        .any(|component| component.name == "rulesets"
            && component.status == ProbeStatus::Down));
}

#[tokio::test]
async fn from_config_stands_up_a_working_core() -> anyhow::Result<()> {
    init_tracing();
    let mut config = AppConfig::default();
    config.scan.sweep_interval_secs = 1;
    config.rulesets.push(apiscan_config::RulesetSourceConfig {
        name: "oas".to_string(),
        url: None,
        source: Some(r#"{"rules": {}}"#.to_string()),
        refresh_interval_secs: None,
    });

    let (service, _sweeper) =
        ScanService::from_config(&config, Arc::new(QuietRuleEngine), VerdictPolicy::RulesOnly)
            .await;

    assert_eq!(service.rulesets().list(), vec!["oas".to_string()]);
    let scan = service.scan(VALID_OPENAPI.to_string(), None, Vec::new(), false)?;
    assert_eq!(scan.status, ScanStatus::Valid);
    Ok(())
}
