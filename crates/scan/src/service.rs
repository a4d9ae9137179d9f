//! The scan orchestrator: ties registries, engine and store together.

use crate::model::{RulesetRef, Scan, ScanInfo, ScanStatus};
use crate::probes::{HealthCheck, ProbeSet};
use crate::store::{ScanStore, SweeperHandle};
use apiscan_config::AppConfig;
use apiscan_linter::{LintEngine, RuleEngine, VerdictPolicy};
use apiscan_registry::{
    FetchClient, RulesetRegistry, RulesetSource, SchemaRegistry, SchemaType,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// The request named a ruleset the registry does not know. Checked
    /// before a scan id exists, so no partial record is ever created.
    #[error("No ruleset called '{name}' exists.")]
    RulesetNotFound { name: String },

    /// The scan id is unknown — or the record has already been evicted.
    #[error("Scan not found")]
    ScanNotFound { id: Uuid },
}

/// Orchestrates scans: id generation, engine invocation, persistence and
/// point/list queries.
#[derive(Debug)]
pub struct ScanService {
    rulesets: Arc<RulesetRegistry>,
    schemas: Arc<SchemaRegistry>,
    engine: LintEngine,
    store: Arc<ScanStore>,
    default_ruleset: String,
    availability_window: chrono::Duration,
}

impl ScanService {
    #[must_use]
    pub fn new(
        rulesets: Arc<RulesetRegistry>,
        schemas: Arc<SchemaRegistry>,
        engine: LintEngine,
        store: Arc<ScanStore>,
    ) -> Self {
        Self {
            rulesets,
            schemas,
            engine,
            store,
            default_ruleset: "oas".to_string(),
            availability_window: chrono::Duration::seconds(3600),
        }
    }

    /// Stands the whole core up from one configuration object: fetch
    /// client, registries (with their configured rulesets and schemas
    /// registered), store and sweeper.
    ///
    /// The sweeper handle must be kept alive for expiry to work; dropping
    /// it stops the background sweep.
    pub async fn from_config(
        config: &AppConfig,
        rule_engine: Arc<dyn RuleEngine>,
        policy: VerdictPolicy,
    ) -> (Self, SweeperHandle) {
        let client = FetchClient::new()
            .with_timeout(Duration::from_secs(config.fetch.timeout_secs))
            .with_connect_timeout(Duration::from_secs(config.fetch.connect_timeout_secs))
            .with_retries(config.fetch.retries);

        let rulesets = Arc::new(RulesetRegistry::new(client.clone()));
        for entry in &config.rulesets {
            let source = if let Some(url) = &entry.url {
                RulesetSource::Url(url.clone())
            } else if let Some(source) = &entry.source {
                RulesetSource::Inline(source.clone())
            } else {
                tracing::warn!(ruleset = %entry.name, "Ruleset config has neither url nor source");
                continue;
            };
            rulesets
                .register(
                    &entry.name,
                    source,
                    entry.refresh_interval_secs.map(Duration::from_secs),
                )
                .await;
        }

        let schemas = Arc::new(SchemaRegistry::new(client));
        for entry in &config.schemas {
            match entry.schema_type.parse::<SchemaType>() {
                Ok(schema_type) => {
                    schemas
                        .register_from_url(schema_type, &entry.version, &entry.url)
                        .await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, version = %entry.version, "Skipping schema entry");
                }
            }
        }

        let store = Arc::new(ScanStore::new());
        let sweeper = store.spawn_sweeper(Duration::from_secs(config.scan.sweep_interval_secs));

        let service = Self::new(
            rulesets,
            schemas,
            LintEngine::new(rule_engine).with_policy(policy),
            store,
        )
        .with_default_ruleset(config.scan.default_ruleset.clone())
        .with_availability_window(Duration::from_secs(config.scan.availability_window_secs));

        (service, sweeper)
    }

    /// Ruleset used when a scan request names none.
    #[must_use]
    pub fn with_default_ruleset(mut self, name: impl Into<String>) -> Self {
        self.default_ruleset = name.into();
        self
    }

    /// How long scan records stay retrievable. Fixed per record at
    /// creation, never extended.
    #[must_use]
    pub fn with_availability_window(mut self, window: Duration) -> Self {
        self.availability_window =
            chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        self
    }

    /// Runs a scan and persists the outcome.
    ///
    /// Tags are stored as given — the boundary appends the caller identity
    /// as an ordinary tag before calling in. The returned copy has the
    /// input document stripped unless `include_document` is set.
    ///
    /// # Errors
    ///
    /// `RulesetNotFound` when the named (or default) ruleset is unknown,
    /// checked before an id is generated. Every other condition — broken
    /// registry entries, unparseable documents, rule-engine failures —
    /// still yields a persisted scan with explanatory violations.
    #[tracing::instrument(skip(self, document, tags))]
    pub fn scan(
        &self,
        document: String,
        ruleset_name: Option<&str>,
        tags: Vec<String>,
        include_document: bool,
    ) -> Result<Scan> {
        let ruleset_name = ruleset_name.unwrap_or(&self.default_ruleset);
        if !self.rulesets.contains(ruleset_name) {
            return Err(ScanError::RulesetNotFound {
                name: ruleset_name.to_string(),
            });
        }

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let available_until = created_at
            .checked_add_signed(self.availability_window)
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);

        // Provenance snapshot at scan time. An entry without a usable hash
        // (unavailable, never loaded) records an empty one.
        let hash = self
            .rulesets
            .resolve(ruleset_name)
            .ok()
            .and_then(|entry| entry.hash.clone())
            .unwrap_or_default();

        let report = self
            .engine
            .run(&document, ruleset_name, &self.rulesets, &self.schemas);
        let status = if report.valid {
            ScanStatus::Valid
        } else {
            ScanStatus::Invalid
        };
        tracing::info!(
            scan = %id,
            ruleset = ruleset_name,
            %status,
            errors = report.errors,
            warnings = report.warnings,
            "Scan complete"
        );

        let scan = Scan {
            id,
            document: Some(document),
            tags,
            ruleset: RulesetRef {
                name: ruleset_name.to_string(),
                hash,
            },
            status,
            created_at,
            available_until,
            info: ScanInfo {
                valid: report.valid,
                infos: report.infos,
                warnings: report.warnings,
                errors: report.errors,
            },
            violations: report.violations,
        };
        self.store.put(scan.clone());

        Ok(if include_document {
            scan
        } else {
            scan.without_document()
        })
    }

    /// Fetches one scan by id.
    ///
    /// # Errors
    ///
    /// `ScanNotFound` when the id is unknown or the record was evicted.
    pub fn get_scan(&self, id: &Uuid, include_document: bool) -> Result<Scan> {
        let scan = self
            .store
            .get(id)
            .ok_or(ScanError::ScanNotFound { id: *id })?;
        Ok(if include_document {
            scan
        } else {
            scan.without_document()
        })
    }

    /// The retained original input document of a scan.
    ///
    /// # Errors
    ///
    /// `ScanNotFound` when the id is unknown or the record was evicted.
    pub fn get_document(&self, id: &Uuid) -> Result<String> {
        self.store
            .get(id)
            .and_then(|scan| scan.document)
            .ok_or(ScanError::ScanNotFound { id: *id })
    }

    /// Lists scans matching an optional status and every requested tag
    /// (AND semantics). Documents are always stripped from list results.
    #[must_use]
    pub fn get_scans(&self, status: Option<ScanStatus>, tags: &[String]) -> Vec<Scan> {
        self.store
            .get_all()
            .into_iter()
            .filter(|scan| status.is_none_or(|wanted| scan.status == wanted))
            .filter(|scan| tags.iter().all(|tag| scan.tags.contains(tag)))
            .map(|scan| scan.without_document())
            .collect()
    }

    /// Health checks for both registries, registered on all probe groups —
    /// ready, live and startup each report the same two components.
    #[must_use]
    pub fn probes(&self) -> ProbeSet {
        let rulesets = Arc::clone(&self.rulesets);
        let schemas = Arc::clone(&self.schemas);
        ProbeSet::new()
            .with_check(HealthCheck::new("rulesets", move || rulesets.is_healthy()))
            .with_check(HealthCheck::new("schemas", move || schemas.is_healthy()))
    }

    #[must_use]
    pub fn rulesets(&self) -> &Arc<RulesetRegistry> {
        &self.rulesets
    }

    #[must_use]
    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ScanStore> {
        &self.store
    }
}
