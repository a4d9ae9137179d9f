//! Named ruleset registry with per-entry background refresh.

use crate::bundle::{self, BundleError};
use crate::error::{RegistryError, Result};
use crate::fetch::FetchClient;
use crate::hash;
use dashmap::DashMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Serialize a shared bundled document by content, not by pointer.
pub(crate) fn serialize_shared<S: Serializer>(
    value: &Option<Arc<Value>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(document) => serializer.serialize_some(document.as_ref()),
        None => serializer.serialize_none(),
    }
}

/// Where a ruleset's source text comes from.
#[derive(Debug, Clone)]
pub enum RulesetSource {
    /// Fetched over HTTP(S) or from a `file://` path.
    Url(String),
    /// Provided directly at registration time.
    Inline(String),
}

/// One registered ruleset.
///
/// Entries are immutable snapshots: a refresh builds a complete replacement
/// and swaps it into the registry map, so concurrent readers observe either
/// the old or the new entry, never a torn one. After a failed refresh the
/// previous good `ruleset`, `raw` and `hash` are retained so validation can
/// keep serving stale-but-usable state.
#[derive(Debug, Clone, Serialize)]
pub struct RulesetEntry {
    pub name: String,
    pub ok: bool,
    /// The bundled, self-contained ruleset document.
    #[serde(serialize_with = "serialize_shared")]
    pub ruleset: Option<Arc<Value>>,
    /// Raw source text as fetched or provided.
    pub raw: Option<String>,
    /// Content hash of the bundled document's canonical JSON.
    pub hash: Option<String>,
    pub error: Option<String>,
    #[serde(skip)]
    source: RulesetSource,
    #[serde(skip)]
    refresh_interval: Option<Duration>,
}

impl RulesetEntry {
    /// The configured background refresh cadence, if any.
    #[must_use]
    pub const fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }
}

/// Registry of named rulesets.
///
/// Registration performs the initial fetch + bundle synchronously; entries
/// with a refresh interval get their own background task re-running the
/// fetch at that cadence. Refresh failures are absorbed into the entry's
/// health state and never surface to `resolve` callers beyond the
/// `Unavailable` signal.
pub struct RulesetRegistry {
    client: FetchClient,
    entries: DashMap<String, Arc<RulesetEntry>>,
    refresh_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for RulesetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesetRegistry")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl RulesetRegistry {
    #[must_use]
    pub fn new(client: FetchClient) -> Self {
        Self {
            client,
            entries: DashMap::new(),
            refresh_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Registers a ruleset and performs its initial load.
    ///
    /// A failed initial load stores a failed entry (there is no previous
    /// good state to fall back on) and is reported through health, not as an
    /// error here — a broken remote at startup is recoverable, not fatal.
    ///
    /// With `refresh_interval`, a background task re-runs the load at that
    /// cadence for the lifetime of the registry.
    #[tracing::instrument(skip_all, fields(ruleset = name))]
    pub async fn register(
        self: &Arc<Self>,
        name: &str,
        source: RulesetSource,
        refresh_interval: Option<Duration>,
    ) {
        let name = name.to_string();
        let entry = match self.load(&name, &source, refresh_interval).await {
            Ok(entry) => {
                tracing::info!(ruleset = %name, "Loaded ruleset");
                entry
            }
            Err(e) => {
                tracing::warn!(ruleset = %name, error = %e, "Failed to load ruleset");
                RulesetEntry {
                    name: name.clone(),
                    ok: false,
                    ruleset: None,
                    raw: None,
                    hash: None,
                    error: Some(e.to_string()),
                    source: source.clone(),
                    refresh_interval,
                }
            }
        };
        self.entries.insert(name.clone(), Arc::new(entry));

        if let Some(period) = refresh_interval {
            self.spawn_refresh_task(name, period);
        }
    }

    /// Re-fetches and re-bundles an entry.
    ///
    /// On success the whole entry is replaced; on failure the entry is
    /// marked failed with the error message while the prior good state is
    /// kept untouched (serve-stale policy).
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, name: &str) {
        let Some(current) = self.entries.get(name).map(|e| Arc::clone(&e)) else {
            tracing::debug!(ruleset = name, "Refresh requested for unknown ruleset");
            return;
        };

        tracing::info!(ruleset = name, "Refreshing ruleset");
        match self
            .load(name, &current.source, current.refresh_interval)
            .await
        {
            Ok(entry) => {
                self.entries.insert(name.to_string(), Arc::new(entry));
            }
            Err(e) => {
                tracing::warn!(ruleset = name, error = %e, "Failed to refresh ruleset");
                let failed = RulesetEntry {
                    name: current.name.clone(),
                    ok: false,
                    ruleset: current.ruleset.clone(),
                    raw: current.raw.clone(),
                    hash: current.hash.clone(),
                    error: Some(e.to_string()),
                    source: current.source.clone(),
                    refresh_interval: current.refresh_interval,
                };
                self.entries.insert(name.to_string(), Arc::new(failed));
            }
        }
    }

    /// Resolves a ruleset for evaluation.
    ///
    /// # Errors
    ///
    /// `RulesetNotFound` for unknown names; `RulesetUnavailable` when the
    /// entry is failed and holds no stale state. A failed entry that still
    /// holds its last good ruleset resolves normally.
    pub fn resolve(&self, name: &str) -> Result<Arc<RulesetEntry>> {
        let entry = self
            .entries
            .get(name)
            .map(|e| Arc::clone(&e))
            .ok_or_else(|| RegistryError::RulesetNotFound {
                name: name.to_string(),
            })?;

        if !entry.ok && entry.ruleset.is_none() {
            return Err(RegistryError::RulesetUnavailable {
                name: name.to_string(),
                message: entry
                    .error
                    .clone()
                    .unwrap_or_else(|| "ruleset failed to load".to_string()),
            });
        }

        Ok(entry)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Sorted names of all registered rulesets.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshots of all entries, for configuration listings.
    #[must_use]
    pub fn entries(&self) -> Vec<Arc<RulesetEntry>> {
        self.entries.iter().map(|e| Arc::clone(&e)).collect()
    }

    /// True iff every registered entry's most recent load succeeded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.entries.iter().all(|e| e.ok)
    }

    async fn load(
        &self,
        name: &str,
        source: &RulesetSource,
        refresh_interval: Option<Duration>,
    ) -> std::result::Result<RulesetEntry, BundleError> {
        let raw = match source {
            RulesetSource::Url(url) => self.client.fetch(url).await?,
            RulesetSource::Inline(text) => text.clone(),
        };
        let bundled = bundle::bundle_ruleset(&self.client, &raw).await?;
        let hash = hash::canonical_hash(&bundled);

        Ok(RulesetEntry {
            name: name.to_string(),
            ok: true,
            ruleset: Some(Arc::new(bundled)),
            raw: Some(raw),
            hash: Some(hash),
            error: None,
            source: source.clone(),
            refresh_interval,
        })
    }

    fn spawn_refresh_task(self: &Arc<Self>, name: String, period: Duration) {
        let registry = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; registration already
            // performed the initial load.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.refresh(&name).await;
            }
        });
        if let Ok(mut tasks) = self.refresh_tasks.lock() {
            tasks.push(handle);
        }
    }
}

impl Drop for RulesetRegistry {
    fn drop(&mut self) {
        if let Ok(tasks) = self.refresh_tasks.lock() {
            for task in tasks.iter() {
                task.abort();
            }
        }
    }
}
