//! Versioned JSON-schema registry for API description documents.

use crate::bundle::{self, BundleError};
use crate::error::{RegistryError, Result};
use crate::fetch::FetchClient;
use crate::hash;
use crate::ruleset::serialize_shared;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// The kind of API description a schema validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Openapi,
    Asyncapi,
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Openapi => write!(f, "openapi"),
            Self::Asyncapi => write!(f, "asyncapi"),
        }
    }
}

impl FromStr for SchemaType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "openapi" => Ok(Self::Openapi),
            "asyncapi" => Ok(Self::Asyncapi),
            other => Err(format!("unknown schema type '{other}'")),
        }
    }
}

/// One registered schema, keyed by (type, version).
///
/// The hash is computed only over the fully dereferenced bundled document,
/// never the raw fetch, so structurally identical schemas from different
/// sources collapse to the same digest.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaEntry {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub version: String,
    pub ok: bool,
    #[serde(serialize_with = "serialize_shared")]
    pub schema: Option<Arc<Value>>,
    pub hash: Option<String>,
    pub error: Option<String>,
    #[serde(skip)]
    url: String,
}

/// Registry of named (type, version) schemas.
///
/// Registration downloads and bundles eagerly; failures degrade the entry
/// instead of erroring the call. There is no periodic refresh in the base
/// contract, but [`SchemaRegistry::refresh`] exists so a cadence can be
/// added later without breaking callers.
pub struct SchemaRegistry {
    client: FetchClient,
    entries: DashMap<(SchemaType, String), Arc<SchemaEntry>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl SchemaRegistry {
    #[must_use]
    pub fn new(client: FetchClient) -> Self {
        Self {
            client,
            entries: DashMap::new(),
        }
    }

    /// Downloads, bundles and registers a schema.
    ///
    /// On any network or parse error a failed entry carrying the error
    /// message is stored instead; the failure is visible through
    /// [`SchemaRegistry::find`] and health, never thrown here.
    #[tracing::instrument(skip(self, url))]
    pub async fn register_from_url(&self, schema_type: SchemaType, version: &str, url: &str) {
        let entry = match self.download(schema_type, version, url).await {
            Ok(entry) => {
                tracing::info!(%schema_type, version, "Loaded schema");
                entry
            }
            Err(e) => {
                tracing::warn!(%schema_type, version, error = %e, "Failed to load schema");
                SchemaEntry {
                    schema_type,
                    version: version.to_string(),
                    ok: false,
                    schema: None,
                    hash: None,
                    error: Some(format!(
                        "Failed to download schema {schema_type} {version} from {url}: {e}"
                    )),
                    url: url.to_string(),
                }
            }
        };
        self.entries
            .insert((schema_type, version.to_string()), Arc::new(entry));
    }

    /// Re-downloads and re-bundles an already registered schema.
    ///
    /// Mirrors ruleset refresh semantics: a failure marks the entry failed
    /// but keeps the previous good document and hash.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, schema_type: SchemaType, version: &str) {
        let key = (schema_type, version.to_string());
        let Some(current) = self.entries.get(&key).map(|e| Arc::clone(&e)) else {
            tracing::debug!(%schema_type, version, "Refresh requested for unknown schema");
            return;
        };

        match self.download(schema_type, version, &current.url).await {
            Ok(entry) => {
                self.entries.insert(key, Arc::new(entry));
            }
            Err(e) => {
                tracing::warn!(%schema_type, version, error = %e, "Failed to refresh schema");
                let failed = SchemaEntry {
                    schema_type,
                    version: version.to_string(),
                    ok: false,
                    schema: current.schema.clone(),
                    hash: current.hash.clone(),
                    error: Some(e.to_string()),
                    url: current.url.clone(),
                };
                self.entries.insert(key, Arc::new(failed));
            }
        }
    }

    /// Looks up a schema for structural validation.
    ///
    /// # Errors
    ///
    /// `SchemaNotFound` when the pair was never registered; `SchemaInvalid`
    /// when it is registered but its load failed. Schema validation
    /// correctness cannot tolerate partial state, so unlike ruleset
    /// resolution this never serves a stale document.
    pub fn find(&self, schema_type: SchemaType, version: &str) -> Result<Arc<SchemaEntry>> {
        let entry = self
            .entries
            .get(&(schema_type, version.to_string()))
            .map(|e| Arc::clone(&e))
            .ok_or(RegistryError::SchemaNotFound {
                schema_type,
                version: version.to_string(),
            })?;

        if !entry.ok {
            return Err(RegistryError::SchemaInvalid {
                message: entry
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("Schema {schema_type} {version} failed to load")),
            });
        }

        Ok(entry)
    }

    #[must_use]
    pub fn contains(&self, schema_type: SchemaType, version: &str) -> bool {
        self.entries
            .contains_key(&(schema_type, version.to_string()))
    }

    /// Sorted `type:version` keys of all registered schemas.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}:{}", e.key().0, e.key().1))
            .collect();
        keys.sort();
        keys
    }

    /// Snapshots of all entries, for configuration listings.
    #[must_use]
    pub fn entries(&self) -> Vec<Arc<SchemaEntry>> {
        self.entries.iter().map(|e| Arc::clone(&e)).collect()
    }

    /// True iff every registered entry's most recent load succeeded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.entries.iter().all(|e| e.ok)
    }

    async fn download(
        &self,
        schema_type: SchemaType,
        version: &str,
        url: &str,
    ) -> std::result::Result<SchemaEntry, BundleError> {
        let text = self.client.fetch(url).await?;
        let schema: Value =
            serde_json::from_str(&text).map_err(|e| BundleError::Parse(e.to_string()))?;
        let mut bundled = bundle::bundle_schema(&self.client, schema).await?;
        upgrade_self_identifier(&mut bundled);
        let hash = hash::canonical_hash(&bundled);

        Ok(SchemaEntry {
            schema_type,
            version: version.to_string(),
            ok: true,
            schema: Some(Arc::new(bundled)),
            hash: Some(hash),
            error: None,
            url: url.to_string(),
        })
    }
}

/// Upgrade insecure schemes in the schema's self-identifier before hashing,
/// so mirrors that only differ in the `id` scheme hash identically.
fn upgrade_self_identifier(schema: &mut Value) {
    for key in ["id", "$id"] {
        if let Some(Value::String(identifier)) = schema.get_mut(key) {
            if let Some(rest) = identifier.strip_prefix("http://") {
                *identifier = format!("https://{rest}");
            }
        }
    }
}
