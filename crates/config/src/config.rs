use serde::{Deserialize, Serialize};

/// Top-level configuration object.
///
/// Every section has complete defaults so a bare process comes up with a
/// working (if empty) core; see [`crate::load`] for the overlay order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanSettings,
    pub fetch: FetchSettings,
    pub rulesets: Vec<RulesetSourceConfig>,
    pub schemas: Vec<SchemaSourceConfig>,
}

/// Scan lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Ruleset used when a scan request names none.
    pub default_ruleset: String,
    /// How long a scan record stays retrievable after creation.
    pub availability_window_secs: u64,
    /// Cadence of the store sweeper, independent of any record's TTL.
    pub sweep_interval_secs: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            default_ruleset: "oas".to_string(),
            availability_window_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

/// Remote fetch settings shared by both registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retries: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            retries: 0,
        }
    }
}

/// One ruleset to register at startup, either from a URL or inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetSourceConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u64>,
}

/// One schema to register at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSourceConfig {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub version: String,
    pub url: String,
}
