//! The persisted scan record and its serialized form.

use apiscan_linter::Violation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a scan.
///
/// The synchronous flow only ever persists `valid` or `invalid`; `pending`
/// and `failed` are reserved for flows that defer or abort evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Valid,
    Invalid,
    Failed,
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "valid" => Ok(Self::Valid),
            "invalid" => Ok(Self::Invalid),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown scan status '{other}'")),
        }
    }
}

/// Provenance of the ruleset a scan ran against: its name and the content
/// hash the registry held at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetRef {
    pub name: String,
    pub hash: String,
}

/// Aggregated counts and verdict derived from the lint report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInfo {
    pub valid: bool,
    pub infos: u32,
    pub warnings: u32,
    pub errors: u32,
}

/// One persisted validation run.
///
/// Immutable after creation; `available_until` is fixed at
/// `created_at + availability window` and never extended. The original
/// input document is retained in the store but elided from responses
/// unless explicitly requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub tags: Vec<String>,
    pub ruleset: RulesetRef,
    pub status: ScanStatus,
    pub created_at: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
    pub info: ScanInfo,
    pub violations: Vec<Violation>,
}

impl Scan {
    /// A copy with the original input stripped.
    #[must_use]
    pub fn without_document(&self) -> Self {
        let mut copy = self.clone();
        copy.document = None;
        copy
    }

    /// Whether this record is past its availability window.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.available_until
    }
}
