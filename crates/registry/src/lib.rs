//! Ruleset and schema registries for API description validation.
//!
//! This crate owns everything that has to be fetched before a document can be
//! validated: named lint rulesets (from a URL or an inline source) and
//! versioned JSON schemas for OpenAPI/AsyncAPI documents. Remote artifacts are
//! bundled into self-contained documents, content-hashed for cache
//! validators, and kept in concurrent maps of atomically-replaced snapshots.
//!
//! # Examples
//!
//! ```no_run
//! use apiscan_registry::{FetchClient, RulesetRegistry, RulesetSource};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = Arc::new(RulesetRegistry::new(FetchClient::new()));
//! registry
//!     .register("oas", RulesetSource::Url("https://rules.example.com/oas.json".into()), None)
//!     .await;
//!
//! let entry = registry.resolve("oas").expect("registered above");
//! println!("hash: {:?}", entry.hash);
//! # }
//! ```

mod bundle;
mod error;
mod fetch;
mod hash;
mod ruleset;
mod schema;

pub use bundle::{bundle_ruleset, bundle_schema, BundleError};
pub use error::{RegistryError, Result};
pub use fetch::{FetchClient, FetchError};
pub use hash::{canonical_hash, content_hash};
pub use ruleset::{RulesetEntry, RulesetRegistry, RulesetSource};
pub use schema::{SchemaEntry, SchemaRegistry, SchemaType};
