//! Bundling of remotely-referenced rulesets and schemas.
//!
//! Bundling turns an artifact with cross-document references into one
//! self-contained document *before* it is hashed or evaluated, so content
//! hashes always describe the fully resolved artifact and evaluation never
//! performs network I/O.

use crate::fetch::{FetchClient, FetchError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Upper bound on transitive reference chains. A chain this deep is a cycle
/// or an authoring mistake either way.
const MAX_BUNDLE_DEPTH: usize = 16;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Reference depth limit exceeded while resolving '{0}'")]
    TooDeep(String),

    #[error("Circular reference to '{0}'")]
    Circular(String),

    #[error("Missing JSON pointer '{pointer}' in referenced document '{url}'")]
    MissingPointer { url: String, pointer: String },
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("file://")
}

/// Parse ruleset source text: JSON when it begins with `{`, YAML otherwise.
fn parse_source(text: &str) -> Result<Value, BundleError> {
    if text.as_bytes().first() == Some(&b'{') {
        serde_json::from_str(text).map_err(|e| BundleError::Parse(e.to_string()))
    } else {
        serde_yaml::from_str(text).map_err(|e| BundleError::Parse(e.to_string()))
    }
}

/// Resolves a ruleset's remote `extends` references into one self-contained
/// document.
///
/// Every `extends` entry that is itself a URL is fetched and bundled
/// recursively; the inherited `rules` are merged beneath the extending
/// document's own rules (local definitions win). Entries that are not URLs —
/// well-known ruleset names the rule engine knows how to interpret — are
/// kept in place, including names inherited from remote parents.
#[tracing::instrument(skip_all)]
pub async fn bundle_ruleset(client: &FetchClient, source: &str) -> Result<Value, BundleError> {
    let mut visited = HashSet::new();
    bundle_ruleset_from(client, source, &mut visited, 0).await
}

async fn bundle_ruleset_from(
    client: &FetchClient,
    source: &str,
    visited: &mut HashSet<String>,
    depth: usize,
) -> Result<Value, BundleError> {
    if depth > MAX_BUNDLE_DEPTH {
        return Err(BundleError::TooDeep("ruleset extends chain".to_string()));
    }

    let mut document = parse_source(source)?;
    let Some(extends) = document.get("extends").cloned() else {
        return Ok(document);
    };

    let entries = match extends {
        Value::String(name) => vec![Value::String(name)],
        Value::Array(items) => items,
        // Unrecognized extends shape: leave the document for the rule engine.
        _ => return Ok(document),
    };

    let mut retained: Vec<Value> = Vec::new();
    let mut merged_rules = serde_json::Map::new();

    for entry in entries {
        match entry {
            Value::String(url) if is_remote(&url) => {
                if !visited.insert(url.clone()) {
                    return Err(BundleError::Circular(url));
                }
                tracing::debug!(url = %url, "Resolving extended ruleset");
                let text = client.fetch(&url).await?;
                let parent = Box::pin(bundle_ruleset_from(client, &text, visited, depth + 1)).await?;
                if let Some(Value::Object(rules)) = parent.get("rules") {
                    for (name, rule) in rules {
                        merged_rules.insert(name.clone(), rule.clone());
                    }
                }
                // Names the parent itself kept (e.g. built-in ruleset ids)
                // stay visible to the rule engine.
                if let Some(Value::Array(names)) = parent.get("extends") {
                    for name in names {
                        if !retained.contains(name) {
                            retained.push(name.clone());
                        }
                    }
                }
            }
            other => {
                if !retained.contains(&other) {
                    retained.push(other);
                }
            }
        }
    }

    if let Some(Value::Object(own)) = document.get("rules") {
        for (name, rule) in own {
            merged_rules.insert(name.clone(), rule.clone());
        }
    }

    if let Value::Object(map) = &mut document {
        if retained.is_empty() {
            map.remove("extends");
        } else {
            map.insert("extends".to_string(), Value::Array(retained));
        }
        map.insert("rules".to_string(), Value::Object(merged_rules));
    }

    Ok(document)
}

/// Dereferences every external `$ref` in a schema document, producing one
/// self-contained schema.
///
/// Internal `#/...` references are left untouched — the evaluator resolves
/// those natively. Fragment pointers on external references
/// (`https://host/s.json#/definitions/x`) select into the fetched document.
/// Referenced documents are fetched once and reused; a genuine cycle trips
/// the depth guard.
#[tracing::instrument(skip_all)]
pub async fn bundle_schema(client: &FetchClient, schema: Value) -> Result<Value, BundleError> {
    let mut cache = HashMap::new();
    resolve_refs(client, schema, &mut cache, 0).await
}

fn external_ref(value: &Value) -> Option<&str> {
    let reference = value.get("$ref")?.as_str()?;
    is_remote(reference).then_some(reference)
}

async fn resolve_refs(
    client: &FetchClient,
    value: Value,
    cache: &mut HashMap<String, Value>,
    depth: usize,
) -> Result<Value, BundleError> {
    if depth > MAX_BUNDLE_DEPTH {
        return Err(BundleError::TooDeep("schema $ref chain".to_string()));
    }

    if let Some(reference) = external_ref(&value) {
        let reference = reference.to_string();
        let (url, pointer) = match reference.split_once('#') {
            Some((url, pointer)) => (url.to_string(), Some(pointer.to_string())),
            None => (reference, None),
        };

        let resolved = if let Some(document) = cache.get(&url) {
            document.clone()
        } else {
            tracing::debug!(url = %url, "Resolving external schema reference");
            let text = client.fetch(&url).await?;
            let parsed: Value =
                serde_json::from_str(&text).map_err(|e| BundleError::Parse(e.to_string()))?;
            let bundled = Box::pin(resolve_refs(client, parsed, cache, depth + 1)).await?;
            cache.insert(url.clone(), bundled.clone());
            bundled
        };

        return match pointer.as_deref() {
            None | Some("") => Ok(resolved),
            Some(pointer) => resolved
                .pointer(pointer)
                .cloned()
                .ok_or(BundleError::MissingPointer {
                    url,
                    pointer: pointer.to_string(),
                }),
        };
    }

    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key, Box::pin(resolve_refs(client, child, cache, depth)).await?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for child in items {
                out.push(Box::pin(resolve_refs(client, child, cache, depth)).await?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other),
    }
}
