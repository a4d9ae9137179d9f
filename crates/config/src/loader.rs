//! Overlay-based configuration loading.
//!
//! Order is fixed and reproduced exactly: defaults, then the environment,
//! then the profile file — file values win over environment values.

use crate::error::{ConfigError, Result};
use crate::AppConfig;
use regex::Regex;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

/// `${VAR}` / `${VAR:default}` placeholders in config files.
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w+)(?::([^}]*))?\}").expect("placeholder pattern is valid")
});

/// Environment variable selecting the config profile.
const PROFILE_VAR: &str = "APISCAN_ENV";

/// Loads the configuration for the profile named by `APISCAN_ENV`
/// (default `development`), reading `<config_dir>/<profile>.yaml`.
pub fn load(config_dir: &Path) -> Result<AppConfig> {
    let profile = env::var(PROFILE_VAR).unwrap_or_else(|_| "development".to_string());
    load_profile(config_dir, &profile)
}

/// Loads the configuration for an explicit profile.
#[tracing::instrument(fields(dir = %config_dir.display()))]
pub fn load_profile(config_dir: &Path, profile: &str) -> Result<AppConfig> {
    let mut config = AppConfig::default();
    apply_env(&mut config)?;

    let path = config_dir.join(format!("{profile}.yaml"));
    tracing::debug!(path = %path.display(), "Reading config file");
    let contents = std::fs::read_to_string(&path)?;
    apply_file(&mut config, &contents)?;

    tracing::info!(
        profile,
        rulesets = config.rulesets.len(),
        schemas = config.schemas.len(),
        "Config loaded"
    );
    Ok(config)
}

/// Overlays scalar settings from `APISCAN_*` environment variables.
pub fn apply_env(config: &mut AppConfig) -> Result<()> {
    if let Ok(value) = env::var("APISCAN_DEFAULT_RULESET") {
        config.scan.default_ruleset = value;
    }
    overlay_parsed(
        &mut config.scan.availability_window_secs,
        "APISCAN_AVAILABILITY_WINDOW_SECS",
    )?;
    overlay_parsed(
        &mut config.scan.sweep_interval_secs,
        "APISCAN_SWEEP_INTERVAL_SECS",
    )?;
    overlay_parsed(&mut config.fetch.timeout_secs, "APISCAN_FETCH_TIMEOUT_SECS")?;
    overlay_parsed(
        &mut config.fetch.connect_timeout_secs,
        "APISCAN_FETCH_CONNECT_TIMEOUT_SECS",
    )?;
    overlay_parsed(&mut config.fetch.retries, "APISCAN_FETCH_RETRIES")?;
    Ok(())
}

/// Overlays a YAML config file onto the current configuration.
///
/// `${VAR}` placeholders are interpolated from the environment first; a
/// variable without a value or default is an error. Mappings merge
/// recursively, scalars and sequences replace.
pub fn apply_file(config: &mut AppConfig, contents: &str) -> Result<()> {
    let interpolated = interpolate(contents)?;
    let overlay: serde_yaml::Value =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
    let current = serde_yaml::to_value(&*config).map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })?;

    let merged = merge(current, overlay);
    *config = serde_yaml::from_value(merged).map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })?;
    Ok(())
}

fn overlay_parsed<T>(target: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
{
    let Ok(raw) = env::var(key) else {
        return Ok(());
    };
    *target = raw.parse().map_err(|_| ConfigError::Invalid {
        message: format!("{key} must be a number, got '{raw}'"),
    })?;
    Ok(())
}

fn merge(base: serde_yaml::Value, overlay: serde_yaml::Value) -> serde_yaml::Value {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(mut base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            serde_yaml::Value::Mapping(base)
        }
        (_, overlay) => overlay,
    }
}

fn interpolate(contents: &str) -> Result<String> {
    let mut out = String::with_capacity(contents.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(contents) {
        let Some(placeholder) = captures.get(0) else {
            continue;
        };
        let name = &captures[1];
        let value = match env::var(name) {
            Ok(value) => value,
            Err(_) => captures
                .get(2)
                .map(|default| default.as_str().to_string())
                .ok_or_else(|| ConfigError::MissingEnvVar {
                    name: name.to_string(),
                })?,
        };
        out.push_str(&contents[last..placeholder.start()]);
        out.push_str(&value);
        last = placeholder.end();
    }
    out.push_str(&contents[last..]);
    Ok(out)
}
