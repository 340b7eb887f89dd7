//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `HYBRID_DEBUG` | `debug` |
//! | `HYBRID_LOG_LEVEL` | `log_level` |
//! | `HYBRID_DATABASE_NAME` | `databases.default.name` |
//! | `HYBRID_ALIAS_PREFIX` | `aliases.prefix` |
//! | `HYBRID_ALIAS_LENGTH` | `aliases.length` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use hybrid_rs_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/hybrid.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::{HybridError, HybridResult};
use crate::settings::{DatabaseSettings, Settings};

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> HybridResult<Settings> {
    // TOML is converted to JSON and deep-merged over the serialized defaults,
    // so partial tables keep the default values of their missing keys.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| HybridError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> HybridResult<Settings> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> HybridResult<Settings> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> HybridResult<Settings> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| HybridError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> HybridResult<Settings> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> HybridResult<Settings> {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Applies `HYBRID_*` environment variable overrides to a settings struct.
pub fn apply_env_overrides(settings: &mut Settings) -> HybridResult<()> {
    apply_overrides_from(settings, |key| std::env::var(key).ok())
}

/// Applies overrides using an arbitrary variable lookup.
///
/// [`apply_env_overrides`] calls this with `std::env::var`; tests pass a
/// map lookup instead so they never mutate the process environment.
pub fn apply_overrides_from(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> HybridResult<()> {
    if let Some(val) = lookup("HYBRID_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("HYBRID_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("HYBRID_DATABASE_NAME") {
        settings
            .databases
            .entry("default".to_string())
            .or_insert_with(DatabaseSettings::default)
            .name = val;
    }

    if let Some(val) = lookup("HYBRID_ALIAS_PREFIX") {
        settings.aliases.prefix = val;
    }

    if let Some(val) = lookup("HYBRID_ALIAS_LENGTH") {
        settings.aliases.length = val.trim().parse().map_err(|e| {
            HybridError::ConfigurationError(format!("Invalid HYBRID_ALIAS_LENGTH '{val}': {e}"))
        })?;
    }

    Ok(())
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> HybridResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        HybridError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, format: &str) -> HybridResult<Settings> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        HybridError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        HybridError::ConfigurationError(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
