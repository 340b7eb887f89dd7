//! Settings for hybrid-rs.
//!
//! This module provides the [`Settings`] struct, which holds all
//! configuration, and [`LazySettings`], a globally-accessible,
//! lazily-initialized settings instance.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{HybridError, HybridResult};

/// Prefix prepended to every generated annotation alias.
pub const DEFAULT_ALIAS_PREFIX: &str = "hybrid_";

/// Number of random lowercase letters in a generated annotation alias.
pub const DEFAULT_ALIAS_LENGTH: usize = 10;

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The database engine (e.g. `hybrid_rs.db.backends.sqlite3`).
    pub engine: String,
    /// The database name (or file path for `SQLite`, `:memory:` for an
    /// in-memory database).
    pub name: String,
    /// Additional engine-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "hybrid_rs.db.backends.sqlite3".to_string(),
            name: ":memory:".to_string(),
            options: HashMap::new(),
        }
    }
}

/// How annotation aliases are generated for hybrid filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSettings {
    /// Constant tag placed before the random token.
    pub prefix: String,
    /// Length of the random token.
    pub length: usize,
}

impl Default for AliasSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ALIAS_PREFIX.to_string(),
            length: DEFAULT_ALIAS_LENGTH,
        }
    }
}

/// All hybrid-rs configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enables human-readable logging.
    pub debug: bool,

    /// Database connections keyed by alias. `default` is always present in
    /// the default settings.
    pub databases: HashMap<String, DatabaseSettings>,

    /// Annotation alias generation.
    pub aliases: AliasSettings,

    /// The tracing filter directive (e.g. "info", "hybrid_rs_attributes=debug").
    pub log_level: String,

    /// Arbitrary application settings.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert("default".to_string(), DatabaseSettings::default());

        Self {
            debug: true,
            databases,
            aliases: AliasSettings::default(),
            log_level: "info".to_string(),
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the settings of the `default` database.
    pub fn default_database(&self) -> HybridResult<&DatabaseSettings> {
        self.databases.get("default").ok_or_else(|| {
            HybridError::ConfigurationError("No 'default' database configured".to_string())
        })
    }
}

/// A globally-accessible settings cell that is configured once at startup.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Succeeds only once.
    pub fn configure(&self, settings: Settings) -> HybridResult<()> {
        self.inner.set(settings).map_err(|_| {
            HybridError::ConfigurationError("Settings have already been configured".to_string())
        })
    }

    /// Returns the configured settings, if any.
    pub fn get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns the configured settings, initializing them with the defaults
    /// if nothing was configured yet.
    pub fn get_or_default(&self) -> &Settings {
        self.inner.get_or_init(Settings::default)
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();
