//! Custom lookup registry.
//!
//! Lookups beyond the built-in set can be registered by name and then used
//! anywhere a lookup name is accepted: in `Q::kwarg("field__name", ...)` and
//! as a forced lookup on a hybrid expression.
//!
//! # Examples
//!
//! ```
//! use hybrid_rs_db::query::custom_lookups::{register_lookup, custom_lookup, CustomLookup};
//!
//! register_lookup(CustomLookup::new("ne", "{column} <> {value}"));
//! assert!(custom_lookup("ne").is_some());
//! ```

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

/// A custom lookup that produces a boolean SQL expression.
///
/// The `sql_template` uses `{column}` and `{value}` as placeholders, for
/// example `"{column} <> {value}"` or `"ABS({column} - {value}) < 1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLookup {
    /// The name of this lookup (e.g., "ne").
    pub name: String,
    /// The SQL template with `{column}` and `{value}` placeholders.
    pub sql_template: String,
}

impl CustomLookup {
    /// Creates a new custom lookup.
    pub fn new(name: impl Into<String>, sql_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_template: sql_template.into(),
        }
    }

    /// Renders this lookup for an already-compiled column and value.
    pub fn render(&self, column_sql: &str, value_sql: &str) -> String {
        self.sql_template
            .replace("{column}", column_sql)
            .replace("{value}", value_sql)
    }
}

/// A name-keyed store of custom lookups.
#[derive(Debug, Clone, Default)]
pub struct LookupRegistry {
    lookups: HashMap<String, CustomLookup>,
}

impl LookupRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a lookup, replacing any previous one with the same name.
    pub fn register(&mut self, lookup: CustomLookup) {
        self.lookups.insert(lookup.name.clone(), lookup);
    }

    /// Returns the lookup registered under `name`.
    pub fn get(&self, name: &str) -> Option<&CustomLookup> {
        self.lookups.get(name)
    }

    /// Returns the number of registered lookups.
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }
}

/// Returns the process-wide lookup registry.
pub fn global_registry() -> &'static RwLock<LookupRegistry> {
    static REGISTRY: OnceLock<RwLock<LookupRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(LookupRegistry::new()))
}

/// Registers a lookup in the global registry.
pub fn register_lookup(lookup: CustomLookup) {
    global_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(lookup);
}

/// Looks up a lookup in the global registry by name.
pub fn custom_lookup(name: &str) -> Option<CustomLookup> {
    global_registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let lookup = CustomLookup::new("ne", "{column} <> {value}");
        assert_eq!(lookup.render("\"t\".\"age\"", "?"), "\"t\".\"age\" <> ?");
    }

    #[test]
    fn test_registry_replace() {
        let mut registry = LookupRegistry::new();
        assert!(registry.is_empty());
        registry.register(CustomLookup::new("near", "ABS({column} - {value}) < 1"));
        registry.register(CustomLookup::new("near", "ABS({column} - {value}) < 2"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("near").unwrap().sql_template.ends_with("< 2"));
    }

    #[test]
    fn test_global_registry() {
        register_lookup(CustomLookup::new("test_global_ne", "{column} <> {value}"));
        assert!(custom_lookup("test_global_ne").is_some());
        assert!(custom_lookup("test_global_missing").is_none());
    }
}
