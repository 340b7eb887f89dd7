//! Annotation alias generation.
//!
//! A [`HybridFilter`](crate::filter::HybridFilter) binds its expression to
//! the queryset under an alias before filtering on it. Unless the caller
//! forces one, the alias comes from an [`AliasSource`]: random tokens in
//! production ([`RandomAliases`]), a predictable sequence in tests
//! ([`SequentialAliases`]).

use hybrid_rs_core::settings::{AliasSettings, DEFAULT_ALIAS_LENGTH, DEFAULT_ALIAS_PREFIX};
use hybrid_rs_core::SETTINGS;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A source of annotation aliases.
pub trait AliasSource: Send + Sync + fmt::Debug {
    /// Returns a fresh alias.
    fn next_alias(&self) -> String;
}

/// Generates `<prefix><token>` aliases where the token is a fixed number of
/// random ASCII lowercase letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomAliases {
    prefix: String,
    length: usize,
}

impl RandomAliases {
    /// Creates a generator with the given prefix and token length.
    pub fn new(prefix: impl Into<String>, length: usize) -> Self {
        Self {
            prefix: prefix.into(),
            length,
        }
    }

    /// Creates a generator from alias settings.
    pub fn from_settings(settings: &AliasSettings) -> Self {
        Self::new(settings.prefix.clone(), settings.length)
    }

    /// Returns the prefix placed before every token.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for RandomAliases {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS_PREFIX, DEFAULT_ALIAS_LENGTH)
    }
}

impl AliasSource for RandomAliases {
    fn next_alias(&self) -> String {
        let mut rng = rand::thread_rng();
        let token: String = (0..self.length)
            .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
            .collect();
        format!("{}{token}", self.prefix)
    }
}

/// Generates `<prefix>1`, `<prefix>2`, ... in order.
#[derive(Debug, Default)]
pub struct SequentialAliases {
    prefix: String,
    counter: AtomicUsize,
}

impl SequentialAliases {
    /// Creates a sequence starting at 1.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicUsize::new(0),
        }
    }

    /// Creates a sequence using the prefix from alias settings.
    pub fn from_settings(settings: &AliasSettings) -> Self {
        Self::new(settings.prefix.clone())
    }
}

impl AliasSource for SequentialAliases {
    fn next_alias(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{n}", self.prefix)
    }
}

/// Returns the alias source new expressions start with: random aliases
/// configured from the global settings.
pub fn default_alias_source() -> Arc<dyn AliasSource> {
    Arc::new(RandomAliases::from_settings(
        &SETTINGS.get_or_default().aliases,
    ))
}
