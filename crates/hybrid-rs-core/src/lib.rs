//! # hybrid-rs-core
//!
//! Foundation types shared by every hybrid-rs crate: the error taxonomy,
//! settings and their loaders, and tracing-based logging setup.
//!
//! ## Modules
//!
//! - [`error`] - [`HybridError`] and the [`HybridResult`] alias
//! - [`settings`] - Framework settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML/JSON and the environment
//! - [`logging`] - Tracing subscriber setup

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{ErrorCategory, HybridError, HybridResult};
pub use settings::{AliasSettings, DatabaseSettings, Settings, SETTINGS};
