//! Logging integration for hybrid-rs.
//!
//! Provides a helper for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and a span helper for grouping
//! the events of one query-building operation.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug",
/// "hybrid_rs_attributes=trace"). In debug mode a pretty, human-readable
/// format is used; otherwise a structured JSON format is used. Installing a
/// second subscriber is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one model-level query operation.
///
/// # Examples
///
/// ```
/// use hybrid_rs_core::logging::query_span;
///
/// let span = query_span("school_student");
/// let _guard = span.enter();
/// tracing::debug!("filtering");
/// ```
pub fn query_span(table: &str) -> tracing::Span {
    tracing::debug_span!("hybrid_query", table = table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let mut settings = Settings::default();
        settings.log_level = "not a valid filter [[[".to_string();
        setup_logging(&settings);
        setup_logging(&Settings::default());
    }

    #[test]
    fn test_query_span_enter() {
        let span = query_span("school_teacher");
        let _guard = span.enter();
        tracing::debug!("inside span");
    }
}
