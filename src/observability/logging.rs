//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//! - Pick the filter from `RUST_LOG`, else from the configured level
//!
//! # Design Decisions
//! - Human-readable fmt layer; log shippers parse the key=value fields
//! - Initialization is fallible so tests and embedders can call it twice

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Default directives for a configured level, e.g. `info` becomes
/// `legacy_gateway=info,tower_http=info`.
pub fn default_directives(level: &str) -> String {
    format!("legacy_gateway={level},tower_http={level}")
}

/// Installs the global subscriber. Returns false if one was already set.
pub fn init(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(&config.log_level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok()
}
