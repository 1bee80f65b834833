//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! http::server, legacy::translator, locator
//!     → logging.rs (structured tracing events, EnvFilter)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log lines
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to every request span
//! - Metric helpers are free functions so call sites stay one line
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
