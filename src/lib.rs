//! Legacy Gateway Library
//!
//! Hosts a PHP application written against process-wide superglobals inside
//! a multithreaded HTTP server, one isolated environment per request.

pub mod config;
pub mod http;
pub mod legacy;
pub mod lifecycle;
pub mod locator;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use legacy::{CgiApplication, EnvironmentTranslator, LegacyApplication, LegacyEnvironment};
pub use lifecycle::Shutdown;
pub use locator::{ResolvedResource, ResourceLocator};
