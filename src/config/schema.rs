//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the legacy gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// The hosted legacy webapp.
    pub application: ApplicationConfig,

    /// CGI interpreter used to run the webapp.
    pub cgi: CgiConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent requests in flight (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Which resource locator resolves request paths.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    /// Exact path only.
    #[default]
    Static,
    /// Nearest script at or above the path, remainder as `PATH_INFO`.
    Php,
}

/// The hosted webapp.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Absolute directory the webapp is installed in (`DOCUMENT_ROOT`).
    pub document_root: PathBuf,

    /// Mount path when not served as a virtual host (e.g. "/magento").
    pub context_path: String,

    /// Host names that serve the webapp at the root.
    pub vhosts: Vec<String>,

    /// Front-controller script name.
    pub directory_index: String,

    /// Where uploaded files are written before the application moves them.
    pub upload_tmp_dir: PathBuf,

    /// Extensions that are executed, never served as files.
    pub script_extensions: Vec<String>,

    /// Route every unresolvable request through the application.
    pub front_controller: bool,

    /// Locator variant.
    pub locator: LocatorKind,

    /// Maximum concurrent application runs.
    pub max_workers: usize,

    /// Extra server variables, e.g. `MAGE_RUN_CODE`.
    pub server_vars: BTreeMap<String, String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("/var/www/magento"),
            context_path: String::new(),
            vhosts: Vec::new(),
            directory_index: "index.do".to_string(),
            upload_tmp_dir: std::env::temp_dir(),
            script_extensions: vec!["php".to_string(), "do".to_string()],
            front_controller: true,
            locator: LocatorKind::Static,
            max_workers: 16,
            server_vars: BTreeMap::new(),
        }
    }
}

impl ApplicationConfig {
    /// True when files with this extension are executed, not served.
    pub fn is_script(&self, extension: Option<&str>) -> bool {
        extension.is_some_and(|ext| {
            self.script_extensions
                .iter()
                .any(|script| script.eq_ignore_ascii_case(ext))
        })
    }
}

/// CGI interpreter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CgiConfig {
    /// Interpreter binary.
    pub interpreter: PathBuf,

    /// Arguments passed before anything else.
    pub args: Vec<String>,
}

impl Default for CgiConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("php-cgi"),
            args: Vec::new(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 32 * 1024 * 1024, // 32MB, uploads included
        }
    }
}
