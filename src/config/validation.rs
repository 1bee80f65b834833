//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate paths (document root, upload directory must be absolute)
//! - Validate value ranges (timeouts > 0, workers > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// One semantic problem with a config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Checks everything serde cannot.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let app = &config.application;

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    if app.document_root.as_os_str().is_empty() {
        errors.push(ValidationError::new("application.document_root", "must not be empty"));
    } else if !app.document_root.is_absolute() {
        errors.push(ValidationError::new("application.document_root", "must be an absolute path"));
    }
    if !app.upload_tmp_dir.is_absolute() {
        errors.push(ValidationError::new("application.upload_tmp_dir", "must be an absolute path"));
    }
    if !app.context_path.is_empty() && !app.context_path.starts_with('/') {
        errors.push(ValidationError::new("application.context_path", "must start with '/'"));
    }
    if app.directory_index.is_empty() || app.directory_index.contains('/') {
        errors.push(ValidationError::new(
            "application.directory_index",
            "must be a plain file name",
        ));
    }
    if app.max_workers == 0 {
        errors.push(ValidationError::new("application.max_workers", "must be greater than 0"));
    }

    if config.cgi.interpreter.as_os_str().is_empty() {
        errors.push(ValidationError::new("cgi.interpreter", "must not be empty"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
