//! Resource location subsystem.
//!
//! # Responsibilities
//! - Map a request URI onto a file under the document root
//! - Classify the candidate (directory, missing, unreadable, servable)
//! - For the script variant, update the request's script server variables
//!
//! # Design Decisions
//! - Locators are stateless and shared through `Arc<dyn ResourceLocator>`
//! - Classification lives in `ResolvedResource::check` so both variants fail
//!   the same way for the same file
//! - Failures are typed values that render to 403/404 on their own

pub mod php_locator;
pub mod static_locator;

use std::fmt::Debug;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::config::LocatorKind;
use crate::http::request::InboundRequest;

pub use php_locator::PhpResourceLocator;
pub use static_locator::StaticResourceLocator;

/// Why a request could not be mapped to a servable file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("requested file {} is a directory", .0.display())]
    IsDirectory(PathBuf),

    #[error("file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("file {} is not readable", .0.display())]
    NotReadable(PathBuf),
}

impl LocateError {
    pub fn path(&self) -> &Path {
        match self {
            LocateError::IsDirectory(path) | LocateError::NotFound(path) | LocateError::NotReadable(path) => path,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LocateError::NotFound(_) => StatusCode::NOT_FOUND,
            LocateError::IsDirectory(_) | LocateError::NotReadable(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for LocateError {
    fn into_response(self) -> Response {
        // the filesystem path stays in the log, not in the page
        tracing::debug!(path = %self.path().display(), error = %self, "Resource lookup failed");
        let status = self.status();
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}

/// A filesystem path together with what was observed about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResource {
    pub path: PathBuf,
    pub is_dir: bool,
    pub is_file: bool,
    pub is_readable: bool,
}

impl ResolvedResource {
    /// Stats `path` without judging it. Symlinks are followed.
    pub fn inspect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let metadata = fs::metadata(&path).ok();
        let is_dir = metadata.as_ref().is_some_and(|m| m.is_dir());
        let is_file = metadata.as_ref().is_some_and(|m| m.is_file());
        let is_readable = if is_dir {
            fs::read_dir(&path).is_ok()
        } else {
            is_file && File::open(&path).is_ok()
        };

        Self {
            path,
            is_dir,
            is_file,
            is_readable,
        }
    }

    /// Directory, then not-a-file, then unreadable.
    pub fn check(self) -> Result<Self, LocateError> {
        if self.is_dir {
            Err(LocateError::IsDirectory(self.path))
        } else if !self.is_file {
            Err(LocateError::NotFound(self.path))
        } else if !self.is_readable {
            Err(LocateError::NotReadable(self.path))
        } else {
            Ok(self)
        }
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// Maps a request to a file under the document root.
pub trait ResourceLocator: Send + Sync + Debug {
    /// May update the request's server variables on success.
    fn locate(&self, request: &mut InboundRequest) -> Result<ResolvedResource, LocateError>;
}

/// Builds the configured locator.
pub fn from_kind(kind: LocatorKind) -> Arc<dyn ResourceLocator> {
    match kind {
        LocatorKind::Static => Arc::new(StaticResourceLocator::new()),
        LocatorKind::Php => Arc::new(PhpResourceLocator::new()),
    }
}

/// `DOCUMENT_ROOT` followed by `uri`, concatenated as strings.
pub(crate) fn document_path(request: &InboundRequest, uri: &str) -> PathBuf {
    let root = request.server_var("DOCUMENT_ROOT").unwrap_or_default();
    PathBuf::from(format!("{}{}", root, uri))
}
