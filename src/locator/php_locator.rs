//! Script lookup with path-info fallback.
//!
//! `/index.php/catalog/product/view` has no file of its own; the walk drops
//! one trailing segment at a time until `/index.php` resolves, and the
//! dropped remainder becomes `PATH_INFO`.

use std::path::PathBuf;

use crate::http::request::InboundRequest;
use crate::locator::{document_path, LocateError, ResolvedResource, ResourceLocator};

/// Resolves the nearest existing script at or above the request path.
#[derive(Debug, Default, Clone)]
pub struct PhpResourceLocator;

impl PhpResourceLocator {
    pub fn new() -> Self {
        Self
    }
}

/// `(dirname, basename)` of a slash path; the dirname of a top-level entry is `/`.
fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", base)) => ("/", base),
        Some((dir, base)) => (dir, base),
        None => ("/", trimmed),
    }
}

fn join(dirname: &str, basename: &str) -> String {
    if dirname.ends_with('/') {
        format!("{}{}", dirname, basename)
    } else {
        format!("{}/{}", dirname, basename)
    }
}

impl ResourceLocator for PhpResourceLocator {
    fn locate(&self, request: &mut InboundRequest) -> Result<ResolvedResource, LocateError> {
        let uri = request.uri().to_string();
        let (mut dirname, mut basename) = split_path(&uri);
        let mut first_candidate: Option<PathBuf> = None;

        loop {
            let script_name = join(dirname, basename);
            let candidate = document_path(request, &script_name);

            match ResolvedResource::inspect(&candidate).check() {
                Ok(resource) => {
                    let request_path = request
                        .server_var("REQUEST_URI")
                        .map(|uri| uri.split_once('?').map_or(uri, |(path, _)| path))
                        .unwrap_or(uri.as_str())
                        .to_string();
                    let path_info = request_path
                        .strip_prefix(script_name.as_str())
                        .unwrap_or_default()
                        .to_string();

                    request.set_server_var("PHP_SELF", uri.as_str());
                    request.set_server_var("SCRIPT_NAME", script_name.as_str());
                    request.set_server_var("SCRIPT_FILENAME", resource.path.to_string_lossy());
                    request.set_path_info(path_info);

                    tracing::trace!(
                        uri = %uri,
                        script = %script_name,
                        path_info = ?request.path_info(),
                        "Script located"
                    );
                    return Ok(resource);
                }
                Err(err) => {
                    tracing::trace!(candidate = %candidate.display(), error = %err, "Candidate rejected");
                    first_candidate.get_or_insert(candidate);
                }
            }

            if dirname == "/" {
                break;
            }
            (dirname, basename) = split_path(dirname);
        }

        Err(LocateError::NotFound(first_candidate.unwrap_or_default()))
    }
}
