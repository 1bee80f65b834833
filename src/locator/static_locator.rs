//! Exact-path lookup for assets such as images and stylesheets.

use crate::http::request::InboundRequest;
use crate::locator::{document_path, LocateError, ResolvedResource, ResourceLocator};

/// Resolves `DOCUMENT_ROOT` + request path, with no fallback.
#[derive(Debug, Default, Clone)]
pub struct StaticResourceLocator;

impl StaticResourceLocator {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceLocator for StaticResourceLocator {
    fn locate(&self, request: &mut InboundRequest) -> Result<ResolvedResource, LocateError> {
        let uri = request
            .server_var("REQUEST_URI")
            .map(|uri| uri.split_once('?').map_or(uri, |(path, _)| path))
            .unwrap_or(request.uri());
        let path = document_path(request, uri);
        ResolvedResource::inspect(path).check()
    }
}
