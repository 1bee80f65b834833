//! Outbound response sink.
//!
//! # Responsibilities
//! - Collect status, headers and body produced by the translator or the
//!   static file path
//! - Keep headers in insertion order, allowing repeated names
//! - Convert into an axum response at the edge
//!
//! # Design Decisions
//! - Header names compare case-insensitively; the spelling of the first
//!   writer is kept
//! - Invalid header names/values are dropped with a warning instead of
//!   failing the whole response
//! - A reason phrase from a `Status:` line is sent as-is through hyper's
//!   `ReasonPhrase` extension; without one the canonical reason is used

use std::path::Path;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper::ext::ReasonPhrase;

/// Mutable response under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    status: u16,
    reason: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Default for OutboundResponse {
    fn default() -> Self {
        Self {
            status: 200,
            reason: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl OutboundResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A response carrying a file's bytes, typed by its extension.
    pub fn from_file(path: &Path, content: Vec<u8>) -> Self {
        let mut response = Self::new();
        response.set_header("Content-Type", content_type_for(path));
        response.append_body(&content);
        response
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
        self.reason = None;
    }

    /// Applies a status line such as `404 Not Found`.
    ///
    /// Returns false (and leaves the status alone) if it has no leading code.
    pub fn set_status_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        let (code, reason) = line.split_once(' ').unwrap_or((line, ""));
        match code.parse::<u16>() {
            Ok(code) if (100..=999).contains(&code) => {
                self.status = code;
                let reason = reason.trim();
                self.reason = (!reason.is_empty()).then(|| reason.to_string());
                true
            }
            _ => false,
        }
    }

    /// Replaces every header named `name`.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Adds a header, keeping earlier ones with the same name.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All values of a header, in insertion order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn append_body(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl IntoResponse for OutboundResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or_else(|_| {
            tracing::warn!(status = self.status, "Invalid status code from application");
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;
        if let Some(reason) = self.reason {
            match ReasonPhrase::try_from(reason) {
                Ok(reason) => {
                    response.extensions_mut().insert(reason);
                }
                Err(_) => tracing::warn!(status = self.status, "Dropping invalid reason phrase"),
            }
        }

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }
        response
    }
}

/// Content type for a static file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("htm") | Some("html") => "text/html; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let mut response = OutboundResponse::new();
        assert!(response.set_status_line("404 Not Found"));
        assert_eq!(response.status(), 404);
        assert_eq!(response.reason(), Some("Not Found"));

        assert!(response.set_status_line("302"));
        assert_eq!(response.status(), 302);
        assert_eq!(response.reason(), None);

        assert!(!response.set_status_line("teapot"));
        assert_eq!(response.status(), 302);
    }

    #[test]
    fn test_set_and_add_headers() {
        let mut response = OutboundResponse::new();
        response.set_header("Content-Type", "text/html");
        response.add_header("Set-Cookie", "a=1");
        response.add_header("Set-Cookie", "b=2");
        response.set_header("content-type", "application/json");

        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header_values("set-cookie"), vec!["a=1", "b=2"]);
        assert_eq!(response.headers().len(), 3);
    }

    #[test]
    fn test_into_response_drops_invalid_headers() {
        let mut response = OutboundResponse::new();
        response.set_status(201);
        response.add_header("X-Good", "yes");
        response.add_header("Bad Header", "no");
        response.append_body(b"done");

        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-good").unwrap(), "yes");
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn test_reason_phrase_is_carried() {
        let mut response = OutboundResponse::new();
        assert!(response.set_status_line("404 Gone Fishing"));
        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let reason = response.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(reason.as_bytes(), b"Gone Fishing");

        let response = OutboundResponse::new().into_response();
        assert!(response.extensions().get::<ReasonPhrase>().is_none());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Path::new("/media/a.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("/skin/app.css")), "text/css; charset=utf-8");
        assert_eq!(content_type_for(Path::new("/LICENSE")), "application/octet-stream");
    }
}
