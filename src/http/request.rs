//! Inbound request abstraction.
//!
//! # Responsibilities
//! - Hold the container view of one request: method, URI, headers, CGI
//!   server variables, parameter map, uploaded parts and raw body
//! - Build that view from an axum request (form and multipart bodies included)
//! - Answer the "virtual host matches server name" question for the webapp
//!
//! # Design Decisions
//! - Built once per request; only the locator updates server variables
//! - Parameter names use bracket syntax, so the map is already nested
//! - Multipart fields with a filename attribute are uploads, even when the
//!   filename is empty (a file input with nothing selected)

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Version};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ApplicationConfig;
use crate::legacy::value::{extend_form, insert_pair, parse_form, Table, Value};

const SERVER_SOFTWARE: &str = concat!("legacy-gateway/", env!("CARGO_PKG_VERSION"));

/// Errors while turning a wire request into an `InboundRequest`.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body rejected: {0}")]
    Body(String),

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error("path {0} contains a parent directory segment")]
    Traversal(String),
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match self {
            RequestError::Body(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::Multipart(_) | RequestError::Traversal(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// True if any `/`-separated segment of `path` is `..`.
pub fn has_parent_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// Where the webapp is mounted and which virtual hosts serve it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebappContext {
    context_path: String,
    vhosts: Vec<String>,
}

impl WebappContext {
    pub fn new(context_path: impl Into<String>, vhosts: Vec<String>) -> Self {
        Self {
            context_path: context_path.into(),
            vhosts: vhosts.into_iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &ApplicationConfig) -> Self {
        Self::new(config.context_path.clone(), config.vhosts.clone())
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Host names compare case-insensitively.
    pub fn is_vhost_of(&self, server_name: &str) -> bool {
        let server_name = server_name.to_lowercase();
        self.vhosts.iter().any(|vhost| *vhost == server_name)
    }
}

/// One file field of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl UploadedPart {
    pub fn new(
        name: impl Into<String>,
        filename: Option<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            filename,
            content_type,
            data: data.into(),
        }
    }

    /// Field name, possibly with a bracket suffix (`images[0]`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client-supplied filename; `None` or empty when no file was chosen.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn has_file(&self) -> bool {
        self.filename.as_deref().is_some_and(|f| !f.is_empty())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Writes the part to a new file; fails if `path` already exists.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(&self.data)?;
        file.flush()
    }
}

/// Read-only view of one HTTP request, as the legacy host sees it.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    uri: String,
    query_string: String,
    headers: HeaderMap,
    server_vars: BTreeMap<String, String>,
    parts: Vec<UploadedPart>,
    parameters: Table,
    body: Bytes,
    context: WebappContext,
    path_info: Option<String>,
}

impl InboundRequest {
    /// Creates a request for `uri` (path plus optional query string).
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let mut server_vars = BTreeMap::new();
        server_vars.insert("REQUEST_METHOD".to_string(), method.to_string());
        server_vars.insert("REQUEST_URI".to_string(), uri.to_string());
        server_vars.insert("QUERY_STRING".to_string(), query.to_string());

        Self {
            method,
            uri: path,
            query_string: query.to_string(),
            headers: HeaderMap::new(),
            server_vars,
            parts: Vec::new(),
            parameters: parse_form(query),
            body: Bytes::new(),
            context: WebappContext::default(),
            path_info: None,
        }
    }

    /// Mounts the request on a webapp: context, document root and the
    /// configured extra server variables.
    pub fn with_application(mut self, config: &ApplicationConfig) -> Self {
        self.context = WebappContext::from_config(config);
        self.server_vars.insert(
            "DOCUMENT_ROOT".to_string(),
            config.document_root.to_string_lossy().into_owned(),
        );
        self.server_vars
            .extend(config.server_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn with_context(mut self, context: WebappContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_server_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.server_vars.insert(name.into(), value.into());
        self
    }

    /// Adds a parameter; `name` may use bracket syntax.
    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        insert_pair(&mut self.parameters, name, value);
        self
    }

    pub fn with_part(mut self, part: UploadedPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the request from the wire, reading at most `max_body_size` bytes.
    pub async fn from_http(
        request: Request<Body>,
        remote: SocketAddr,
        config: &ApplicationConfig,
        max_body_size: usize,
    ) -> Result<Self, RequestError> {
        let (parts, body) = request.into_parts();
        let uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        if has_parent_segment(parts.uri.path()) {
            return Err(RequestError::Traversal(parts.uri.path().to_string()));
        }

        let body = axum::body::to_bytes(body, max_body_size)
            .await
            .map_err(|e| RequestError::Body(e.to_string()))?;

        let mut inbound = Self::new(parts.method, &uri);
        inbound.headers = parts.headers;
        inbound.add_container_vars(parts.version, remote, body.len());
        // configured variables override what the container derived
        inbound = inbound.with_application(config);

        let content_type = inbound.header(header::CONTENT_TYPE.as_str()).unwrap_or_default().to_string();
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/x-www-form-urlencoded" => extend_form(&mut inbound.parameters, &body),
            "multipart/form-data" => inbound.read_multipart(&content_type, body.clone()).await?,
            _ => {}
        }
        inbound.body = body;

        tracing::trace!(
            uri = %inbound.uri,
            parameters = inbound.parameters.len(),
            uploads = inbound.parts.len(),
            "Inbound request built"
        );
        Ok(inbound)
    }

    fn add_container_vars(&mut self, version: Version, remote: SocketAddr, content_length: usize) {
        let host = self.header(header::HOST.as_str()).unwrap_or("localhost").to_string();
        let (server_name, server_port) = split_host(&host);
        let request_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut vars = vec![
            ("SERVER_NAME", server_name.to_string()),
            ("SERVER_PORT", server_port.unwrap_or("80").to_string()),
            ("SERVER_PROTOCOL", format!("{:?}", version)),
            ("SERVER_SOFTWARE", SERVER_SOFTWARE.to_string()),
            ("GATEWAY_INTERFACE", "CGI/1.1".to_string()),
            ("REMOTE_ADDR", remote.ip().to_string()),
            ("REMOTE_PORT", remote.port().to_string()),
            ("REQUEST_TIME", request_time.to_string()),
        ];
        if let Some(content_type) = self.header(header::CONTENT_TYPE.as_str()) {
            vars.push(("CONTENT_TYPE", content_type.to_string()));
        }
        if content_length > 0 {
            vars.push(("CONTENT_LENGTH", content_length.to_string()));
        }
        for (name, value) in vars {
            self.server_vars.insert(name.to_string(), value);
        }

        for name in self.headers.keys() {
            let separator = if *name == header::COOKIE { "; " } else { ", " };
            let value = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(separator);
            let key = format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_"));
            self.server_vars.insert(key, value);
        }
    }

    async fn read_multipart(&mut self, content_type: &str, body: Bytes) -> Result<(), RequestError> {
        let boundary =
            multer::parse_boundary(content_type).map_err(|e| RequestError::Multipart(e.to_string()))?;
        let stream = futures_util::stream::once(async move { Ok::<_, Infallible>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RequestError::Multipart(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(|m| m.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| RequestError::Multipart(e.to_string()))?;

            if filename.is_some() {
                self.parts.push(UploadedPart::new(name, filename, content_type, data));
            } else {
                insert_pair(&mut self.parameters, &name, String::from_utf8_lossy(&data).into_owned());
            }
        }
        Ok(())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    /// Path component of the request URI, always starting with `/`.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn server_vars(&self) -> &BTreeMap<String, String> {
        &self.server_vars
    }

    pub fn server_var(&self, name: &str) -> Option<&str> {
        self.server_vars.get(name).map(String::as_str)
    }

    pub fn set_server_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.server_vars.insert(name.into(), value.into());
    }

    pub fn server_name(&self) -> &str {
        self.server_var("SERVER_NAME").unwrap_or_default()
    }

    pub fn context_path(&self) -> &str {
        self.context.context_path()
    }

    /// True when the webapp is served as a virtual host of this server name.
    pub fn is_vhost(&self) -> bool {
        self.context.is_vhost_of(self.server_name())
    }

    pub fn parameters(&self) -> &Table {
        &self.parameters
    }

    pub fn parts(&self) -> &[UploadedPart] {
        &self.parts
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn path_info(&self) -> Option<&str> {
        self.path_info.as_deref()
    }

    /// Sets the path info and mirrors it into `PATH_INFO`.
    pub fn set_path_info(&mut self, path_info: impl Into<String>) {
        let path_info = path_info.into();
        self.server_vars.insert("PATH_INFO".to_string(), path_info.clone());
        self.path_info = Some(path_info);
    }
}

/// Splits a Host header into name and port (`[::1]:80` included).
fn split_host(host: &str) -> (&str, Option<&str>) {
    if host.starts_with('[') {
        return match host.find("]:") {
            Some(end) => (&host[..=end], Some(&host[end + 2..])),
            None => (host, None),
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) => (name, Some(port)),
        None => (host, None),
    }
}
