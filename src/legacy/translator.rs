//! Request ↔ legacy environment translation.
//!
//! # Responsibilities
//! - Build the six legacy tables for one request
//! - Persist uploaded parts and register them as trusted uploads
//! - Run the application inside output capture and a failure boundary
//! - Map the emitted status and raw header lines onto an `OutboundResponse`
//!
//! # Design Decisions
//! - Every `prepare_*` function is a pure function of the request
//!   (uploads aside), so calling one twice gives the same table
//! - FILES is built by inserting along bracket paths directly; the grouping
//!   is `FILES[base][attribute][suffix...]`
//! - Application failures end up in the body, never as an `Err`; only
//!   local I/O (temp files) fails the request
//! - Uploads still in the registry after the run are deleted, so a backend
//!   that re-reads the raw body (CGI) leaves nothing behind

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::header;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uuid::Uuid;

use crate::config::ApplicationConfig;
use crate::http::request::InboundRequest;
use crate::http::response::OutboundResponse;
use crate::legacy::environment::{LegacyEnvironment, UploadRegistry};
use crate::legacy::value::{insert_path, parse_form, parse_key, Table, Value};
use crate::legacy::{LegacyApplication, LegacyError};
use crate::observability::metrics;

/// `UPLOAD_ERR_OK`
pub const UPLOAD_ERR_OK: u8 = 0;
/// `UPLOAD_ERR_NO_FILE`
pub const UPLOAD_ERR_NO_FILE: u8 = 4;

const EXPIRES_IN_PAST: &str = "19 Nov 1981 08:52:00 GMT";
const NO_CACHE: &str = "no-store, no-cache, must-revalidate, post-check=0, pre-check=0";

/// Errors that abort a request instead of being rendered into the page.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// An uploaded part could not be stored in the upload directory.
    #[error("failed to store upload for field {field}: {source}")]
    Upload {
        field: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker running the application went away.
    #[error("legacy worker unavailable: {0}")]
    Worker(String),
}

impl IntoResponse for TranslateError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed before rendering");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

/// What one application run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub body: Vec<u8>,
    pub status: u16,
    pub headers: Vec<String>,
}

/// Per-file view of the grouped FILES table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub content_type: String,
    pub tmp_name: String,
    pub error: String,
    pub size: String,
}

/// Reassembles the record for one upload field (`images[0]`, `avatar`, ...).
pub fn files_entry(files: &Table, field: &str) -> Option<FileEntry> {
    let (base, suffix) = parse_key(field)?;
    let group = files.get(&base)?;
    let attribute = |attr: &str| {
        group
            .get(attr)?
            .get_path(suffix.iter().map(String::as_str))?
            .as_str()
            .map(str::to_string)
    };

    Some(FileEntry {
        name: attribute("name")?,
        content_type: attribute("type")?,
        tmp_name: attribute("tmp_name")?,
        error: attribute("error")?,
        size: attribute("size")?,
    })
}

/// Bridges requests to a hosted legacy application.
pub struct EnvironmentTranslator {
    application: Arc<dyn LegacyApplication>,
    directory_index: String,
    upload_tmp_dir: PathBuf,
}

impl EnvironmentTranslator {
    pub fn new(application: Arc<dyn LegacyApplication>, config: &ApplicationConfig) -> Self {
        Self {
            application,
            directory_index: config.directory_index.clone(),
            upload_tmp_dir: config.upload_tmp_dir.clone(),
        }
    }

    /// Script path the application is entered through.
    fn directory_index(&self, request: &InboundRequest) -> String {
        if request.is_vhost() {
            self.directory_index.clone()
        } else {
            format!("{}/{}", request.context_path(), self.directory_index)
        }
    }

    /// `$_SERVER`: the container variables with the front-controller overlay.
    pub fn prepare_server_table(&self, request: &InboundRequest) -> Table {
        let mut table: Table = request
            .server_vars()
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect();

        if let Some(requested_with) = request.header("x-requested-with") {
            table.insert("HTTP_X_REQUESTED_WITH".to_string(), requested_with.into());
        }

        let directory_index = self.directory_index(request);
        let document_root = request.server_var("DOCUMENT_ROOT").unwrap_or_default();
        table.insert(
            "SCRIPT_FILENAME".to_string(),
            format!("{}/{}", document_root, directory_index).into(),
        );
        table.insert("SCRIPT_NAME".to_string(), directory_index.as_str().into());
        table.insert("PHP_SELF".to_string(), directory_index.into());

        // the application builds broken URLs when it sees the real port
        table.insert("SERVER_PORT".to_string(), Value::from(""));

        table
    }

    /// `$_REQUEST`
    pub fn prepare_request_table(&self, request: &InboundRequest) -> Table {
        request.parameters().clone()
    }

    /// `$_POST`
    pub fn prepare_post_table(&self, request: &InboundRequest) -> Table {
        if request.is_post() {
            request.parameters().clone()
        } else {
            Table::new()
        }
    }

    /// `$_GET`: for POST the query string is parsed on its own, since the
    /// parameter map also holds the body fields.
    pub fn prepare_get_table(&self, request: &InboundRequest) -> Table {
        if request.is_post() {
            parse_form(request.query_string())
        } else {
            request.parameters().clone()
        }
    }

    /// `$_COOKIE`: `a=1; b=2` split flat. Entries without `=` are skipped.
    pub fn prepare_cookie_table(&self, request: &InboundRequest) -> Table {
        let mut table = Table::new();
        let Some(cookies) = request.header(header::COOKIE.as_str()) else {
            return table;
        };

        for entry in cookies.split("; ") {
            match entry.split_once('=') {
                Some((key, value)) => {
                    table.insert(key.to_string(), value.into());
                }
                None => tracing::debug!(entry = %entry, "Skipping malformed cookie entry"),
            }
        }
        table
    }

    /// `$_FILES`: stores each uploaded file and records it in `uploads`.
    pub fn prepare_files_table(
        &self,
        request: &InboundRequest,
        uploads: &mut UploadRegistry,
    ) -> Result<Table, TranslateError> {
        let mut files = Table::new();

        for part in request.parts() {
            let Some((base, suffix)) = parse_key(part.name()) else {
                tracing::debug!(field = %part.name(), "Skipping upload without a field name");
                continue;
            };

            let (tmp_name, error) = if part.has_file() {
                let path = self.store_upload(part.name(), |path| part.write(path))?;
                uploads.register(&path);
                metrics::record_upload("stored");
                (path.to_string_lossy().into_owned(), UPLOAD_ERR_OK)
            } else {
                metrics::record_upload("empty");
                (String::new(), UPLOAD_ERR_NO_FILE)
            };

            let attributes = [
                ("name", part.filename().unwrap_or_default().to_string()),
                ("type", part.content_type().unwrap_or_default().to_string()),
                ("tmp_name", tmp_name),
                ("error", error.to_string()),
                ("size", part.size().to_string()),
            ];
            for (attribute, value) in attributes {
                let mut path = Vec::with_capacity(suffix.len() + 1);
                path.push(attribute.to_string());
                path.extend(suffix.iter().cloned());
                insert_path(&mut files, &base, &path, Value::Scalar(value));
            }
        }

        Ok(files)
    }

    fn store_upload<F>(&self, field: &str, write: F) -> Result<PathBuf, TranslateError>
    where
        F: FnOnce(&Path) -> std::io::Result<()>,
    {
        let upload_error = |source| TranslateError::Upload {
            field: field.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.upload_tmp_dir).map_err(upload_error)?;
        let path = self
            .upload_tmp_dir
            .join(format!("php{}", Uuid::new_v4().simple()));
        write(&path).map_err(upload_error)?;
        tracing::debug!(field = %field, path = %path.display(), "Stored uploaded file");
        Ok(path)
    }

    /// Builds the complete environment for one request.
    pub fn prepare_environment(&self, request: &InboundRequest) -> Result<LegacyEnvironment, TranslateError> {
        let mut uploads = UploadRegistry::new();
        let mut env = LegacyEnvironment::new();
        env.server = self.prepare_server_table(request);
        env.request = self.prepare_request_table(request);
        env.post = self.prepare_post_table(request);
        env.get = self.prepare_get_table(request);
        env.cookie = self.prepare_cookie_table(request);
        env.files = match self.prepare_files_table(request, &mut uploads) {
            Ok(files) => files,
            Err(err) => {
                uploads.discard();
                return Err(err);
            }
        };
        env.set_uploads(uploads);
        env.set_input(request.body().to_vec());
        Ok(env)
    }

    /// Runs the application for `request` and collects what it emitted.
    pub fn execute(&self, request: &InboundRequest) -> Result<Execution, TranslateError> {
        let mut env = self.prepare_environment(request)?;
        tracing::debug!(
            uri = %request.uri(),
            script = ?env.server.get("SCRIPT_NAME").and_then(|v| v.as_str()),
            uploads = env.uploads().len(),
            "Legacy environment prepared"
        );

        env.set_headers_sent(false);
        if let Err(err) = self.run_guarded(&mut env) {
            tracing::error!(uri = %request.uri(), error = %err, "Legacy application failed");
            metrics::record_legacy_failure();
            env.replace_output(err.to_string());
        }

        let execution = Execution {
            status: env.response_code(),
            headers: env.headers().to_vec(),
            body: env.take_output(),
        };

        let discarded = env.discard_uploads();
        if discarded > 0 {
            tracing::debug!(discarded, "Removed uploads the application did not move");
        }
        Ok(execution)
    }

    fn run_guarded(&self, env: &mut LegacyEnvironment) -> Result<(), LegacyError> {
        let application = &self.application;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            application.reset();
            application.run(env)?;
            application.write_session(env)
        }));
        outcome.unwrap_or_else(|payload| Err(LegacyError::Panicked(panic_message(payload.as_ref()))))
    }

    /// Writes an execution into `response`: cache-busting defaults first, then
    /// the application's status and headers, then the body.
    pub fn apply(execution: Execution, response: &mut OutboundResponse) {
        response.set_header("Expires", EXPIRES_IN_PAST);
        response.set_header("Cache-Control", NO_CACHE);
        response.set_header("Pragma", "no-cache");
        response.set_header("Content-Type", "text/html");
        response.set_status(execution.status);

        let mut seen = HashSet::new();
        for line in &execution.headers {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            if key.eq_ignore_ascii_case("Status") {
                if !response.set_status_line(value) {
                    tracing::warn!(status = %value, "Ignoring unparsable Status header");
                }
            } else if seen.insert(key.to_ascii_lowercase()) {
                response.set_header(key, value);
            } else {
                response.add_header(key, value);
            }
        }

        response.append_body(&execution.body);
    }

    /// Serves a GET request.
    pub fn do_get(&self, request: &InboundRequest, response: &mut OutboundResponse) -> Result<(), TranslateError> {
        let execution = self.execute(request)?;
        Self::apply(execution, response);
        Ok(())
    }

    /// Serves a POST request; the tables already branch on the method.
    pub fn do_post(&self, request: &InboundRequest, response: &mut OutboundResponse) -> Result<(), TranslateError> {
        self.do_get(request, response)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{UploadedPart, WebappContext};
    use axum::http::{HeaderValue, Method};
    use std::io::Write;
    use std::sync::Mutex;

    /// Application double that renders from the environment and records it.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Table>>,
        headers: Vec<String>,
        status: Option<u16>,
        fail: Option<&'static str>,
        panic: bool,
        move_upload: Option<(&'static str, PathBuf)>,
    }

    impl LegacyApplication for Recorder {
        fn run(&self, env: &mut LegacyEnvironment) -> Result<(), LegacyError> {
            self.seen.lock().unwrap().push(env.get.clone());
            write!(env, "partial output")?;
            if let Some((field, target)) = &self.move_upload {
                let entry = files_entry(&env.files, field).unwrap();
                assert!(env.move_uploaded_file(Path::new(&entry.tmp_name), target)?);
            }
            if self.panic {
                panic!("segfault in extension");
            }
            if let Some(message) = self.fail {
                return Err(LegacyError::Failed(message.to_string()));
            }
            for line in &self.headers {
                env.header(line.clone(), false);
            }
            if let Some(status) = self.status {
                env.set_response_code(status);
            }
            Ok(())
        }
    }

    fn app_config(upload_dir: &Path) -> ApplicationConfig {
        ApplicationConfig {
            document_root: "/srv/magento".into(),
            upload_tmp_dir: upload_dir.to_path_buf(),
            ..ApplicationConfig::default()
        }
    }

    fn translator(app: Recorder, upload_dir: &Path) -> EnvironmentTranslator {
        EnvironmentTranslator::new(Arc::new(app), &app_config(upload_dir))
    }

    fn request(method: Method, uri: &str) -> InboundRequest {
        InboundRequest::new(method, uri)
            .with_context(WebappContext::new("/magento", vec!["shop.local".to_string()]))
            .with_server_var("DOCUMENT_ROOT", "/srv/magento")
            .with_server_var("SERVER_NAME", "localhost")
            .with_server_var("SERVER_PORT", "8080")
    }

    #[test]
    fn test_server_table_without_vhost() {
        let dir = tempfile::tempdir().unwrap();
        let t = translator(Recorder::default(), dir.path());
        let req = request(Method::GET, "/catalog")
            .with_header(
                header::HeaderName::from_static("x-requested-with"),
                HeaderValue::from_static("XMLHttpRequest"),
            );

        let server = t.prepare_server_table(&req);
        assert_eq!(server["SCRIPT_NAME"], Value::from("/magento/index.do"));
        assert_eq!(server["PHP_SELF"], Value::from("/magento/index.do"));
        assert_eq!(server["SCRIPT_FILENAME"], Value::from("/srv/magento//magento/index.do"));
        assert_eq!(server["SERVER_PORT"], Value::from(""));
        assert_eq!(server["HTTP_X_REQUESTED_WITH"], Value::from("XMLHttpRequest"));
        assert_eq!(server["REQUEST_URI"], Value::from("/catalog"));
    }

    #[test]
    fn test_server_table_with_vhost_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let t = translator(Recorder::default(), dir.path());
        let req = request(Method::GET, "/").with_server_var("SERVER_NAME", "shop.local");

        let first = t.prepare_server_table(&req);
        let second = t.prepare_server_table(&req);
        assert_eq!(first, second);
        assert_eq!(first["SCRIPT_NAME"], Value::from("index.do"));
        assert_eq!(first["SCRIPT_FILENAME"], Value::from("/srv/magento/index.do"));
        assert!(!first.contains_key("HTTP_X_REQUESTED_WITH"));
    }

    #[test]
    fn test_get_table_for_post_uses_query_string() {
        let dir = tempfile::tempdir().unwrap();
        let t = translator(Recorder::default(), dir.path());
        let req = request(Method::POST, "/checkout?a=1&b=2").with_parameter("form_key", "xyz");

        let get = t.prepare_get_table(&req);
        assert_eq!(get.len(), 2);
        assert_eq!(get["a"], Value::from("1"));
        assert_eq!(get["b"], Value::from("2"));

        let post = t.prepare_post_table(&req);
        assert_eq!(post["form_key"], Value::from("xyz"));
        assert_eq!(t.prepare_request_table(&req), post);
    }

    #[test]
    fn test_get_table_for_get_is_parameter_map() {
        let dir = tempfile::tempdir().unwrap();
        let t = translator(Recorder::default(), dir.path());
        let req = request(Method::GET, "/search?q=shoes");

        assert_eq!(t.prepare_get_table(&req)["q"], Value::from("shoes"));
        assert!(t.prepare_post_table(&req).is_empty());
    }

    #[test]
    fn test_cookie_table() {
        let dir = tempfile::tempdir().unwrap();
        let t = translator(Recorder::default(), dir.path());

        let req = request(Method::GET, "/").with_header(header::COOKIE, HeaderValue::from_static("a=1; b=2"));
        let cookies = t.prepare_cookie_table(&req);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["a"], Value::from("1"));
        assert_eq!(cookies["b"], Value::from("2"));

        let req = request(Method::GET, "/").with_header(header::COOKIE, HeaderValue::from_static("a=1; bad"));
        let cookies = t.prepare_cookie_table(&req);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies["a"], Value::from("1"));

        // values may contain '=' themselves
        let req = request(Method::GET, "/").with_header(header::COOKIE, HeaderValue::from_static("token=ab=="));
        assert_eq!(t.prepare_cookie_table(&req)["token"], Value::from("ab=="));

        assert!(t.prepare_cookie_table(&request(Method::GET, "/")).is_empty());
    }

    #[test]
    fn test_files_table_grouping() {
        let dir = tempfile::tempdir().unwrap();
        let t = translator(Recorder::default(), dir.path());
        let req = request(Method::POST, "/upload")
            .with_part(UploadedPart::new(
                "images[0]",
                Some("x.png".into()),
                Some("image/png".into()),
                vec![7u8; 10],
            ))
            .with_part(UploadedPart::new("images[1]", Some(String::new()), None, Vec::new()))
            .with_part(UploadedPart::new("avatar", Some("me.jpg".into()), Some("image/jpeg".into()), vec![1u8; 3]));

        let mut uploads = UploadRegistry::new();
        let files = t.prepare_files_table(&req, &mut uploads).unwrap();

        let entry = files_entry(&files, "images[0]").unwrap();
        assert_eq!(entry.name, "x.png");
        assert_eq!(entry.content_type, "image/png");
        assert_eq!(entry.error, "0");
        assert_eq!(entry.size, "10");
        let tmp = PathBuf::from(&entry.tmp_name);
        assert!(tmp.starts_with(dir.path()));
        assert_eq!(std::fs::read(&tmp).unwrap(), vec![7u8; 10]);
        assert!(uploads.contains(&tmp));

        // grouped the way the application's own parser lays it out
        assert_eq!(
            files["images"].get_path(["name", "0"]),
            Some(&Value::from("x.png"))
        );
        assert_eq!(files["images"].get_path(["error", "1"]), Some(&Value::from("4")));

        let empty = files_entry(&files, "images[1]").unwrap();
        assert_eq!(empty.tmp_name, "");
        assert_eq!(empty.size, "0");

        let avatar = files_entry(&files, "avatar").unwrap();
        assert_eq!(avatar.name, "me.jpg");
        assert_eq!(uploads.len(), 2);
    }

    #[test]
    fn test_files_table_upload_dir_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let t = translator(Recorder::default(), &blocker);
        let req = request(Method::POST, "/").with_part(UploadedPart::new(
            "f",
            Some("a.txt".into()),
            None,
            b"abc".to_vec(),
        ));

        let err = t.prepare_files_table(&req, &mut UploadRegistry::new()).unwrap_err();
        assert!(matches!(err, TranslateError::Upload { ref field, .. } if field == "f"));
    }

    #[test]
    fn test_do_get_maps_status_and_headers() {
        let dir = tempfile::tempdir().unwrap();
        let app = Recorder {
            headers: vec![
                "Status: 404 Not Found".to_string(),
                "X-Foo: bar".to_string(),
                "Content-Type: application/json".to_string(),
                "Set-Cookie: a=1".to_string(),
                "Set-Cookie: b=2".to_string(),
                "garbage".to_string(),
            ],
            ..Recorder::default()
        };
        let t = translator(app, dir.path());
        let mut response = OutboundResponse::new();
        t.do_get(&request(Method::GET, "/missing"), &mut response).unwrap();

        assert_eq!(response.status(), 404);
        assert_eq!(response.reason(), Some("Not Found"));
        assert_eq!(response.header("Status"), None);
        assert_eq!(response.header("X-Foo"), Some("bar"));
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header_values("Set-Cookie"), vec!["a=1", "b=2"]);
        assert_eq!(response.header("Pragma"), Some("no-cache"));
        assert_eq!(response.header("Expires"), Some(EXPIRES_IN_PAST));
        assert_eq!(response.header("Cache-Control"), Some(NO_CACHE));
        assert_eq!(response.body(), b"partial output");
    }

    #[test]
    fn test_recorded_status_code_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let app = Recorder {
            status: Some(302),
            headers: vec!["Location: /customer/account".to_string()],
            ..Recorder::default()
        };
        let t = translator(app, dir.path());
        let mut response = OutboundResponse::new();
        t.do_post(&request(Method::POST, "/login"), &mut response).unwrap();

        assert_eq!(response.status(), 302);
        assert_eq!(response.header("Location"), Some("/customer/account"));
        assert_eq!(response.header("Content-Type"), Some("text/html"));
    }

    #[test]
    fn test_failure_replaces_body() {
        let dir = tempfile::tempdir().unwrap();
        let app = Recorder {
            fail: Some("Mage_Core_Exception: store not found"),
            ..Recorder::default()
        };
        let t = translator(app, dir.path());
        let execution = t.execute(&request(Method::GET, "/")).unwrap();

        assert_eq!(execution.status, 200);
        assert_eq!(execution.body, b"Mage_Core_Exception: store not found".to_vec());
    }

    #[test]
    fn test_panic_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let app = Recorder {
            panic: true,
            ..Recorder::default()
        };
        let t = translator(app, dir.path());
        let execution = t.execute(&request(Method::GET, "/")).unwrap();

        let body = String::from_utf8(execution.body).unwrap();
        assert!(body.contains("segfault in extension"), "{}", body);
    }

    #[test]
    fn test_each_execution_gets_fresh_tables() {
        let dir = tempfile::tempdir().unwrap();
        let app = Arc::new(Recorder::default());
        let t = EnvironmentTranslator::new(app.clone(), &app_config(dir.path()));

        t.execute(&request(Method::GET, "/?first=1")).unwrap();
        t.execute(&request(Method::GET, "/?second=2")).unwrap();

        let seen = app.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].get("first").is_none());
        assert_eq!(seen[1]["second"], Value::from("2"));
    }

    #[test]
    fn test_unmoved_uploads_are_removed_after_run() {
        let uploads = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let target = media.path().join("invoice.pdf");
        let app = Recorder {
            move_upload: Some(("invoice", target.clone())),
            ..Recorder::default()
        };
        let t = translator(app, uploads.path());
        let req = request(Method::POST, "/sales/upload")
            .with_part(UploadedPart::new("invoice", Some("i.pdf".into()), None, b"%PDF".to_vec()))
            .with_part(UploadedPart::new("scratch", Some("s.txt".into()), None, vec![0u8; 1024]));

        for _ in 0..3 {
            let mut response = OutboundResponse::new();
            t.do_post(&req, &mut response).unwrap();
            assert_eq!(std::fs::read(&target).unwrap(), b"%PDF");
            assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
        }
    }

    #[test]
    fn test_failed_run_still_removes_uploads() {
        let uploads = tempfile::tempdir().unwrap();
        let app = Recorder {
            fail: Some("Zend_Db_Adapter_Exception"),
            ..Recorder::default()
        };
        let t = translator(app, uploads.path());
        let req = request(Method::POST, "/").with_part(UploadedPart::new(
            "f",
            Some("a.txt".into()),
            None,
            b"abc".to_vec(),
        ));

        t.execute(&req).unwrap();
        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }
}
