//! Request-scoped legacy execution environment.
//!
//! A `LegacyEnvironment` replaces the process-wide superglobals: it is built
//! for one request, handed to the application by `&mut`, and dropped when the
//! response has been assembled. Nothing in it outlives the request.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::legacy::value::Table;

/// Status the application reports unless it sets another one.
pub const DEFAULT_RESPONSE_CODE: u16 = 200;

/// Temp files that were written from uploaded parts of this request.
///
/// `is_uploaded_file`/`move_uploaded_file` only accept paths registered here.
#[derive(Debug, Default, Clone)]
pub struct UploadRegistry {
    paths: HashSet<PathBuf>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a temp file as a legitimate upload.
    pub fn register(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    fn remove(&mut self, path: &Path) -> bool {
        self.paths.remove(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Deletes every file still registered and empties the registry.
    /// Returns how many files were removed.
    pub fn discard(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain() {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Failed to remove unmoved upload")
                }
            }
        }
        removed
    }
}

/// The tables, output buffer and emitted response state of one request.
#[derive(Debug)]
pub struct LegacyEnvironment {
    /// `$_SERVER`
    pub server: Table,
    /// `$_REQUEST`
    pub request: Table,
    /// `$_POST`
    pub post: Table,
    /// `$_GET`
    pub get: Table,
    /// `$_COOKIE`
    pub cookie: Table,
    /// `$_FILES`
    pub files: Table,

    input: Vec<u8>,
    output: Vec<u8>,
    response_code: u16,
    headers: Vec<String>,
    headers_sent: bool,
    uploads: UploadRegistry,
}

impl Default for LegacyEnvironment {
    fn default() -> Self {
        Self {
            server: Table::new(),
            request: Table::new(),
            post: Table::new(),
            get: Table::new(),
            cookie: Table::new(),
            files: Table::new(),
            input: Vec::new(),
            output: Vec::new(),
            response_code: DEFAULT_RESPONSE_CODE,
            headers: Vec::new(),
            headers_sent: false,
            uploads: UploadRegistry::new(),
        }
    }
}

impl LegacyEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw request body, as `php://input` would expose it.
    pub fn input(&self) -> &[u8] {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<Vec<u8>>) {
        self.input = input.into();
    }

    /// Everything the application has written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Drops the captured output and puts `content` in its place.
    pub fn replace_output(&mut self, content: impl Into<Vec<u8>>) {
        self.output = content.into();
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub fn response_code(&self) -> u16 {
        self.response_code
    }

    pub fn set_response_code(&mut self, code: u16) {
        self.response_code = code;
    }

    /// Records a raw `Key: Value` header line.
    ///
    /// With `replace`, earlier lines with the same key are dropped first.
    pub fn header(&mut self, line: impl Into<String>, replace: bool) {
        let line = line.into();
        if replace {
            if let Some(name) = header_name(&line) {
                let name = name.to_string();
                self.headers
                    .retain(|existing| !header_name(existing).is_some_and(|n| n.eq_ignore_ascii_case(&name)));
            }
        }
        self.headers.push(line);
    }

    /// Raw header lines in the order they were emitted.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub fn set_headers_sent(&mut self, sent: bool) {
        self.headers_sent = sent;
    }

    pub fn uploads(&self) -> &UploadRegistry {
        &self.uploads
    }

    pub fn set_uploads(&mut self, uploads: UploadRegistry) {
        self.uploads = uploads;
    }

    /// Deletes the uploads the application left in place. Called once the
    /// run is over; moved uploads are no longer registered and survive.
    pub fn discard_uploads(&mut self) -> usize {
        self.uploads.discard()
    }

    /// True when `path` was written by this request's upload handling.
    pub fn is_uploaded_file(&self, path: &Path) -> bool {
        self.uploads.contains(path)
    }

    /// Moves a registered upload to `target`. Returns `Ok(false)` for paths
    /// that are not uploads of this request; the file is left untouched then.
    pub fn move_uploaded_file(&mut self, from: &Path, target: &Path) -> io::Result<bool> {
        if !self.uploads.contains(from) {
            return Ok(false);
        }
        if fs::rename(from, target).is_err() {
            // rename fails across filesystems
            fs::copy(from, target)?;
            fs::remove_file(from)?;
        }
        self.uploads.remove(from);
        Ok(true)
    }
}

/// Output written by the application. The first write marks headers as sent.
impl Write for LegacyEnvironment {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.headers_sent = true;
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn header_name(line: &str) -> Option<&str> {
    line.split_once(':').map(|(name, _)| name.trim())
}
