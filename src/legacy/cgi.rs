//! Legacy application backed by a CGI interpreter process.
//!
//! # Responsibilities
//! - Export the SERVER table as the CGI environment of a fresh process
//! - Feed the raw request body on stdin
//! - Split stdout into raw header lines and page body
//!
//! # Design Decisions
//! - One process per request; no FastCGI pooling
//! - The child environment is cleared first so nothing from the gateway
//!   process leaks into the application
//! - stdin is written from a scoped thread while stdout is drained, so a
//!   chatty script cannot deadlock against a large body

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use crate::config::CgiConfig;
use crate::legacy::environment::LegacyEnvironment;
use crate::legacy::value::Value;
use crate::legacy::{LegacyApplication, LegacyError};

/// Runs every request through an external interpreter such as `php-cgi`.
#[derive(Debug, Clone)]
pub struct CgiApplication {
    interpreter: PathBuf,
    extra_args: Vec<String>,
}

impl CgiApplication {
    pub fn new(interpreter: impl Into<PathBuf>, extra_args: Vec<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            extra_args,
        }
    }

    pub fn from_config(config: &CgiConfig) -> Self {
        Self::new(config.interpreter.clone(), config.args.clone())
    }

    fn command(&self, env: &LegacyEnvironment) -> Command {
        let mut command = Command::new(&self.interpreter);
        command
            .args(&self.extra_args)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (name, value) in &env.server {
            if let Value::Scalar(value) = value {
                command.env(name, value);
            }
        }

        // php-cgi refuses to run without it when force-cgi-redirect is on
        command.env("REDIRECT_STATUS", "200");
        let query = env
            .server
            .get("QUERY_STRING")
            .and_then(Value::as_str)
            .unwrap_or_default();
        command.env("QUERY_STRING", query);
        command.env("CONTENT_LENGTH", env.input().len().to_string());
        if let Some(content_type) = env.server.get("CONTENT_TYPE").and_then(Value::as_str) {
            command.env("CONTENT_TYPE", content_type);
        }
        command
    }
}

impl LegacyApplication for CgiApplication {
    fn run(&self, env: &mut LegacyEnvironment) -> Result<(), LegacyError> {
        let mut child = self.command(env).spawn()?;
        tracing::debug!(
            interpreter = %self.interpreter.display(),
            pid = child.id(),
            "Spawned CGI interpreter"
        );

        let stdin = child.stdin.take();
        let input = env.input();
        let output = thread::scope(|scope| {
            if let Some(mut stdin) = stdin {
                scope.spawn(move || {
                    // the script may exit without reading its input
                    if let Err(err) = stdin.write_all(input) {
                        tracing::debug!(error = %err, "CGI interpreter closed stdin early");
                    }
                });
            }
            child.wait_with_output()
        })?;

        if !output.status.success() {
            return Err(LegacyError::Exited {
                program: self.interpreter.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !output.stderr.is_empty() {
            tracing::warn!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "CGI interpreter wrote to stderr"
            );
        }

        let (headers, body) = parse_cgi_output(&output.stdout);
        let mut has_status = false;
        let mut has_location = false;
        for line in headers {
            let name = line.split_once(':').map(|(name, _)| name.trim()).unwrap_or_default();
            has_status |= name.eq_ignore_ascii_case("Status");
            has_location |= name.eq_ignore_ascii_case("Location");
            env.header(line, false);
        }
        if has_location && !has_status {
            env.set_response_code(302);
        }

        env.write_all(body)?;
        Ok(())
    }
}

/// Splits CGI output at the first blank line (CRLF or LF).
///
/// Output without a blank line is treated as all body.
pub fn parse_cgi_output(stdout: &[u8]) -> (Vec<String>, &[u8]) {
    let crlf = find(stdout, b"\r\n\r\n").map(|i| (i, 4));
    let lf = find(stdout, b"\n\n").map(|i| (i, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    let Some((end, separator)) = split else {
        return (Vec::new(), stdout);
    };

    let headers = String::from_utf8_lossy(&stdout[..end])
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    (headers, &stdout[end + separator..])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
