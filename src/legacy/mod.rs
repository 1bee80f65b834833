//! Legacy application hosting subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → translator.rs (build SERVER/REQUEST/POST/GET/COOKIE/FILES)
//!     → environment.rs (request-scoped tables + output capture)
//!     → LegacyApplication::reset + run + write_session
//!     → translator.rs (status + raw header lines → OutboundResponse)
//! ```
//!
//! # Design Decisions
//! - The environment is passed by `&mut`, never stored in globals, so two
//!   requests can never observe each other's tables
//! - Table values are typed (`value.rs`) rather than untyped nested arrays
//! - Application failures are values (`LegacyError`), panics included

pub mod cgi;
pub mod environment;
pub mod translator;
pub mod value;

use thiserror::Error;

pub use cgi::CgiApplication;
pub use environment::{LegacyEnvironment, UploadRegistry};
pub use translator::{EnvironmentTranslator, Execution, FileEntry, TranslateError};
pub use value::{Table, Value};

/// Errors raised by the hosted application.
#[derive(Debug, Error)]
pub enum LegacyError {
    /// The application reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The application panicked while running.
    #[error("legacy application panicked: {0}")]
    Panicked(String),

    /// The interpreter process could not be started or talked to.
    #[error("legacy application I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The interpreter process exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Exited {
        program: String,
        status: String,
        stderr: String,
    },
}

/// The entry point of a hosted legacy application.
///
/// Implementations read the tables from the environment, write their page to
/// it (it implements `io::Write`), and record status and raw header lines on
/// it. One call sequence per request: `reset`, `run`, `write_session`.
pub trait LegacyApplication: Send + Sync {
    /// Clears any per-run state the application keeps between requests.
    fn reset(&self) {}

    /// Runs the application against this request's environment.
    fn run(&self, env: &mut LegacyEnvironment) -> Result<(), LegacyError>;

    /// Persists session state accumulated during `run`.
    fn write_session(&self, _env: &mut LegacyEnvironment) -> Result<(), LegacyError> {
        Ok(())
    }
}
