//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Legacy runs already started are not interrupted; the server waits for
//!   their responses before exiting

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{trigger_on_signal, wait_for_signal};
