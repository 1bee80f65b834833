//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (InboundRequest: server vars, parameters, uploads)
//!     → locator (static file?) / legacy translator (script run)
//!     → response.rs (OutboundResponse → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, RequestError, UploadedPart, WebappContext};
pub use response::OutboundResponse;
pub use server::HttpServer;
