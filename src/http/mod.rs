//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, mount prefix)
//!     → request.rs (request ID)
//!     → handler.rs (security checks, cache, forward)
//!     → response.rs (status, content type, X-Cache)
//!     → error.rs (JSON error bodies)
//!     → Send to client
//! ```

pub mod error;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use error::ProxyError;
pub use handler::{ProxyHandler, ProxyHandlerBuilder};
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::GatewayServer;
