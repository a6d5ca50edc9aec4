//! Edge proxy and response cache for the scholarly search API.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod upstream;

pub use config::schema::GatewayConfig;
pub use http::{GatewayServer, ProxyHandler};
pub use lifecycle::Shutdown;
