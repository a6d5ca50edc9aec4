//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming proxy request:
//!     → allowlist.rs (may this path be forwarded at all?)
//!     → session.rs (is there an upstream credential?)
//!     → origin.rs (does it come from an allowed page?)
//!     → rate_limit.rs (check per-IP limits)
//!     → Pass to cache / upstream
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - Cheapest check first; nothing here touches the cache

pub mod allowlist;
pub mod origin;
pub mod rate_limit;
pub mod session;

pub use allowlist::{has_encoded_delimiter, PathAllowlist, PathRule};
pub use origin::{AllowedOrigins, OriginValidator};
pub use rate_limit::{RateLimiter, TokenBucketLimiter, Unlimited};
pub use session::{SessionProvider, StaticTokenSession};
