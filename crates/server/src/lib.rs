//! # Server Crate
//!
//! The recommendation resolution core: one resolver shared by two ingress
//! paths, plus the query log and the recent-resolutions buffer.
//!
//! ## Main Components
//!
//! - **resolver**: store → worker pool → fallback resolution
//! - **tcp**: the persistent line-oriented TCP listener (respond-then-log)
//! - **http**: the actix-web API (log-then-respond)
//! - **query_log**: append-only persistence of every resolved query
//! - **recent**: bounded ring buffer behind the status endpoint

pub mod http;
pub mod query_log;
pub mod recent;
pub mod resolver;
pub mod tcp;

pub use http::{HttpApi, HttpState};
pub use query_log::{
    JsonlQueryLog, MemoryQueryLog, PersistencePolicy, QueryLog, QueryLogEntry, QueryLogError,
};
pub use recent::{DEFAULT_RECENT_CAPACITY, RecentResults};
pub use resolver::{FallbackAnswer, ResolutionStrategy, Resolver};
pub use tcp::TcpIngress;
