//! # Model Store Crate
//!
//! The ranked model produced by each training pass and the TTL-backed cache
//! it lives in.
//!
//! ## Main Components
//!
//! - **types**: RankingEntry, key normalization, ranking size cap
//! - **store**: the ModelStore trait (get / set-with-TTL)
//! - **memory**: InMemoryModelStore, the per-process implementation
//!
//! ## Example Usage
//!
//! ```ignore
//! use model_store::{InMemoryModelStore, ModelStore, RankingEntry, normalize_key};
//! use std::time::Duration;
//!
//! let store = InMemoryModelStore::new();
//! let key = normalize_key("COMPUTADORAS PORTÁTILES");
//! store.set(&key, ranking, Duration::from_secs(3600)).await?;
//!
//! if let Some(ranking) = store.get(&key).await {
//!     println!("{} entries", ranking.len());
//! }
//! ```

// Public modules
pub mod memory;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use memory::InMemoryModelStore;
pub use store::{ModelStore, StoreError};
pub use types::{MAX_RANKING_LEN, RankingEntry, normalize_key};
