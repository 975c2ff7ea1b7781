//! # Trainer Crate
//!
//! Turns raw (product, entity) transaction records into the ranked
//! co-occurrence model and keeps it fresh on a fixed cadence.
//!
//! ## Main Components
//!
//! - **snapshot**: the pure training pass (group, count, score, rank)
//! - **trainer**: the Trainer driving source → snapshot → store, once or
//!   periodically
//!
//! ## Example Usage
//!
//! ```ignore
//! use trainer::{Trainer, DEFAULT_TRAIN_INTERVAL};
//!
//! let trainer = Trainer::new(source, store);
//! tokio::spawn(async move {
//!     trainer.run_periodic(DEFAULT_TRAIN_INTERVAL).await;
//! });
//! ```

pub mod snapshot;
pub mod trainer;

pub use snapshot::{Snapshot, train_snapshot};
pub use trainer::{DEFAULT_TRAIN_INTERVAL, MODEL_TTL, TrainReport, Trainer};
