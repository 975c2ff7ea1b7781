//! # Data Loader Crate
//!
//! This crate handles loading the framework-agreement purchase-order dataset
//! that the recommendation model is trained on.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (PurchaseOrder, TransactionRecord)
//! - **parser**: Parse the CSV report into Rust structs
//! - **source**: The TransactionSource trait feeding the trainer
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{CsvTransactionSource, TransactionSource};
//!
//! let source = CsvTransactionSource::new("data/ReportePCBienes_cleaned.csv");
//! let records = source.load()?;
//!
//! println!("Loaded {} transaction records", records.len());
//! ```

// Public modules
pub mod error;
pub mod parser;
pub mod source;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use parser::{load_transactions, parse_purchase_orders};
pub use source::{CsvTransactionSource, StaticTransactionSource, TransactionSource};
pub use types::{PurchaseOrder, TransactionRecord};
