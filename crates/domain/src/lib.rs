//! # SheetSync Domain
//!
//! Data types shared by every SheetSync crate.
//!
//! This crate contains:
//! - Source records and typed cell values
//! - Target sheet shapes (columns, rows, cells) and write operations
//! - Sync reports, warnings and batch failures
//! - Configuration structures
//! - Error taxonomy and the `Result` alias
//!
//! ## Architecture
//! - No dependencies on other SheetSync crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
