//! # SheetSync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Resilient HTTP client (retry, backoff, `Retry-After`) over reqwest
//! - ERP source client with OData paging and filters
//! - Sheet target client (column discovery, batched row writes)
//! - Configuration loading (environment or TOML/JSON file)
//! - Interval scheduler with a bounded job history
//!
//! ## Architecture
//! - Implements traits defined in `sheetsync-core`
//! - Depends on `sheetsync-domain` and `sheetsync-core`
//! - Contains all "impure" code (network, filesystem, timers)

pub mod config;
pub mod errors;
pub mod http;
pub mod scheduling;
pub mod source;
pub mod target;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{ResilientClient, RetryPolicy};
pub use scheduling::{JobHistory, RunnerJob, SyncJob, SyncScheduler, SyncSchedulerConfig};
pub use source::ErpClient;
pub use target::SheetClient;
