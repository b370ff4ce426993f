//! # SheetSync App
//!
//! Binary layer - dependency wiring and trigger modes.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - `once`, `schedule` and `check` commands
//! - Tracing initialisation and report logging
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires the ports to their HTTP adapters

pub mod commands;
pub mod context;
pub mod utils;

pub use context::AppContext;
