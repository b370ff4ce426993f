//! Sheet target adapter.

pub mod client;
mod wire;

pub use client::SheetClient;
