//! Catalog synchronisation: mapping, reconciliation and batched writes.

pub mod batch;
pub mod catalog;
pub mod catalogs;
pub mod column_map;
pub mod key_index;
pub mod locks;
pub mod mapping;
pub mod provision;
pub mod reconcile;
pub mod runner;
