//! ERP source adapter.

pub mod client;
pub mod odata;
pub mod pagination;

pub use client::ErpClient;
pub use odata::ODataFilter;
pub use pagination::{normalize_page, Paginator};
