//! # scrapehub-portal
//!
//! Thin HTTP plumbing for the external portal: a cookie-holding
//! [`HttpPortalDriver`] implementing the pool's `PortalDriver` seam, and
//! the [`RawFetchOperation`] that pulls a single portal page. All
//! content interpretation lives in the out-of-scope scraping layer.

pub mod driver;
pub mod operations;

pub use driver::{HttpPortalDriver, PortalHandle};
pub use operations::RawFetchOperation;
