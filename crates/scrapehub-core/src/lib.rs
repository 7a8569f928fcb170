//! # scrapehub-core
//!
//! Core crate for ScrapeHub. Contains the portal driver and operation
//! traits, configuration schemas, typed identifiers, stats snapshots,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other ScrapeHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
