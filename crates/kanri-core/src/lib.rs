//! # kanri-core
//!
//! Core crate for the Kanri admin platform. Contains configuration
//! schemas, the unified error system, and the cache provider trait.
//!
//! This crate has **no** internal dependencies on other Kanri crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
