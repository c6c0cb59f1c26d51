//! Application-wide result alias.

use crate::error::AppError;

/// Result alias used throughout all Kanri crates.
pub type AppResult<T> = Result<T, AppError>;
