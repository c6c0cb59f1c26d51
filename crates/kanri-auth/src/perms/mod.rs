//! Role-permission caching.

pub mod cache;

pub use cache::RolePermissionCache;
