//! # kanri-cache
//!
//! Session-cache backends for the Kanri admin platform: a Redis provider
//! for deployment and an in-memory provider for development and tests,
//! both behind the [`kanri_core::traits::CacheProvider`] trait, dispatched
//! by [`provider::CacheManager`].

pub mod keys;
pub mod memory;
pub mod provider;
pub mod redis;

pub use provider::CacheManager;
