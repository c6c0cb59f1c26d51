//! In-memory cache backend for development and tests.

mod store;

pub use store::MemoryCacheProvider;
