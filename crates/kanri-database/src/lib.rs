//! # kanri-database
//!
//! PostgreSQL connection management, concrete repositories, and the
//! [`kanri_auth::CredentialStore`] implementation backing the auth core.

pub mod connection;
pub mod directory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use directory::CredentialDirectory;
