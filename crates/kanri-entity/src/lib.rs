//! # kanri-entity
//!
//! Domain entity models for the Kanri admin platform. Every struct in
//! this crate represents a database table row or a domain value object.
//! All entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and
//! database entities additionally derive `sqlx::FromRow`.

pub mod department;
pub mod menu;
pub mod role;
pub mod session;
pub mod user;
