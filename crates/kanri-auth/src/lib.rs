//! Authentication and authorization core for Kanri.
//!
//! This crate owns the token lifecycle (two interchangeable strategies:
//! stateless signed JWTs and cache-backed opaque sessions), multi-role
//! data-scope resolution into row-level SQL predicates, and the
//! role-permission cache used for fast permission checks.

pub mod identity;
pub mod password;
pub mod perms;
pub mod scope;
pub mod service;
pub mod store;
pub mod token;

pub use identity::UserDetails;
pub use service::AuthService;
pub use store::CredentialStore;
pub use token::{AuthenticationToken, TokenManager, build_token_manager};

#[cfg(test)]
pub(crate) mod test_util;
