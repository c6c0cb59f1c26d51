//! Concrete repository implementations.

pub mod department;
pub mod menu;
pub mod role;
pub mod user;

pub use department::DepartmentRepository;
pub use menu::MenuRepository;
pub use role::RoleRepository;
pub use user::{UserListFilter, UserRepository};
