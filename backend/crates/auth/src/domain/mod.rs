//! Domain Layer
//!
//! Contains entities, value objects, pure domain services and repository traits.

pub mod entity;
pub mod repository;
pub mod service;
pub mod value_object;

// Re-exports
pub use entity::{Account, AuthEvent, AuthEventKind, Permission, Role};
pub use repository::{
    AccountRepository, AuthEventRepository, PermissionRepository, RoleRepository,
};
