//! Entity Module

pub mod account;
pub mod auth_event;
pub mod permission;
pub mod role;

pub use account::Account;
pub use auth_event::{AuthEvent, AuthEventKind};
pub use permission::Permission;
pub use role::Role;
