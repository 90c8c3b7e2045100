//! Auth (Authentication & Account Security) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, pure policies, repository traits
//! - `application/` - Use cases, token issuer, notifier port, service facade
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Registration with e-mail verification
//! - Login with per-account lockout (5 failures, 30 minutes by default)
//! - Password change / reset with strength rules and reuse prevention
//! - Role-based authorization flags (`user`, `admin`, `super_admin`)
//! - Named permissions granted through custom roles and carried in claims
//! - Self-service profile updates
//! - External identity sign-in and a configured bootstrap super-administrator
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional pepper, zeroized in memory
//! - Stateless HMAC-SHA256 bearer tokens with an explicit purpose claim
//! - Bootstrap tokens die with the configured credential
//! - Unknown e-mails pay the same Argon2 verification as known ones
//! - Lockout counters updated under a row lock, never lost under concurrency

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::{AuthConfig, SuperAdminConfig};
pub use application::{AuthService, Notifier, TracingNotifier};
pub use error::{AuthError, AuthResult};
pub use infra::{InMemoryAuthRepository, PgAuthRepository};
pub use presentation::router::{auth_router, auth_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{app_error::AppError, kind::ErrorKind};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}
