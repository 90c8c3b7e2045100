//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by the
//! account-security crates:
//! - Common error types and result aliases ([`error::app_error::AppError`])
//! - Typed identifiers ([`id::AccountId`], [`id::AuthEventId`])
//!
//! Only things that are hard to change and mean the same thing everywhere
//! belong here.

pub mod error {
    pub mod app_error;
    pub mod kind;
    #[cfg(feature = "axum")]
    pub mod response;
}
pub mod id;
