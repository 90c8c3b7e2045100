//! Application Layer
//!
//! Use cases, token issuing, notifier port and the service facade.

mod audit;

pub mod account_admin;
pub mod change_password;
pub mod config;
pub mod external_login;
pub mod login;
pub mod notifier;
pub mod password_reset;
pub mod permission_admin;
pub mod profile;
pub mod register;
pub mod role_admin;
pub mod service;
pub mod session;
pub mod super_admin_login;
pub mod token;
pub mod verify_email;

// Re-exports
pub use change_password::ChangePasswordInput;
pub use config::{AuthConfig, SuperAdminConfig};
pub use external_login::ExternalLoginInput;
pub use login::{LoginInput, LoginOutput};
pub use notifier::{Notifier, TracingNotifier};
pub use password_reset::ResetPasswordInput;
pub use permission_admin::{CreatePermissionInput, UpdatePermissionInput};
pub use profile::UpdateProfileInput;
pub use register::{RegisterInput, RegisterOutput};
pub use role_admin::{CreateRoleInput, UpdateRoleInput};
pub use service::{AuthService, AuthStore};
pub use super_admin_login::SuperAdminLoginInput;
pub use token::{IssuedToken, TokenIssuer, TokenPurpose, VerifiedToken};
pub use verify_email::VerifyEmailOutcome;
