//! Domain Services
//!
//! Pure policies over domain state. No I/O.

pub mod lockout_guard;
pub mod password_policy;
pub mod role_resolver;

pub use lockout_guard::{FailureOutcome, LockoutGuard, LockoutPolicy, LockoutState};
pub use password_policy::{PasswordPolicy, PasswordRule};
