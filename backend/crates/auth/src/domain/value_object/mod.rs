//! Value Object Module

pub mod account_status;
pub mod claims;
pub mod email;
pub mod external_identity;
pub mod password;
pub mod permission_name;
pub mod role_name;

pub use account_status::AccountStatus;
pub use claims::Claims;
pub use email::Email;
pub use external_identity::ExternalIdentity;
pub use kernel::id::{AccountId, AuthEventId};
pub use password::{PasswordHash, PasswordHistory, RawPassword};
pub use permission_name::PermissionName;
pub use role_name::RoleName;
