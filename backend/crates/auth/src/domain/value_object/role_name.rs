//! Role Name Value Object
//!
//! ロール名は小文字英数字とアンダースコアのみ（2〜50文字）。
//! 文字列のままロジックに流さず、境界で一度だけ検証する。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthError, AuthResult};

pub const ROLE_NAME_MIN_LENGTH: usize = 2;
pub const ROLE_NAME_MAX_LENGTH: usize = 50;

/// Validated role name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    pub const USER: &'static str = "user";
    pub const ADMIN: &'static str = "admin";
    pub const SUPER_ADMIN: &'static str = "super_admin";

    pub fn new(name: impl AsRef<str>) -> AuthResult<Self> {
        let name = name.as_ref().trim().to_lowercase();
        let len = name.chars().count();

        if !(ROLE_NAME_MIN_LENGTH..=ROLE_NAME_MAX_LENGTH).contains(&len) {
            return Err(AuthError::validation(
                "name",
                format!(
                    "Role name must be {}-{} characters",
                    ROLE_NAME_MIN_LENGTH, ROLE_NAME_MAX_LENGTH
                ),
            ));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(AuthError::validation(
                "name",
                "Role name may only contain lowercase letters, digits and underscores",
            ));
        }

        Ok(Self(name))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn user() -> Self {
        Self(Self::USER.to_string())
    }

    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    pub fn super_admin() -> Self {
        Self(Self::SUPER_ADMIN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleName {
    type Error = AuthError;

    fn try_from(value: String) -> AuthResult<Self> {
        RoleName::new(value)
    }
}

impl From<RoleName> for String {
    fn from(name: RoleName) -> Self {
        name.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_valid() {
        assert_eq!(RoleName::new("Editor").unwrap().as_str(), "editor");
        assert!(RoleName::new("report_viewer_2").is_ok());
        assert_eq!(RoleName::super_admin().as_str(), "super_admin");
    }

    #[test]
    fn test_role_name_invalid() {
        assert!(RoleName::new("a").is_err());
        assert!(RoleName::new("x".repeat(51)).is_err());
        assert!(RoleName::new("has space").is_err());
        assert!(RoleName::new("dash-ed").is_err());
        assert!(RoleName::new("ロール").is_err());
    }
}
