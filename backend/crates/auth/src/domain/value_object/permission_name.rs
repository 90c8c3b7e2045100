//! Permission Name Value Object
//!
//! `module:action` 形式を推奨（例: `reports:export`）。
//! 小文字英数字と `_ : . -` のみ、2〜100文字。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthError, AuthResult};

pub const PERMISSION_NAME_MIN_LENGTH: usize = 2;
pub const PERMISSION_NAME_MAX_LENGTH: usize = 100;

/// Validated permission name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName(String);

impl PermissionName {
    pub fn new(name: impl AsRef<str>) -> AuthResult<Self> {
        let name = name.as_ref().trim().to_lowercase();
        let len = name.chars().count();

        if !(PERMISSION_NAME_MIN_LENGTH..=PERMISSION_NAME_MAX_LENGTH).contains(&len) {
            return Err(AuthError::validation(
                "name",
                format!(
                    "Permission name must be {}-{} characters",
                    PERMISSION_NAME_MIN_LENGTH, PERMISSION_NAME_MAX_LENGTH
                ),
            ));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_:.-".contains(c))
        {
            return Err(AuthError::validation(
                "name",
                "Permission name may only contain lowercase letters, digits and _ : . -",
            ));
        }

        Ok(Self(name))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PermissionName {
    type Error = AuthError;

    fn try_from(value: String) -> AuthResult<Self> {
        PermissionName::new(value)
    }
}

impl From<PermissionName> for String {
    fn from(name: PermissionName) -> Self {
        name.0
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
