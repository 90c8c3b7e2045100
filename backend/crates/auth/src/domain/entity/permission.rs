//! Permission Entity
//!
//! A named capability scoped to a `(module, action)` pair. Roles grant
//! permissions; accounts inherit them through their roles.

use chrono::{DateTime, Utc};

use crate::domain::entity::role::normalize_description;
use crate::domain::value_object::PermissionName;
use crate::error::{AuthError, AuthResult};

pub const PERMISSION_LABEL_MAX_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub name: PermissionName,
    pub description: Option<String>,
    /// Functional area, e.g. `reports`
    pub module: String,
    /// Operation within the module, e.g. `export`
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(
        name: PermissionName,
        description: Option<String>,
        module: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Self> {
        Ok(Self {
            name,
            description: normalize_description(description)?,
            module: validate_label("module", module)?,
            action: validate_label("action", action)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// `None` leaves a field unchanged
    pub fn update(
        &mut self,
        description: Option<String>,
        module: Option<&str>,
        action: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        if description.is_some() {
            self.description = normalize_description(description)?;
        }
        if let Some(module) = module {
            self.module = validate_label("module", module)?;
        }
        if let Some(action) = action {
            self.action = validate_label("action", action)?;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Same `(module, action)` scope
    pub fn same_scope(&self, other: &Permission) -> bool {
        self.module == other.module && self.action == other.action
    }
}

fn validate_label(field: &'static str, value: &str) -> AuthResult<String> {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return Err(AuthError::validation(field, "Value is required"));
    }
    if value.chars().count() > PERMISSION_LABEL_MAX_LENGTH {
        return Err(AuthError::validation(
            field,
            format!(
                "Value must be at most {} characters",
                PERMISSION_LABEL_MAX_LENGTH
            ),
        ));
    }
    Ok(value)
}
