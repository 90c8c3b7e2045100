//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{IssuedToken, LoginOutput, VerifyEmailOutcome};
use crate::domain::entity::{Account, AuthEvent, Permission, Role};
use crate::domain::service::role_resolver;
use crate::domain::value_object::{AccountStatus, Claims};

// ============================================================================
// Account
// ============================================================================

/// Account summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub roles: Vec<String>,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        let roles = role_resolver::roles_of(account);
        Self {
            id: account.account_id.to_string(),
            email: account.email.as_str().to_string(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            status: account.status,
            email_verified: account.email_verified,
            is_admin: role_resolver::is_admin(&roles),
            is_super_admin: role_resolver::is_super_admin(&roles),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            locked_until: account.lockout.locked_until,
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

/// Profile update. Omitted or blank names are kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// ============================================================================
// Register
// ============================================================================

/// Register request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Register response. The verification token only travels through the notifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub account: AccountResponse,
    pub message: &'static str,
}

// ============================================================================
// Login / Tokens
// ============================================================================

/// Login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// Super admin login request
#[derive(Debug, Clone, Deserialize)]
pub struct SuperAdminLoginRequest {
    pub email: String,
    pub password: String,
}

/// Bearer token response (login, super admin login, refresh)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub claims: Claims,
    /// Absent for the bootstrap super-administrator
    pub account: Option<AccountResponse>,
}

impl From<LoginOutput> for TokenResponse {
    fn from(output: LoginOutput) -> Self {
        let IssuedToken { token, expires_at } = output.token;
        Self {
            token,
            token_type: "Bearer",
            expires_at,
            claims: output.claims,
            account: output.account.as_ref().map(AccountResponse::from),
        }
    }
}

/// Current identity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub claims: Claims,
    pub account: Option<AccountResponse>,
}

// ============================================================================
// Password
// ============================================================================

/// Change password request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Password reset request (step 1)
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Password reset (step 2)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

// ============================================================================
// E-mail verification
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailResponse {
    pub already_verified: bool,
    pub message: &'static str,
}

impl From<VerifyEmailOutcome> for VerifyEmailResponse {
    fn from(outcome: VerifyEmailOutcome) -> Self {
        match outcome {
            VerifyEmailOutcome::Verified => Self {
                already_verified: false,
                message: "Email verified",
            },
            VerifyEmailOutcome::AlreadyVerified => Self {
                already_verified: true,
                message: "Email is already verified",
            },
        }
    }
}

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ============================================================================
// Administration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRolesRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEventResponse {
    pub id: String,
    pub kind: &'static str,
    pub email: String,
    pub ip_address: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl From<AuthEvent> for AuthEventResponse {
    fn from(event: AuthEvent) -> Self {
        Self {
            id: event.event_id.to_string(),
            kind: event.kind.code(),
            email: event.email,
            ip_address: event.ip_address,
            occurred_at: event.occurred_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub name: String,
    pub description: Option<String>,
    pub is_system_role: bool,
    pub level: i32,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            name: role.name.as_str().to_string(),
            description: role.description,
            is_system_role: role.is_system_role,
            level: role.level,
            permissions: role.permissions.into_iter().map(String::from).collect(),
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleRequest {
    pub description: Option<String>,
    pub level: Option<i32>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub name: String,
    pub description: Option<String>,
    pub module: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Permission> for PermissionResponse {
    fn from(permission: Permission) -> Self {
        Self {
            name: permission.name.into(),
            description: permission.description,
            module: permission.module,
            action: permission.action,
            created_at: permission.created_at,
            updated_at: permission.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionQuery {
    pub module: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: String,
    pub description: Option<String>,
    pub module: String,
    pub action: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePermissionRequest {
    pub description: Option<String>,
    pub module: Option<String>,
    pub action: Option<String>,
}
