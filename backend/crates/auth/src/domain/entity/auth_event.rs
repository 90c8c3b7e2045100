//! Auth Event Entity
//!
//! Append-only record of security-relevant account activity (logins,
//! lockouts, password changes, admin actions).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::domain::value_object::{AccountId, AuthEventId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    Registered,
    LoginSucceeded,
    LoginFailed,
    LoginRejectedLocked,
    AccountLocked,
    PasswordChanged,
    PasswordResetRequested,
    PasswordReset,
    EmailVerified,
    AccountUnlocked,
    StatusChanged,
    RolesChanged,
    ProfileUpdated,
    ExternalLogin,
    SuperAdminLogin,
}

impl AuthEventKind {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::LoginRejectedLocked => "login_rejected_locked",
            Self::AccountLocked => "account_locked",
            Self::PasswordChanged => "password_changed",
            Self::PasswordResetRequested => "password_reset_requested",
            Self::PasswordReset => "password_reset",
            Self::EmailVerified => "email_verified",
            Self::AccountUnlocked => "account_unlocked",
            Self::StatusChanged => "status_changed",
            Self::RolesChanged => "roles_changed",
            Self::ProfileUpdated => "profile_updated",
            Self::ExternalLogin => "external_login",
            Self::SuperAdminLogin => "super_admin_login",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        const ALL: [AuthEventKind; 15] = [
            AuthEventKind::Registered,
            AuthEventKind::LoginSucceeded,
            AuthEventKind::LoginFailed,
            AuthEventKind::LoginRejectedLocked,
            AuthEventKind::AccountLocked,
            AuthEventKind::PasswordChanged,
            AuthEventKind::PasswordResetRequested,
            AuthEventKind::PasswordReset,
            AuthEventKind::EmailVerified,
            AuthEventKind::AccountUnlocked,
            AuthEventKind::StatusChanged,
            AuthEventKind::RolesChanged,
            AuthEventKind::ProfileUpdated,
            AuthEventKind::ExternalLogin,
            AuthEventKind::SuperAdminLogin,
        ];
        ALL.into_iter().find(|k| k.code() == code)
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub event_id: AuthEventId,
    pub account_id: Option<AccountId>,
    pub email: String,
    pub kind: AuthEventKind,
    pub ip_address: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuthEvent {
    pub fn new(
        kind: AuthEventKind,
        account_id: Option<AccountId>,
        email: impl Into<String>,
        ip_address: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: AuthEventId::new(),
            account_id,
            email: email.into(),
            kind,
            ip_address,
            occurred_at,
        }
    }
}
