//! Account Entity
//!
//! Aggregate root of the account-security core. Holds credentials, lockout
//! counters, verification state and role memberships.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::domain::entity::role::Role;
use crate::domain::service::lockout_guard::LockoutState;
use crate::domain::value_object::{
    AccountId, AccountStatus, Email, ExternalIdentity, PasswordHash, PasswordHistory, RoleName,
};
use crate::error::{AuthError, AuthResult};

/// Maximum length of first/last name (in characters)
pub const PERSON_NAME_MAX_LENGTH: usize = 100;

#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: AccountId,
    /// Unique, case-insensitive, immutable
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// `None` only for federated accounts that never set a password
    pub password_hash: Option<PasswordHash>,
    pub password_history: PasswordHistory,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub lockout: LockoutState,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub roles: BTreeSet<RoleName>,
    pub external_identity: Option<ExternalIdentity>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// New locally registered account: active, unverified, no roles yet
    pub fn new_local(
        email: Email,
        first_name: String,
        last_name: String,
        password_hash: PasswordHash,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            password_hash: Some(password_hash),
            password_changed_at: Some(now),
            ..Self::blank(email, first_name, last_name, now)
        }
    }

    /// New federated account: active, verified, no password
    pub fn new_external(
        email: Email,
        first_name: String,
        last_name: String,
        identity: ExternalIdentity,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email_verified: true,
            external_identity: Some(identity),
            ..Self::blank(email, first_name, last_name, now)
        }
    }

    fn blank(email: Email, first_name: String, last_name: String, now: DateTime<Utc>) -> Self {
        Self {
            account_id: AccountId::new(),
            email,
            first_name,
            last_name,
            password_hash: None,
            password_history: PasswordHistory::new(),
            password_changed_at: None,
            lockout: LockoutState::default(),
            status: AccountStatus::Active,
            email_verified: false,
            roles: BTreeSet::new(),
            external_identity: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Trim and validate a first/last name
    pub fn validate_person_name(field: &'static str, value: &str) -> AuthResult<String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AuthError::validation(field, "Name is required"));
        }
        if value.chars().count() > PERSON_NAME_MAX_LENGTH {
            return Err(AuthError::validation(
                field,
                format!("Name must be at most {} characters", PERSON_NAME_MAX_LENGTH),
            ));
        }
        Ok(value.to_string())
    }

    pub fn can_login(&self) -> bool {
        self.status.can_login()
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == name)
    }

    /// Push a superseded hash into the bounded history
    pub fn append_password_history(&mut self, old_hash: PasswordHash) {
        self.password_history.push(old_hash);
    }

    /// Replace the current password, moving the old one into history
    pub fn rotate_password(&mut self, new_hash: PasswordHash, now: DateTime<Utc>) {
        if let Some(old) = self.password_hash.replace(new_hash) {
            self.append_password_history(old);
        }
        self.password_changed_at = Some(now);
        self.updated_at = now;
    }

    /// Returns false when already verified (nothing changed)
    pub fn mark_email_verified(&mut self, now: DateTime<Utc>) -> bool {
        if self.email_verified {
            return false;
        }
        self.email_verified = true;
        self.updated_at = now;
        true
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Only an existing `Role` can become a membership
    pub fn assign_role(&mut self, role: &Role) -> bool {
        self.roles.insert(role.name.clone())
    }

    pub fn replace_roles<'a>(&mut self, roles: impl IntoIterator<Item = &'a Role>, now: DateTime<Utc>) {
        self.roles = roles.into_iter().map(|r| r.name.clone()).collect();
        self.updated_at = now;
    }

    /// Replace the provided names (already validated). Returns false when
    /// nothing changed.
    pub fn update_profile(
        &mut self,
        first_name: Option<String>,
        last_name: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let mut changed = false;
        if let Some(first_name) = first_name.filter(|n| *n != self.first_name) {
            self.first_name = first_name;
            changed = true;
        }
        if let Some(last_name) = last_name.filter(|n| *n != self.last_name) {
            self.last_name = last_name;
            changed = true;
        }
        if changed {
            self.updated_at = now;
        }
        changed
    }

    pub fn set_status(&mut self, status: AccountStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn link_external_identity(&mut self, identity: ExternalIdentity, now: DateTime<Utc>) {
        self.external_identity = Some(identity);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::RawPassword;
    use platform::password::Argon2Config;

    fn hash(raw: &str) -> PasswordHash {
        PasswordHash::from_raw(&RawPassword::new(raw).unwrap(), &Argon2Config::insecure_fast())
            .unwrap()
    }

    fn account() -> Account {
        Account::new_local(
            Email::new("a@b.com").unwrap(),
            "Ada".into(),
            "Lovelace".into(),
            hash("Initial-Pass-0"),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_local_defaults() {
        let account = account();
        assert_eq!(account.status, AccountStatus::Active);
        assert!(!account.email_verified);
        assert!(account.roles.is_empty());
        assert!(account.password_history.is_empty());
        assert_eq!(account.lockout.failed_login_count, 0);
    }

    #[test]
    fn test_new_external_is_verified_without_password() {
        let account = Account::new_external(
            Email::new("a@b.com").unwrap(),
            "Ada".into(),
            "Lovelace".into(),
            ExternalIdentity::new("google", "42").unwrap(),
            Utc::now(),
        );
        assert!(account.email_verified);
        assert!(account.password_hash.is_none());
    }

    #[test]
    fn test_rotate_password_keeps_last_five() {
        let mut account = account();
        let first = account.password_hash.clone().unwrap();
        for i in 1..=6 {
            account.rotate_password(hash(&format!("Rotated-Pass-{i}")), Utc::now());
        }
        assert_eq!(account.password_history.len(), PasswordHistory::CAPACITY);
        assert!(account.password_history.iter().all(|h| *h != first));
    }

    #[test]
    fn test_mark_email_verified_once() {
        let mut account = account();
        assert!(account.mark_email_verified(Utc::now()));
        assert!(!account.mark_email_verified(Utc::now()));
    }

    #[test]
    fn test_person_name_validation() {
        assert_eq!(Account::validate_person_name("firstName", "  Ada ").unwrap(), "Ada");
        assert!(Account::validate_person_name("firstName", "   ").is_err());
        assert!(Account::validate_person_name("lastName", &"x".repeat(101)).is_err());
    }

    #[test]
    fn test_update_profile_reports_changes() {
        let mut account = account();
        assert!(!account.update_profile(Some("Ada".into()), None, Utc::now()));
        assert!(account.update_profile(None, Some("Byron".into()), Utc::now()));
        assert_eq!(account.first_name, "Ada");
        assert_eq!(account.last_name, "Byron");
    }
}
