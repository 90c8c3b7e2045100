//! Update Profile Use Case
//!
//! Account holders edit their own first and last name. An omitted or blank
//! name keeps the current value.

use std::sync::Arc;

use chrono::Utc;

use crate::application::audit::record_event;
use crate::domain::entity::{Account, AuthEventKind};
use crate::domain::repository::{AccountRepository, AuthEventRepository};
use crate::domain::value_object::AccountId;
use crate::error::{AuthError, AuthResult};

/// Update profile input
pub struct UpdateProfileInput {
    pub account_id: AccountId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub ip_address: Option<String>,
}

pub struct UpdateProfileUseCase<R>
where
    R: AccountRepository + AuthEventRepository + Sync,
{
    repo: Arc<R>,
}

impl<R> UpdateProfileUseCase<R>
where
    R: AccountRepository + AuthEventRepository + Sync,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, input: UpdateProfileInput) -> AuthResult<Account> {
        let first_name = provided_name("firstName", input.first_name)?;
        let last_name = provided_name("lastName", input.last_name)?;

        let now = Utc::now();
        let (account, changed) = self
            .repo
            .modify(&input.account_id, move |acc| {
                acc.update_profile(first_name, last_name, now)
            })
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        if changed {
            record_event(
                self.repo.as_ref(),
                AuthEventKind::ProfileUpdated,
                Some(account.account_id),
                account.email.as_str(),
                input.ip_address.as_deref(),
            )
            .await?;
            tracing::info!(account_id = %account.account_id, "Profile updated");
        }

        Ok(account)
    }
}

fn provided_name(field: &'static str, value: Option<String>) -> AuthResult<Option<String>> {
    match value {
        Some(value) if !value.trim().is_empty() => {
            Account::validate_person_name(field, &value).map(Some)
        }
        _ => Ok(None),
    }
}
