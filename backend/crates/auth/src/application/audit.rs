//! Auth event recording shared by the use cases

use chrono::Utc;

use crate::domain::entity::{AuthEvent, AuthEventKind};
use crate::domain::repository::AuthEventRepository;
use crate::domain::value_object::AccountId;
use crate::error::AuthResult;

/// Append an auth event. Write failures are propagated.
pub(crate) async fn record_event<R>(
    repo: &R,
    kind: AuthEventKind,
    account_id: Option<AccountId>,
    email: &str,
    ip_address: Option<&str>,
) -> AuthResult<()>
where
    R: AuthEventRepository + Sync,
{
    let event = AuthEvent::new(
        kind,
        account_id,
        email,
        ip_address.map(str::to_string),
        Utc::now(),
    );
    repo.record(&event).await
}
