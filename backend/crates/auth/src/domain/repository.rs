//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use crate::domain::entity::{Account, AuthEvent, Permission, Role};
use crate::domain::value_object::{AccountId, Email, ExternalIdentity, PermissionName, RoleName};
use crate::error::AuthResult;

/// Account repository trait
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Create a new account. Fails with `EmailAlreadyRegistered` on a taken e-mail.
    async fn create(&self, account: &Account) -> AuthResult<()>;

    /// Find account by ID
    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>>;

    /// Find account by e-mail
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Account>>;

    /// Find account linked to an external identity
    async fn find_by_external_identity(
        &self,
        identity: &ExternalIdentity,
    ) -> AuthResult<Option<Account>>;

    /// Check if e-mail is registered
    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    /// Update all mutable fields, role memberships included
    async fn save(&self, account: &Account) -> AuthResult<()>;

    /// Serialized read-modify-write.
    ///
    /// `f` runs while the account is held exclusively; the mutated account is
    /// persisted before the lock is released. `None` if the account is absent.
    async fn modify<F, T>(&self, account_id: &AccountId, f: F) -> AuthResult<Option<(Account, T)>>
    where
        F: FnOnce(&mut Account) -> T + Send,
        T: Send;
}

/// Role repository trait
///
/// Roles are stored together with the names of the permissions they grant.
#[trait_variant::make(RoleRepository: Send)]
pub trait LocalRoleRepository {
    async fn create(&self, role: &Role) -> AuthResult<()>;

    async fn find_by_name(&self, name: &RoleName) -> AuthResult<Option<Role>>;

    /// All roles, ordered by level then name
    async fn list(&self) -> AuthResult<Vec<Role>>;

    async fn update(&self, role: &Role) -> AuthResult<()>;

    async fn delete(&self, name: &RoleName) -> AuthResult<()>;

    /// Number of accounts holding the role
    async fn count_members(&self, name: &RoleName) -> AuthResult<u64>;
}

/// Permission repository trait
#[trait_variant::make(PermissionRepository: Send)]
pub trait LocalPermissionRepository {
    /// Fails with `Conflict` on a taken name or `(module, action)` pair
    async fn create_permission(&self, permission: &Permission) -> AuthResult<()>;

    async fn find_permission(&self, name: &PermissionName) -> AuthResult<Option<Permission>>;

    /// All permissions, ordered by module, action, then name
    async fn list_permissions(&self) -> AuthResult<Vec<Permission>>;

    async fn update_permission(&self, permission: &Permission) -> AuthResult<()>;

    async fn delete_permission(&self, name: &PermissionName) -> AuthResult<()>;

    /// Number of roles granting the permission
    async fn count_permission_roles(&self, name: &PermissionName) -> AuthResult<u64>;
}

/// Auth event repository trait
#[trait_variant::make(AuthEventRepository: Send)]
pub trait LocalAuthEventRepository {
    /// Append an event
    async fn record(&self, event: &AuthEvent) -> AuthResult<()>;

    /// Most recent events first
    async fn list_for_account(
        &self,
        account_id: &AccountId,
        limit: u32,
    ) -> AuthResult<Vec<AuthEvent>>;
}
