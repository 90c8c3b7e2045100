//! In-Memory Repository Implementation
//!
//! Backs tests and local runs without a database. All state sits behind one
//! async mutex, so every operation (including `modify`) is serialized.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::entity::{Account, AuthEvent, Permission, Role};
use crate::domain::repository::{
    AccountRepository, AuthEventRepository, PermissionRepository, RoleRepository,
};
use crate::domain::value_object::{AccountId, Email, ExternalIdentity, PermissionName, RoleName};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    roles: BTreeMap<RoleName, Role>,
    permissions: BTreeMap<PermissionName, Permission>,
    events: Vec<AuthEvent>,
}

impl MemoryState {
    fn email_taken(&self, email: &Email, except: Option<&AccountId>) -> bool {
        self.accounts
            .values()
            .any(|a| &a.email == email && Some(&a.account_id) != except)
    }

    fn scope_taken(&self, permission: &Permission) -> bool {
        self.permissions
            .values()
            .any(|p| p.name != permission.name && p.same_scope(permission))
    }

    /// Grants must reference stored permissions
    fn check_grants(&self, role: &Role) -> AuthResult<()> {
        if role
            .permissions
            .iter()
            .all(|name| self.permissions.contains_key(name))
        {
            Ok(())
        } else {
            Err(AuthError::NotFound("Permission"))
        }
    }
}

/// In-memory auth repository, seeded with the system roles
#[derive(Clone)]
pub struct InMemoryAuthRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for InMemoryAuthRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        let roles = Role::system_defaults(Utc::now())
            .into_iter()
            .map(|role| (role.name.clone(), role))
            .collect();
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                roles,
                ..Default::default()
            })),
        }
    }

    /// Number of stored events (all accounts)
    pub async fn event_count(&self) -> usize {
        self.state.lock().await.events.len()
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for InMemoryAuthRepository {
    async fn create(&self, account: &Account) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if state.email_taken(&account.email, None) {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        if state.accounts.contains_key(&account.account_id) {
            return Err(AuthError::Conflict("Account already exists".to_string()));
        }
        state.accounts.insert(account.account_id, account.clone());
        Ok(())
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(account_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn find_by_external_identity(
        &self,
        identity: &ExternalIdentity,
    ) -> AuthResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.external_identity.as_ref() == Some(identity))
            .cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        Ok(self.state.lock().await.email_taken(email, None))
    }

    async fn save(&self, account: &Account) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if state.email_taken(&account.email, Some(&account.account_id)) {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        match state.accounts.get_mut(&account.account_id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(AuthError::NotFound("Account")),
        }
    }

    async fn modify<F, T>(&self, account_id: &AccountId, f: F) -> AuthResult<Option<(Account, T)>>
    where
        F: FnOnce(&mut Account) -> T + Send,
        T: Send,
    {
        let mut state = self.state.lock().await;
        Ok(state.accounts.get_mut(account_id).map(|account| {
            let output = f(account);
            (account.clone(), output)
        }))
    }
}

// ============================================================================
// Role Repository Implementation
// ============================================================================

impl RoleRepository for InMemoryAuthRepository {
    async fn create(&self, role: &Role) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if state.roles.contains_key(&role.name) {
            return Err(AuthError::Conflict(format!(
                "Role `{}` already exists",
                role.name
            )));
        }
        state.check_grants(role)?;
        state.roles.insert(role.name.clone(), role.clone());
        Ok(())
    }

    async fn find_by_name(&self, name: &RoleName) -> AuthResult<Option<Role>> {
        Ok(self.state.lock().await.roles.get(name).cloned())
    }

    async fn list(&self) -> AuthResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.state.lock().await.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
        Ok(roles)
    }

    async fn update(&self, role: &Role) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        state.check_grants(role)?;
        match state.roles.get_mut(&role.name) {
            Some(stored) => {
                *stored = role.clone();
                Ok(())
            }
            None => Err(AuthError::NotFound("Role")),
        }
    }

    async fn delete(&self, name: &RoleName) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        state
            .roles
            .remove(name)
            .map(|_| ())
            .ok_or(AuthError::NotFound("Role"))
    }

    async fn count_members(&self, name: &RoleName) -> AuthResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .filter(|a| a.roles.contains(name))
            .count() as u64)
    }
}

// ============================================================================
// Permission Repository Implementation
// ============================================================================

impl PermissionRepository for InMemoryAuthRepository {
    async fn create_permission(&self, permission: &Permission) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if state.permissions.contains_key(&permission.name) || state.scope_taken(permission) {
            return Err(AuthError::Conflict(format!(
                "Permission `{}` already exists",
                permission.name
            )));
        }
        state
            .permissions
            .insert(permission.name.clone(), permission.clone());
        Ok(())
    }

    async fn find_permission(&self, name: &PermissionName) -> AuthResult<Option<Permission>> {
        Ok(self.state.lock().await.permissions.get(name).cloned())
    }

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        let mut permissions: Vec<Permission> =
            self.state.lock().await.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| {
            (&a.module, &a.action, &a.name).cmp(&(&b.module, &b.action, &b.name))
        });
        Ok(permissions)
    }

    async fn update_permission(&self, permission: &Permission) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if state.scope_taken(permission) {
            return Err(AuthError::Conflict(format!(
                "A permission for `{}:{}` already exists",
                permission.module, permission.action
            )));
        }
        match state.permissions.get_mut(&permission.name) {
            Some(stored) => {
                *stored = permission.clone();
                Ok(())
            }
            None => Err(AuthError::NotFound("Permission")),
        }
    }

    async fn delete_permission(&self, name: &PermissionName) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if state.roles.values().any(|r| r.permissions.contains(name)) {
            return Err(AuthError::Conflict(format!(
                "Permission `{}` is granted by a role",
                name
            )));
        }
        state
            .permissions
            .remove(name)
            .map(|_| ())
            .ok_or(AuthError::NotFound("Permission"))
    }

    async fn count_permission_roles(&self, name: &PermissionName) -> AuthResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .roles
            .values()
            .filter(|r| r.permissions.contains(name))
            .count() as u64)
    }
}

// ============================================================================
// Auth Event Repository Implementation
// ============================================================================

impl AuthEventRepository for InMemoryAuthRepository {
    async fn record(&self, event: &AuthEvent) -> AuthResult<()> {
        self.state.lock().await.events.push(event.clone());
        Ok(())
    }

    async fn list_for_account(
        &self,
        account_id: &AccountId,
        limit: u32,
    ) -> AuthResult<Vec<AuthEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .rev()
            .filter(|e| e.account_id.as_ref() == Some(account_id))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
