//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::entity::{Account, AuthEvent, AuthEventKind, Permission, Role};
use crate::domain::repository::{
    AccountRepository, AuthEventRepository, PermissionRepository, RoleRepository,
};
use crate::domain::service::LockoutState;
use crate::domain::value_object::{
    AccountId, AccountStatus, AuthEventId, Email, ExternalIdentity, PasswordHash,
    PasswordHistory, PermissionName, RoleName,
};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

const ACCOUNT_COLUMNS: &str = r#"
    a.account_id,
    a.email,
    a.first_name,
    a.last_name,
    a.password_hash,
    a.password_history,
    a.password_changed_at,
    a.failed_login_count,
    a.locked_until,
    a.status,
    a.email_verified,
    a.external_provider,
    a.external_subject,
    a.last_login_at,
    a.created_at,
    a.updated_at,
    ARRAY(
        SELECT ar.role_name FROM account_roles ar
        WHERE ar.account_id = a.account_id
        ORDER BY ar.role_name
    ) AS roles
"#;

const ROLE_COLUMNS: &str = r#"
    r.name,
    r.description,
    r.is_system_role,
    r.level,
    r.created_at,
    r.updated_at,
    ARRAY(
        SELECT rp.permission_name FROM role_permissions rp
        WHERE rp.role_name = r.name
        ORDER BY rp.permission_name
    ) AS permissions
"#;

const PERMISSION_COLUMNS: &str = "name, description, module, action, created_at, updated_at";

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the permission grants of a role
    async fn write_role_permissions(conn: &mut PgConnection, role: &Role) -> AuthResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_name = $1")
            .bind(role.name.as_str())
            .execute(&mut *conn)
            .await?;

        if role.permissions.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = role
            .permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        sqlx::query(
            "INSERT INTO role_permissions (role_name, permission_name) SELECT $1, UNNEST($2::text[])",
        )
        .bind(role.name.as_str())
        .bind(names)
        .execute(&mut *conn)
        .await
        .map_err(map_grant_error)?;
        Ok(())
    }

    async fn fetch_account(&self, filter: &str, bind: AccountKey<'_>) -> AuthResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE {filter}");
        let query = sqlx::query_as::<_, AccountRow>(&sql);
        let query = match bind {
            AccountKey::Id(id) => query.bind(*id.as_uuid()),
            AccountKey::Email(email) => query.bind(email.as_str().to_string()),
            AccountKey::Identity(identity) => query
                .bind(identity.provider().to_string())
                .bind(identity.subject().to_string()),
        };
        let row = query.fetch_optional(&self.pool).await?;
        row.map(|r| r.into_account()).transpose()
    }

    /// Write every mutable column plus role memberships
    async fn write_account(conn: &mut PgConnection, account: &Account) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                first_name = $2,
                last_name = $3,
                password_hash = $4,
                password_history = $5,
                password_changed_at = $6,
                failed_login_count = $7,
                locked_until = $8,
                status = $9,
                email_verified = $10,
                external_provider = $11,
                external_subject = $12,
                last_login_at = $13,
                updated_at = $14
            WHERE account_id = $1
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.password_hash.as_ref().map(|h| h.as_phc_string()))
        .bind(account.password_history.to_phc_strings())
        .bind(account.password_changed_at)
        .bind(failed_count_to_db(account.lockout.failed_login_count))
        .bind(account.lockout.locked_until)
        .bind(account.status.id())
        .bind(account.email_verified)
        .bind(account.external_identity.as_ref().map(|i| i.provider()))
        .bind(account.external_identity.as_ref().map(|i| i.subject()))
        .bind(account.last_login_at)
        .bind(account.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(map_account_write_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("Account"));
        }

        sqlx::query("DELETE FROM account_roles WHERE account_id = $1")
            .bind(account.account_id.as_uuid())
            .execute(&mut *conn)
            .await?;
        Self::insert_roles(conn, account).await
    }

    async fn insert_roles(conn: &mut PgConnection, account: &Account) -> AuthResult<()> {
        if account.roles.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = account.roles.iter().map(|r| r.as_str().to_string()).collect();
        sqlx::query(
            "INSERT INTO account_roles (account_id, role_name) SELECT $1, UNNEST($2::text[])",
        )
        .bind(account.account_id.as_uuid())
        .bind(names)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

enum AccountKey<'a> {
    Id(&'a AccountId),
    Email(&'a Email),
    Identity(&'a ExternalIdentity),
}

fn failed_count_to_db(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// A grant naming a missing permission violates the foreign key
fn map_grant_error(err: sqlx::Error) -> AuthError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AuthError::NotFound("Permission")
        }
        _ => AuthError::Database(err),
    }
}

/// Unique violations on `permissions` (name or scope) become conflicts
fn map_permission_write_error(err: sqlx::Error, permission: &Permission) -> AuthError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::Conflict(format!("Permission `{}` already exists", permission.name))
        }
        _ => AuthError::Database(err),
    }
}

/// Unique violations on `accounts` become domain errors
fn map_account_write_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some(c) if c.contains("email") => AuthError::EmailAlreadyRegistered,
                _ => AuthError::Conflict("External identity is already linked".to_string()),
            };
        }
    }
    AuthError::Database(err)
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgAuthRepository {
    async fn create(&self, account: &Account) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id,
                email,
                first_name,
                last_name,
                password_hash,
                password_history,
                password_changed_at,
                failed_login_count,
                locked_until,
                status,
                email_verified,
                external_provider,
                external_subject,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(account.email.as_str())
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.password_hash.as_ref().map(|h| h.as_phc_string()))
        .bind(account.password_history.to_phc_strings())
        .bind(account.password_changed_at)
        .bind(failed_count_to_db(account.lockout.failed_login_count))
        .bind(account.lockout.locked_until)
        .bind(account.status.id())
        .bind(account.email_verified)
        .bind(account.external_identity.as_ref().map(|i| i.provider()))
        .bind(account.external_identity.as_ref().map(|i| i.subject()))
        .bind(account.last_login_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_account_write_error)?;

        Self::insert_roles(&mut *tx, account).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>> {
        self.fetch_account("a.account_id = $1", AccountKey::Id(account_id))
            .await
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Account>> {
        self.fetch_account("a.email = $1", AccountKey::Email(email))
            .await
    }

    async fn find_by_external_identity(
        &self,
        identity: &ExternalIdentity,
    ) -> AuthResult<Option<Account>> {
        self.fetch_account(
            "a.external_provider = $1 AND a.external_subject = $2",
            AccountKey::Identity(identity),
        )
        .await
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)",
        )
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn save(&self, account: &Account) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::write_account(&mut *tx, account).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn modify<F, T>(&self, account_id: &AccountId, f: F) -> AuthResult<Option<(Account, T)>>
    where
        F: FnOnce(&mut Account) -> T + Send,
        T: Send,
    {
        let mut tx = self.pool.begin().await?;

        // Row lock held until commit; concurrent attempts queue here.
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE a.account_id = $1 FOR UPDATE OF a"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut account = row.into_account()?;
        let output = f(&mut account);

        Self::write_account(&mut *tx, &account).await?;
        tx.commit().await?;

        Ok(Some((account, output)))
    }
}

// ============================================================================
// Role Repository Implementation
// ============================================================================

impl RoleRepository for PgAuthRepository {
    async fn create(&self, role: &Role) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO roles (
                name,
                description,
                is_system_role,
                level,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.name.as_str())
        .bind(&role.description)
        .bind(role.is_system_role)
        .bind(role.level)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuthError::Conflict(format!("Role `{}` already exists", role.name))
            }
            _ => AuthError::Database(e),
        })?;

        Self::write_role_permissions(&mut *tx, role).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn find_by_name(&self, name: &RoleName) -> AuthResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles r WHERE r.name = $1");
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(RoleRow::into_role))
    }

    async fn list(&self) -> AuthResult<Vec<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles r ORDER BY r.level, r.name");
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RoleRow::into_role).collect())
    }

    async fn update(&self, role: &Role) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE roles SET
                description = $2,
                level = $3,
                updated_at = $4
            WHERE name = $1 AND NOT is_system_role
            "#,
        )
        .bind(role.name.as_str())
        .bind(&role.description)
        .bind(role.level)
        .bind(role.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("Role"));
        }

        Self::write_role_permissions(&mut *tx, role).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, name: &RoleName) -> AuthResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE name = $1 AND NOT is_system_role")
            .bind(name.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("Role"));
        }
        Ok(())
    }

    async fn count_members(&self, name: &RoleName) -> AuthResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM account_roles WHERE role_name = $1",
        )
        .bind(name.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

// ============================================================================
// Permission Repository Implementation
// ============================================================================

impl PermissionRepository for PgAuthRepository {
    async fn create_permission(&self, permission: &Permission) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions (
                name,
                description,
                module,
                action,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(permission.name.as_str())
        .bind(&permission.description)
        .bind(&permission.module)
        .bind(&permission.action)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_permission_write_error(e, permission))?;

        Ok(())
    }

    async fn find_permission(&self, name: &PermissionName) -> AuthResult<Option<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE name = $1");
        let row = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PermissionRow::into_permission))
    }

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        let sql =
            format!("SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY module, action, name");
        let rows = sqlx::query_as::<_, PermissionRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PermissionRow::into_permission).collect())
    }

    async fn update_permission(&self, permission: &Permission) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE permissions SET
                description = $2,
                module = $3,
                action = $4,
                updated_at = $5
            WHERE name = $1
            "#,
        )
        .bind(permission.name.as_str())
        .bind(&permission.description)
        .bind(&permission.module)
        .bind(&permission.action)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_permission_write_error(e, permission))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("Permission"));
        }
        Ok(())
    }

    async fn delete_permission(&self, name: &PermissionName) -> AuthResult<()> {
        let result = sqlx::query("DELETE FROM permissions WHERE name = $1")
            .bind(name.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    AuthError::Conflict(format!("Permission `{}` is granted by a role", name))
                }
                _ => AuthError::Database(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("Permission"));
        }
        Ok(())
    }

    async fn count_permission_roles(&self, name: &PermissionName) -> AuthResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM role_permissions WHERE permission_name = $1",
        )
        .bind(name.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

// ============================================================================
// Auth Event Repository Implementation
// ============================================================================

impl AuthEventRepository for PgAuthRepository {
    async fn record(&self, event: &AuthEvent) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_events (
                event_id,
                account_id,
                email,
                kind,
                ip_address,
                occurred_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(event.account_id.map(|id| id.into_uuid()))
        .bind(&event.email)
        .bind(event.kind.code())
        .bind(&event.ip_address)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_account(
        &self,
        account_id: &AccountId,
        limit: u32,
    ) -> AuthResult<Vec<AuthEvent>> {
        let rows = sqlx::query_as::<_, AuthEventRow>(
            r#"
            SELECT event_id, account_id, email, kind, ip_address, occurred_at
            FROM auth_events
            WHERE account_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuthEventRow::into_event).collect()
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    account_id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: Option<String>,
    password_history: Vec<String>,
    password_changed_at: Option<DateTime<Utc>>,
    failed_login_count: i32,
    locked_until: Option<DateTime<Utc>>,
    status: i16,
    email_verified: bool,
    external_provider: Option<String>,
    external_subject: Option<String>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    roles: Vec<String>,
}

impl AccountRow {
    fn into_account(self) -> AuthResult<Account> {
        let status = AccountStatus::from_id(self.status)
            .ok_or_else(|| AuthError::Internal(format!("Invalid account status: {}", self.status)))?;

        let external_identity = match (self.external_provider, self.external_subject) {
            (Some(provider), Some(subject)) => Some(ExternalIdentity::from_db(provider, subject)),
            _ => None,
        };

        Ok(Account {
            account_id: AccountId::from_uuid(self.account_id),
            email: Email::from_db(self.email),
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self
                .password_hash
                .map(PasswordHash::from_phc_string)
                .transpose()?,
            password_history: PasswordHistory::from_phc_strings(self.password_history)?,
            password_changed_at: self.password_changed_at,
            lockout: LockoutState {
                failed_login_count: u32::try_from(self.failed_login_count).unwrap_or(0),
                locked_until: self.locked_until,
            },
            status,
            email_verified: self.email_verified,
            roles: self.roles.into_iter().map(RoleName::from_db).collect(),
            external_identity,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    name: String,
    description: Option<String>,
    is_system_role: bool,
    level: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    permissions: Vec<String>,
}

impl RoleRow {
    fn into_role(self) -> Role {
        Role {
            name: RoleName::from_db(self.name),
            description: self.description,
            is_system_role: self.is_system_role,
            level: self.level,
            permissions: self
                .permissions
                .into_iter()
                .map(PermissionName::from_db)
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PermissionRow {
    name: String,
    description: Option<String>,
    module: String,
    action: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRow {
    fn into_permission(self) -> Permission {
        Permission {
            name: PermissionName::from_db(self.name),
            description: self.description,
            module: self.module,
            action: self.action,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthEventRow {
    event_id: Uuid,
    account_id: Option<Uuid>,
    email: String,
    kind: String,
    ip_address: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl AuthEventRow {
    fn into_event(self) -> AuthResult<AuthEvent> {
        let kind = AuthEventKind::from_code(&self.kind)
            .ok_or_else(|| AuthError::Internal(format!("Invalid auth event kind: {}", self.kind)))?;

        Ok(AuthEvent {
            event_id: AuthEventId::from_uuid(self.event_id),
            account_id: self.account_id.map(AccountId::from_uuid),
            email: self.email,
            kind,
            ip_address: self.ip_address,
            occurred_at: self.occurred_at,
        })
    }
}
