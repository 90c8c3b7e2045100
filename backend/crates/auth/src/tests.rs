//! End-to-end flow tests over the in-memory store

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;

use crate::application::{
    AuthConfig, AuthService, ChangePasswordInput, CreatePermissionInput, CreateRoleInput,
    ExternalLoginInput, LoginInput, Notifier, RegisterInput, ResetPasswordInput,
    SuperAdminConfig, SuperAdminLoginInput, TokenPurpose, UpdatePermissionInput,
    UpdateProfileInput, UpdateRoleInput, VerifyEmailOutcome,
};
use crate::domain::entity::{Account, AuthEventKind};
use crate::domain::repository::AccountRepository;
use crate::domain::service::PasswordRule;
use crate::domain::service::role_resolver;
use crate::domain::value_object::{
    AccountId, AccountStatus, Claims, Email, PasswordHash, RawPassword, RoleName,
};
use crate::error::{AuthError, AuthResult};
use crate::infra::InMemoryAuthRepository;
use crate::presentation::auth_router_generic;

const PASSWORD: &str = "Str0ng!Passw0rd";
const ROOT_EMAIL: &str = "root@example.com";
const ROOT_PASSWORD: &str = "Bootstrap#Secret1";

/// Captures every outgoing link as `(email, token)`
#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    async fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }

    async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Notifier for RecordingNotifier {
    async fn send_verification(&self, email: &Email, token: &str) -> AuthResult<()> {
        self.sent
            .lock()
            .await
            .push((email.as_str().to_string(), token.to_string()));
        Ok(())
    }

    async fn send_password_reset(&self, email: &Email, token: &str) -> AuthResult<()> {
        self.sent
            .lock()
            .await
            .push((email.as_str().to_string(), token.to_string()));
        Ok(())
    }
}

type TestService = AuthService<InMemoryAuthRepository, RecordingNotifier>;

fn service_with(config: AuthConfig) -> (TestService, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let service = AuthService::new(InMemoryAuthRepository::new(), notifier.clone(), config)
        .unwrap();
    (service, notifier)
}

fn service() -> (TestService, RecordingNotifier) {
    service_with(AuthConfig::development())
}

fn root_config() -> AuthConfig {
    root_config_for(AuthConfig::development(), ROOT_EMAIL)
}

fn root_config_for(config: AuthConfig, email: &str) -> AuthConfig {
    let hash = PasswordHash::from_raw(&RawPassword::new(ROOT_PASSWORD).unwrap(), &config.argon2)
        .unwrap();
    config.with_super_admin(SuperAdminConfig {
        email: Email::new(email).unwrap(),
        password_hash: hash,
    })
}

async fn register(service: &TestService, email: &str) -> Account {
    service
        .register(RegisterInput {
            email: email.into(),
            password: PASSWORD.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            ip_address: Some("203.0.113.7".into()),
        })
        .await
        .unwrap()
        .account
}

async fn login(service: &TestService, email: &str, password: &str) -> AuthResult<Claims> {
    service
        .login(LoginInput {
            email: email.into(),
            password: password.into(),
            remember_me: false,
            ip_address: None,
        })
        .await
        .map(|output| output.claims)
}

async fn change(
    service: &TestService,
    account_id: AccountId,
    current: &str,
    new: &str,
) -> AuthResult<()> {
    service
        .change_password(ChangePasswordInput {
            account_id,
            current_password: current.into(),
            new_password: new.into(),
            ip_address: None,
        })
        .await
}

async fn reload(service: &TestService, id: &AccountId) -> Account {
    service
        .repository()
        .find_by_id(id)
        .await
        .unwrap()
        .unwrap()
}

/// Claims of an administrator that is not backed by a stored account
fn admin_claims() -> Claims {
    Claims {
        subject: AccountId::new().to_string(),
        email: "admin@example.com".into(),
        roles: [RoleName::admin()].into(),
        permissions: Default::default(),
        is_admin: true,
        is_super_admin: false,
    }
}

fn root_claims() -> Claims {
    role_resolver::bootstrap_claims(ROOT_EMAIL)
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_creates_unverified_user() {
    let (service, notifier) = service();
    let account = register(&service, "  Ada@Example.com ").await;

    assert_eq!(account.email.as_str(), "ada@example.com");
    assert!(!account.email_verified);
    assert_eq!(account.status, AccountStatus::Active);
    assert!(account.has_role(RoleName::USER));
    assert_eq!(account.roles.len(), 1);
    assert!(notifier.last_token_for("ada@example.com").await.is_some());
}

#[tokio::test]
async fn test_register_rejects_weak_password_with_every_reason() {
    let (service, _) = service();
    let err = service
        .register(RegisterInput {
            email: "weak@example.com".into(),
            password: "Weak1!".into(),
            first_name: "Weak".into(),
            last_name: "Password".into(),
            ip_address: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::WeakPassword(rules) if rules == vec![PasswordRule::Length]));
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() {
    let (service, _) = service();
    register(&service, "dup@example.com").await;
    let err = service
        .register(RegisterInput {
            email: "DUP@example.com".into(),
            password: PASSWORD.into(),
            first_name: "Other".into(),
            last_name: "Person".into(),
            ip_address: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailAlreadyRegistered));
}

#[tokio::test]
async fn test_register_requires_names() {
    let (service, _) = service();
    let err = service
        .register(RegisterInput {
            email: "noname@example.com".into(),
            password: PASSWORD.into(),
            first_name: "   ".into(),
            last_name: "Person".into(),
            ip_address: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation { field: "firstName", .. }));
}

// ============================================================================
// Login and lockout
// ============================================================================

#[tokio::test]
async fn test_login_issues_token_with_roles() {
    let (service, _) = service();
    let account = register(&service, "login@example.com").await;

    let output = service
        .login(LoginInput {
            email: "login@example.com".into(),
            password: PASSWORD.into(),
            remember_me: false,
            ip_address: None,
        })
        .await
        .unwrap();

    let claims = service.authorize(&output.token.token).unwrap();
    assert_eq!(claims.subject, account.account_id.to_string());
    assert_eq!(
        claims.roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        vec!["user"]
    );
    assert!(!claims.is_admin);
    assert!(!claims.is_super_admin);

    let stored = reload(&service, &account.account_id).await;
    assert!(stored.last_login_at.is_some());
}

#[tokio::test]
async fn test_unknown_email_gives_generic_error() {
    let (service, _) = service();
    let err = login(&service, "nobody@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { attempts_left: None }));
}

#[tokio::test]
async fn test_five_failures_lock_the_account() {
    let (service, _) = service();
    let account = register(&service, "lock@example.com").await;

    for expected_left in (0..5).rev() {
        let err = login(&service, "lock@example.com", "Wrong!Passw0rd")
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthError::InvalidCredentials { attempts_left: Some(left) } if left == expected_left),
            "unexpected {err:?}"
        );
    }

    let err = login(&service, "lock@example.com", PASSWORD).await.unwrap_err();
    match err {
        AuthError::AccountLocked { retry_after } => {
            assert!(retry_after.as_secs() > 29 * 60);
            assert!(retry_after.as_secs() <= 30 * 60);
        }
        other => panic!("expected lock, got {other:?}"),
    }

    let events = service
        .login_history(&admin_claims(), &account.account_id, None)
        .await
        .unwrap();
    assert_eq!(events[0].kind, AuthEventKind::LoginRejectedLocked);
    assert!(events.iter().any(|e| e.kind == AuthEventKind::AccountLocked));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_lock_exactly_once() {
    let (service, _) = service();
    let account = register(&service, "burst@example.com").await;

    let attempts: Vec<_> = (0..10)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                login(&service, "burst@example.com", "Wrong!Passw0rd").await
            })
        })
        .collect();
    for attempt in attempts {
        let err = attempt.await.unwrap().unwrap_err();
        assert!(
            matches!(
                err,
                AuthError::InvalidCredentials { .. } | AuthError::AccountLocked { .. }
            ),
            "unexpected {err:?}"
        );
    }

    let stored = reload(&service, &account.account_id).await;
    assert_eq!(stored.lockout.failed_login_count, 5);
    assert!(stored.lockout.locked_until.is_some());

    let events = service
        .login_history(&admin_claims(), &account.account_id, None)
        .await
        .unwrap();
    let locks = events
        .iter()
        .filter(|e| e.kind == AuthEventKind::AccountLocked)
        .count();
    assert_eq!(locks, 1);

    assert!(matches!(
        login(&service, "burst@example.com", PASSWORD).await,
        Err(AuthError::AccountLocked { .. })
    ));
}

#[tokio::test]
async fn test_lock_expires_and_counter_resets() {
    let (service, _) = service();
    let account = register(&service, "expire@example.com").await;
    for _ in 0..5 {
        let _ = login(&service, "expire@example.com", "Wrong!Passw0rd").await;
    }

    // Let the lock run out
    service
        .repository()
        .modify(&account.account_id, |acc| {
            acc.lockout.locked_until = Some(Utc::now() - Duration::seconds(1));
        })
        .await
        .unwrap();

    login(&service, "expire@example.com", PASSWORD).await.unwrap();
    let stored = reload(&service, &account.account_id).await;
    assert_eq!(stored.lockout.failed_login_count, 0);
    assert!(stored.lockout.locked_until.is_none());
}

#[tokio::test]
async fn test_expired_lock_starts_a_fresh_count() {
    let (service, _) = service();
    let account = register(&service, "fresh@example.com").await;
    for _ in 0..5 {
        let _ = login(&service, "fresh@example.com", "Wrong!Passw0rd").await;
    }
    service
        .repository()
        .modify(&account.account_id, |acc| {
            acc.lockout.locked_until = Some(Utc::now() - Duration::seconds(1));
        })
        .await
        .unwrap();

    let err = login(&service, "fresh@example.com", "Wrong!Passw0rd")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { attempts_left: Some(4) }));
}

#[tokio::test]
async fn test_success_resets_failure_counter() {
    let (service, _) = service();
    let account = register(&service, "reset-count@example.com").await;
    for _ in 0..3 {
        let _ = login(&service, "reset-count@example.com", "Wrong!Passw0rd").await;
    }
    assert_eq!(reload(&service, &account.account_id).await.lockout.failed_login_count, 3);

    login(&service, "reset-count@example.com", PASSWORD).await.unwrap();
    assert_eq!(reload(&service, &account.account_id).await.lockout.failed_login_count, 0);

    let err = login(&service, "reset-count@example.com", "Wrong!Passw0rd")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { attempts_left: Some(4) }));
}

#[tokio::test]
async fn test_inactive_account_cannot_login() {
    let (service, _) = service();
    let account = register(&service, "inactive@example.com").await;
    service
        .set_status(&admin_claims(), &account.account_id, AccountStatus::Suspended)
        .await
        .unwrap();

    let err = login(&service, "inactive@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountNotActive));
}

#[tokio::test]
async fn test_remember_me_extends_token() {
    let (service, _) = service();
    register(&service, "remember@example.com").await;
    let output = service
        .login(LoginInput {
            email: "remember@example.com".into(),
            password: PASSWORD.into(),
            remember_me: true,
            ip_address: None,
        })
        .await
        .unwrap();

    let verified = service.tokens().verify_access(&output.token.token).unwrap();
    assert!(verified.remember_me);
    assert_eq!(verified.expires_at - verified.issued_at, Duration::days(7));
}

// ============================================================================
// E-mail verification
// ============================================================================

#[tokio::test]
async fn test_verify_email_is_idempotent() {
    let (service, notifier) = service();
    let account = register(&service, "verify@example.com").await;
    let token = notifier.last_token_for("verify@example.com").await.unwrap();

    assert_eq!(
        service.verify_email(&token).await.unwrap(),
        VerifyEmailOutcome::Verified
    );
    assert_eq!(
        service.verify_email(&token).await.unwrap(),
        VerifyEmailOutcome::AlreadyVerified
    );
    assert!(reload(&service, &account.account_id).await.email_verified);
}

#[tokio::test]
async fn test_tokens_are_bound_to_their_purpose() {
    let (service, notifier) = service();
    register(&service, "purpose@example.com").await;
    let verification = notifier.last_token_for("purpose@example.com").await.unwrap();

    // A verification link cannot reset a password or authenticate
    let err = service
        .reset_password(ResetPasswordInput {
            token: verification.clone(),
            new_password: "An0ther!Passw0rd".into(),
            ip_address: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid));
    assert!(matches!(
        service.authorize(&verification),
        Err(AuthError::TokenInvalid)
    ));

    // A reset link cannot verify an e-mail
    service
        .request_password_reset("purpose@example.com", None)
        .await
        .unwrap();
    let reset = notifier.last_token_for("purpose@example.com").await.unwrap();
    assert!(service.tokens().verify_action(&reset, TokenPurpose::PasswordReset).is_ok());
    assert!(matches!(
        service.verify_email(&reset).await,
        Err(AuthError::TokenInvalid)
    ));
}

#[tokio::test]
async fn test_resend_verification_is_opaque() {
    let (service, notifier) = service();
    register(&service, "resend@example.com").await;
    let before = notifier.count().await;

    service.resend_verification("resend@example.com").await.unwrap();
    assert_eq!(notifier.count().await, before + 1);

    service.resend_verification("ghost@example.com").await.unwrap();
    assert_eq!(notifier.count().await, before + 1);
}

// ============================================================================
// Password change and reset
// ============================================================================

#[tokio::test]
async fn test_change_password_rejects_recent_passwords() {
    let (service, _) = service();
    let account = register(&service, "history@example.com").await;
    let id = account.account_id;

    let passwords = [PASSWORD, "Sec0nd!Password", "Th1rd!Password", "F0urth!Password"];
    for pair in passwords.windows(2) {
        change(&service, id, pair[0], pair[1]).await.unwrap();
    }

    let current = passwords[3];
    for reused in &passwords {
        let err = change(&service, id, current, reused).await.unwrap_err();
        assert!(matches!(err, AuthError::PasswordReused), "{reused}");
    }

    change(&service, id, current, "F1fth!Password").await.unwrap();
    login(&service, "history@example.com", "F1fth!Password").await.unwrap();
    assert!(matches!(
        login(&service, "history@example.com", PASSWORD).await,
        Err(AuthError::InvalidCredentials { .. })
    ));
}

#[tokio::test]
async fn test_change_password_requires_current_password() {
    let (service, _) = service();
    let account = register(&service, "current@example.com").await;
    let err = change(&service, account.account_id, "Wrong!Passw0rd", "Brand!New1Pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { attempts_left: None }));

    let err = change(&service, account.account_id, PASSWORD, "weak")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (service, notifier) = service();
    let account = register(&service, "forgot@example.com").await;

    service
        .request_password_reset("forgot@example.com", Some("198.51.100.1"))
        .await
        .unwrap();
    let token = notifier.last_token_for("forgot@example.com").await.unwrap();

    let reused = service
        .reset_password(ResetPasswordInput {
            token: token.clone(),
            new_password: PASSWORD.into(),
            ip_address: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(reused, AuthError::PasswordReused));

    service
        .reset_password(ResetPasswordInput {
            token,
            new_password: "Rec0vered!Pass".into(),
            ip_address: None,
        })
        .await
        .unwrap();

    login(&service, "forgot@example.com", "Rec0vered!Pass").await.unwrap();
    let stored = reload(&service, &account.account_id).await;
    assert_eq!(stored.password_history.len(), 1);
}

#[tokio::test]
async fn test_reset_request_is_opaque() {
    let (service, notifier) = service();
    service
        .request_password_reset("ghost@example.com", None)
        .await
        .unwrap();
    assert_eq!(notifier.count().await, 0);

    assert!(matches!(
        service.request_password_reset("not-an-email", None).await,
        Err(AuthError::Validation { .. })
    ));
}

#[tokio::test]
async fn test_reset_does_not_lift_lockout() {
    let (service, notifier) = service();
    register(&service, "locked-reset@example.com").await;
    for _ in 0..5 {
        let _ = login(&service, "locked-reset@example.com", "Wrong!Passw0rd").await;
    }

    service
        .request_password_reset("locked-reset@example.com", None)
        .await
        .unwrap();
    let token = notifier
        .last_token_for("locked-reset@example.com")
        .await
        .unwrap();
    service
        .reset_password(ResetPasswordInput {
            token,
            new_password: "Rec0vered!Pass".into(),
            ip_address: None,
        })
        .await
        .unwrap();

    assert!(matches!(
        login(&service, "locked-reset@example.com", "Rec0vered!Pass").await,
        Err(AuthError::AccountLocked { .. })
    ));
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_force_unlock_requires_admin() {
    let (service, _) = service();
    let account = register(&service, "unlock@example.com").await;
    for _ in 0..5 {
        let _ = login(&service, "unlock@example.com", "Wrong!Passw0rd").await;
    }

    let other = register(&service, "other@example.com").await;
    let user_claims = role_resolver::claims_for(&other, &[]);
    assert!(matches!(
        service.force_unlock(&user_claims, &account.account_id).await,
        Err(AuthError::Forbidden)
    ));

    service
        .force_unlock(&admin_claims(), &account.account_id)
        .await
        .unwrap();
    login(&service, "unlock@example.com", PASSWORD).await.unwrap();

    assert!(matches!(
        service.force_unlock(&admin_claims(), &AccountId::new()).await,
        Err(AuthError::NotFound("Account"))
    ));
}

#[tokio::test]
async fn test_assign_roles() {
    let (service, _) = service();
    let account = register(&service, "promote@example.com").await;
    let id = account.account_id;

    let err = service
        .assign_roles(&admin_claims(), &id, &["user".into(), "ghost".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound("Role")));
    assert_eq!(reload(&service, &id).await.roles.len(), 1);

    let err = service
        .assign_roles(&admin_claims(), &id, &["super_admin".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));

    let updated = service
        .assign_roles(&admin_claims(), &id, &["user".into(), "admin".into()])
        .await
        .unwrap();
    assert!(updated.has_role(RoleName::ADMIN));

    let claims = login(&service, "promote@example.com", PASSWORD).await.unwrap();
    assert!(claims.is_admin);
    assert!(!claims.is_super_admin);
}

#[tokio::test]
async fn test_admin_cannot_change_own_status() {
    let (service, _) = service();
    let account = register(&service, "self@example.com").await;
    let mut claims = role_resolver::claims_for(&account, &[]);
    claims.is_admin = true;

    let err = service
        .set_status(&claims, &account.account_id, AccountStatus::Inactive)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation { field: "status", .. }));
}

#[tokio::test]
async fn test_login_history_visibility() {
    let (service, _) = service();
    let account = register(&service, "audit@example.com").await;
    let other = register(&service, "nosy@example.com").await;
    login(&service, "audit@example.com", PASSWORD).await.unwrap();

    let own = role_resolver::claims_for(&account, &[]);
    let events = service
        .login_history(&own, &account.account_id, Some(1))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AuthEventKind::LoginSucceeded);

    let nosy = role_resolver::claims_for(&other, &[]);
    assert!(matches!(
        service.login_history(&nosy, &account.account_id, None).await,
        Err(AuthError::Forbidden)
    ));
}

#[tokio::test]
async fn test_role_administration() {
    let (service, _) = service();
    let root = root_claims();

    assert!(matches!(
        service
            .create_role(
                &admin_claims(),
                CreateRoleInput {
                    name: "editor".into(),
                    description: None,
                    level: 10,
                    permissions: vec![],
                }
            )
            .await,
        Err(AuthError::Forbidden)
    ));

    let role = service
        .create_role(
            &root,
            CreateRoleInput {
                name: "editor".into(),
                description: Some("Edits content".into()),
                level: 10,
                permissions: vec![],
            },
        )
        .await
        .unwrap();
    assert!(!role.is_system_role);

    let names: Vec<String> = service
        .list_roles(&admin_claims())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name.as_str().to_string())
        .collect();
    assert_eq!(names, vec!["user", "editor", "admin", "super_admin"]);

    let updated = service
        .update_role(
            &root,
            "editor",
            UpdateRoleInput {
                description: None,
                level: Some(20),
                permissions: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.level, 20);
    assert_eq!(updated.description.as_deref(), Some("Edits content"));

    for system in ["user", "admin", "super_admin"] {
        assert!(matches!(
            service.delete_role(&root, system).await,
            Err(AuthError::SystemRoleProtected)
        ));
    }

    let account = register(&service, "editor@example.com").await;
    service
        .assign_roles(&root, &account.account_id, &["user".into(), "editor".into()])
        .await
        .unwrap();
    assert!(matches!(
        service.delete_role(&root, "editor").await,
        Err(AuthError::Conflict(_))
    ));

    service
        .assign_roles(&root, &account.account_id, &["user".into()])
        .await
        .unwrap();
    service.delete_role(&root, "editor").await.unwrap();
}

#[tokio::test]
async fn test_permission_administration() {
    let (service, _) = service();
    let root = root_claims();
    let export = || CreatePermissionInput {
        name: "reports:export".into(),
        description: Some("Export reports".into()),
        module: "Reports".into(),
        action: "export".into(),
    };

    assert!(matches!(
        service.create_permission(&admin_claims(), export()).await,
        Err(AuthError::Forbidden)
    ));

    let created = service.create_permission(&root, export()).await.unwrap();
    assert_eq!(created.module, "reports");
    assert!(matches!(
        service.create_permission(&root, export()).await,
        Err(AuthError::Conflict(_))
    ));
    assert!(matches!(
        service
            .create_permission(
                &root,
                CreatePermissionInput {
                    name: "reports:dump".into(),
                    description: None,
                    module: "reports".into(),
                    action: "export".into(),
                }
            )
            .await,
        Err(AuthError::Conflict(_))
    ));

    service
        .create_permission(
            &root,
            CreatePermissionInput {
                name: "users:read".into(),
                description: None,
                module: "users".into(),
                action: "read".into(),
            },
        )
        .await
        .unwrap();

    let names = |permissions: Vec<crate::domain::entity::Permission>| {
        permissions
            .into_iter()
            .map(|p| p.name.to_string())
            .collect::<Vec<_>>()
    };
    let all = service.list_permissions(&admin_claims(), None).await.unwrap();
    assert_eq!(names(all), vec!["reports:export", "users:read"]);
    let reports = service
        .list_permissions(&admin_claims(), Some(" REPORTS "))
        .await
        .unwrap();
    assert_eq!(names(reports), vec!["reports:export"]);

    assert!(matches!(
        service
            .update_permission(
                &root,
                "users:read",
                UpdatePermissionInput {
                    description: None,
                    module: Some("reports".into()),
                    action: Some("export".into()),
                }
            )
            .await,
        Err(AuthError::Conflict(_))
    ));
    let updated = service
        .update_permission(
            &root,
            "users:read",
            UpdatePermissionInput {
                description: Some("Read accounts".into()),
                module: None,
                action: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.module, "users");
    assert_eq!(updated.description.as_deref(), Some("Read accounts"));

    service.delete_permission(&root, "users:read").await.unwrap();
    assert!(matches!(
        service.delete_permission(&root, "users:read").await,
        Err(AuthError::NotFound("Permission"))
    ));
}

#[tokio::test]
async fn test_role_permissions_reach_login_claims() {
    let (service, _) = service();
    let root = root_claims();
    let editor = || CreateRoleInput {
        name: "editor".into(),
        description: None,
        level: 10,
        permissions: vec!["reports:export".into()],
    };

    assert!(matches!(
        service.create_role(&root, editor()).await,
        Err(AuthError::NotFound("Permission"))
    ));

    service
        .create_permission(
            &root,
            CreatePermissionInput {
                name: "reports:export".into(),
                description: None,
                module: "reports".into(),
                action: "export".into(),
            },
        )
        .await
        .unwrap();
    let role = service.create_role(&root, editor()).await.unwrap();
    assert_eq!(role.permissions.len(), 1);

    let account = register(&service, "grants@example.com").await;
    service
        .assign_roles(&root, &account.account_id, &["user".into(), "editor".into()])
        .await
        .unwrap();

    let claims = login(&service, "grants@example.com", PASSWORD).await.unwrap();
    assert!(claims.has_permission("reports:export"));
    assert!(claims.require_permission(&["audit:read", "reports:export"]).is_ok());
    assert!(matches!(
        claims.require_permission(&["audit:read"]),
        Err(AuthError::Forbidden)
    ));

    assert!(matches!(
        service.delete_permission(&root, "reports:export").await,
        Err(AuthError::Conflict(_))
    ));

    service
        .update_role(
            &root,
            "editor",
            UpdateRoleInput {
                description: None,
                level: None,
                permissions: Some(vec![]),
            },
        )
        .await
        .unwrap();
    let claims = login(&service, "grants@example.com", PASSWORD).await.unwrap();
    assert!(claims.permissions.is_empty());
    service.delete_permission(&root, "reports:export").await.unwrap();
}

// ============================================================================
// Profile
// ============================================================================

#[tokio::test]
async fn test_update_profile_keeps_blank_names() {
    let (service, _) = service();
    let account = register(&service, "profile@example.com").await;
    let update = |first: Option<&str>, last: Option<&str>| UpdateProfileInput {
        account_id: account.account_id,
        first_name: first.map(Into::into),
        last_name: last.map(Into::into),
        ip_address: None,
    };

    let updated = service
        .update_profile(update(Some(" Augusta "), Some("  ")))
        .await
        .unwrap();
    assert_eq!(updated.first_name, "Augusta");
    assert_eq!(updated.last_name, "Lovelace");

    // Unchanged names record nothing
    service
        .update_profile(update(Some("Augusta"), None))
        .await
        .unwrap();
    let events = service
        .login_history(&admin_claims(), &account.account_id, None)
        .await
        .unwrap();
    let updates = events
        .iter()
        .filter(|e| e.kind == AuthEventKind::ProfileUpdated)
        .count();
    assert_eq!(updates, 1);

    let long = "x".repeat(101);
    assert!(matches!(
        service.update_profile(update(None, Some(long.as_str()))).await,
        Err(AuthError::Validation { field: "lastName", .. })
    ));
    assert!(matches!(
        service
            .update_profile(UpdateProfileInput {
                account_id: AccountId::new(),
                first_name: Some("Nobody".into()),
                last_name: None,
                ip_address: None,
            })
            .await,
        Err(AuthError::NotFound("Account"))
    ));
}

// ============================================================================
// Super administrator, refresh, external login
// ============================================================================

#[tokio::test]
async fn test_super_admin_bootstrap_login() {
    let (service, _) = service_with(root_config());

    let output = service
        .super_admin_login(SuperAdminLoginInput {
            email: ROOT_EMAIL.into(),
            password: ROOT_PASSWORD.into(),
            ip_address: None,
        })
        .await
        .unwrap();
    assert!(output.account.is_none());
    assert!(output.claims.is_super_admin);
    assert!(output.claims.is_bootstrap());
    assert!(output.token.expires_at - Utc::now() <= Duration::hours(1));

    // Same identity through the regular login
    let claims = login(&service, ROOT_EMAIL, ROOT_PASSWORD).await.unwrap();
    assert!(claims.is_super_admin);

    assert!(matches!(
        login(&service, ROOT_EMAIL, PASSWORD).await,
        Err(AuthError::InvalidCredentials { attempts_left: None })
    ));
}

#[tokio::test]
async fn test_super_admin_login_disabled_without_config() {
    let (service, _) = service();
    let err = service
        .super_admin_login(SuperAdminLoginInput {
            email: ROOT_EMAIL.into(),
            password: ROOT_PASSWORD.into(),
            ip_address: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { attempts_left: None }));
}

#[tokio::test]
async fn test_bootstrap_token_requires_configured_identity() {
    let config = root_config();
    let secret = config.token_secret;
    let (service, _) = service_with(config);
    let token = service
        .super_admin_login(SuperAdminLoginInput {
            email: ROOT_EMAIL.into(),
            password: ROOT_PASSWORD.into(),
            ip_address: None,
        })
        .await
        .unwrap()
        .token
        .token;
    assert!(service.authorize(&token).is_ok());
    assert!(service.refresh(&token).await.unwrap().claims.is_bootstrap());

    // Same signing key, credential removed
    let (removed, _) = service_with(AuthConfig {
        token_secret: secret,
        ..AuthConfig::development()
    });
    assert!(matches!(removed.authorize(&token), Err(AuthError::TokenInvalid)));
    assert!(matches!(
        removed.refresh(&token).await,
        Err(AuthError::TokenInvalid)
    ));

    // Same signing key, credential moved to another address
    let rotated = AuthConfig {
        token_secret: secret,
        ..AuthConfig::development()
    };
    let (rotated, _) = service_with(root_config_for(rotated, "ops@example.com"));
    assert!(matches!(rotated.authorize(&token), Err(AuthError::TokenInvalid)));
    assert!(matches!(
        rotated.refresh(&token).await,
        Err(AuthError::TokenInvalid)
    ));
}

#[tokio::test]
async fn test_refresh_reflects_current_roles() {
    let (service, _) = service();
    let account = register(&service, "refresh@example.com").await;
    let output = service
        .login(LoginInput {
            email: "refresh@example.com".into(),
            password: PASSWORD.into(),
            remember_me: true,
            ip_address: None,
        })
        .await
        .unwrap();

    service
        .assign_roles(&admin_claims(), &account.account_id, &["admin".into()])
        .await
        .unwrap();

    let refreshed = service.refresh(&output.token.token).await.unwrap();
    assert!(refreshed.claims.is_admin);
    let verified = service.tokens().verify_access(&refreshed.token.token).unwrap();
    assert!(verified.remember_me);

    service
        .set_status(&admin_claims(), &account.account_id, AccountStatus::Inactive)
        .await
        .unwrap();
    assert!(matches!(
        service.refresh(&refreshed.token.token).await,
        Err(AuthError::AccountNotActive)
    ));
}

#[tokio::test]
async fn test_external_login_creates_then_reuses_account() {
    let (service, _) = service();
    let input = || ExternalLoginInput {
        provider: "github".into(),
        subject: "12345".into(),
        email: "octo@example.com".into(),
        first_name: "Octo".into(),
        last_name: "Cat".into(),
        remember_me: false,
        ip_address: None,
    };

    let first = service.external_login(input()).await.unwrap();
    let second = service.external_login(input()).await.unwrap();
    let (a, b) = (first.account.unwrap(), second.account.unwrap());
    assert_eq!(a.account_id, b.account_id);
    assert!(a.email_verified);
    assert!(a.password_hash.is_none());

    // No local password, so the password login always fails
    assert!(matches!(
        login(&service, "octo@example.com", PASSWORD).await,
        Err(AuthError::InvalidCredentials { .. })
    ));
}

#[tokio::test]
async fn test_external_login_links_existing_account() {
    let (service, _) = service();
    let account = register(&service, "linked@example.com").await;

    let output = service
        .external_login(ExternalLoginInput {
            provider: "google".into(),
            subject: "g-1".into(),
            email: "linked@example.com".into(),
            first_name: "Ignored".into(),
            last_name: "Name".into(),
            remember_me: false,
            ip_address: None,
        })
        .await
        .unwrap();

    let linked = output.account.unwrap();
    assert_eq!(linked.account_id, account.account_id);
    assert!(linked.email_verified);
    assert_eq!(linked.first_name, "Ada");
    login(&service, "linked@example.com", PASSWORD).await.unwrap();
}

// ============================================================================
// HTTP
// ============================================================================

async fn send(
    service: &TestService,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = auth_router_generic(service.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_http_register_login_me() {
    let (service, _) = service();

    let (status, body) = send(
        &service,
        "POST",
        "/register",
        None,
        Some(json!({
            "email": "http@example.com",
            "password": PASSWORD,
            "firstName": "Http",
            "lastName": "Client",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["account"]["roles"], json!(["user"]));
    assert_eq!(body["account"]["emailVerified"], false);

    let (status, body) = send(
        &service,
        "POST",
        "/login",
        None,
        Some(json!({ "email": "http@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenType"], "Bearer");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&service, "GET", "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["email"], "http@example.com");
    assert_eq!(body["claims"]["isAdmin"], false);

    let (status, _) = send(&service, "GET", "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_http_weak_password_and_lockout_details() {
    let (service, _) = service();
    let (status, body) = send(
        &service,
        "POST",
        "/register",
        None,
        Some(json!({
            "email": "weak@example.com",
            "password": "short",
            "firstName": "Weak",
            "lastName": "Password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"], "WEAK_PASSWORD");
    assert_eq!(
        body["details"]["reasons"],
        json!(["length", "uppercase", "digit", "special"])
    );

    register(&service, "locked@example.com").await;
    let wrong = json!({ "email": "locked@example.com", "password": "Wrong!Passw0rd" });
    let (status, body) = send(&service, "POST", "/login", None, Some(wrong.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["details"]["attemptsLeft"], 4);

    for _ in 0..4 {
        send(&service, "POST", "/login", None, Some(wrong.clone())).await;
    }
    let (status, body) = send(&service, "POST", "/login", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["details"]["code"], "ACCOUNT_LOCKED");
}

#[tokio::test]
async fn test_http_admin_routes_require_privileges() {
    let (service, _) = service_with(root_config());
    let account = register(&service, "plain@example.com").await;
    let token = service
        .tokens()
        .issue_access(&role_resolver::claims_for(&account, &[]), false)
        .unwrap()
        .token;

    let uri = format!("/admin/accounts/{}/unlock", account.account_id);
    let (status, body) = send(&service, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["code"], "FORBIDDEN");

    let root_token = service
        .tokens()
        .issue_access(&root_claims(), false)
        .unwrap()
        .token;
    let (status, _) = send(&service, "POST", &uri, Some(&root_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&service, "DELETE", "/admin/roles/admin", Some(&root_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&service, "GET", "/admin/roles", Some(&root_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_http_verify_email_twice() {
    let (service, notifier) = service();
    register(&service, "link@example.com").await;
    let token = notifier.last_token_for("link@example.com").await.unwrap();

    let (status, body) = send(
        &service,
        "POST",
        "/verify-email",
        None,
        Some(json!({ "token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyVerified"], false);

    let (_, body) = send(
        &service,
        "POST",
        "/verify-email",
        None,
        Some(json!({ "token": token })),
    )
    .await;
    assert_eq!(body["alreadyVerified"], true);

    let (status, body) = send(
        &service,
        "POST",
        "/verify-email",
        None,
        Some(json!({ "token": "garbage" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["details"]["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn test_http_permissions_and_profile() {
    let (service, _) = service_with(root_config());
    let root_token = service
        .tokens()
        .issue_access(&root_claims(), false)
        .unwrap()
        .token;

    let (status, body) = send(
        &service,
        "POST",
        "/admin/permissions",
        Some(&root_token),
        Some(json!({ "name": "reports:export", "module": "reports", "action": "export" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "reports:export");

    let (status, body) = send(
        &service,
        "POST",
        "/admin/roles",
        Some(&root_token),
        Some(json!({ "name": "analyst", "permissions": ["reports:export"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["permissions"], json!(["reports:export"]));

    let (status, body) = send(
        &service,
        "GET",
        "/admin/permissions?module=reports",
        Some(&root_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &service,
        "DELETE",
        "/admin/permissions/reports:export",
        Some(&root_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let account = register(&service, "me-profile@example.com").await;
    let token = service
        .tokens()
        .issue_access(&role_resolver::claims_for(&account, &[]), false)
        .unwrap()
        .token;
    let (status, _) = send(&service, "GET", "/admin/permissions", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &service,
        "PUT",
        "/me/profile",
        Some(&token),
        Some(json!({ "firstName": "Augusta" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Augusta");
    assert_eq!(body["lastName"], "Lovelace");

    // The bootstrap identity has no profile
    let (status, _) = send(
        &service,
        "PUT",
        "/me/profile",
        Some(&root_token),
        Some(json!({ "firstName": "Root" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
