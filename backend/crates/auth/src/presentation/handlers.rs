//! HTTP Handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::{
    AuthService, ChangePasswordInput, CreatePermissionInput, CreateRoleInput, LoginInput,
    Notifier, RegisterInput, ResetPasswordInput, SuperAdminLoginInput, UpdatePermissionInput,
    UpdateProfileInput, UpdateRoleInput, service::AuthStore,
};
use crate::domain::value_object::{AccountId, Claims};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AccountResponse, AssignRolesRequest, AuthEventResponse, ChangePasswordRequest,
    CreatePermissionRequest, CreateRoleRequest, HistoryQuery, LoginRequest, MeResponse,
    MessageResponse, PasswordResetRequest, PermissionQuery, PermissionResponse, RegisterRequest,
    RegisterResponse, ResendVerificationRequest, ResetPasswordRequest, RoleResponse,
    SetStatusRequest, SuperAdminLoginRequest, TokenResponse, UpdatePermissionRequest,
    UpdateProfileRequest, UpdateRoleRequest, VerifyEmailRequest, VerifyEmailResponse,
};
use crate::presentation::middleware::{ClientIp, bearer_token};

/// Shared state for auth handlers
pub struct AuthAppState<R, N>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    pub service: AuthService<R, N>,
}

impl<R, N> Clone for AuthAppState<R, N>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

fn parse_account_id(raw: &str) -> AuthResult<AccountId> {
    raw.parse()
        .map_err(|_| AuthError::validation("id", "Invalid account id"))
}

// ============================================================================
// Registration / Login
// ============================================================================

/// POST /api/auth/register
pub async fn register<R, N>(
    State(state): State<AuthAppState<R, N>>,
    ClientIp(ip): ClientIp,
    Json(req): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let output = state
        .service
        .register(RegisterInput {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            ip_address: ip,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account: AccountResponse::from(&output.account),
            message: "Registration successful. Check your e-mail to verify the address.",
        }),
    ))
}

/// POST /api/auth/login
pub async fn login<R, N>(
    State(state): State<AuthAppState<R, N>>,
    ClientIp(ip): ClientIp,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<TokenResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let output = state
        .service
        .login(LoginInput {
            email: req.email,
            password: req.password,
            remember_me: req.remember_me,
            ip_address: ip,
        })
        .await?;

    Ok(Json(output.into()))
}

/// POST /api/auth/super-admin/login
pub async fn super_admin_login<R, N>(
    State(state): State<AuthAppState<R, N>>,
    ClientIp(ip): ClientIp,
    Json(req): Json<SuperAdminLoginRequest>,
) -> AuthResult<Json<TokenResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let output = state
        .service
        .super_admin_login(SuperAdminLoginInput {
            email: req.email,
            password: req.password,
            ip_address: ip,
        })
        .await?;

    Ok(Json(output.into()))
}

/// POST /api/auth/refresh
pub async fn refresh<R, N>(
    State(state): State<AuthAppState<R, N>>,
    headers: HeaderMap,
) -> AuthResult<Json<TokenResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let token = bearer_token(&headers).ok_or(AuthError::TokenInvalid)?;
    let output = state.service.refresh(token).await?;
    Ok(Json(output.into()))
}

/// GET /api/auth/me
pub async fn me<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
) -> AuthResult<Json<MeResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let account = if claims.is_bootstrap() {
        None
    } else {
        Some(AccountResponse::from(
            &state.service.current_account(&claims).await?,
        ))
    };

    Ok(Json(MeResponse { claims, account }))
}

/// PUT /api/auth/me/profile
pub async fn update_profile<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    ClientIp(ip): ClientIp,
    Json(req): Json<UpdateProfileRequest>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let account_id = claims.account_id().ok_or(AuthError::NotFound("Account"))?;
    let account = state
        .service
        .update_profile(UpdateProfileInput {
            account_id,
            first_name: req.first_name,
            last_name: req.last_name,
            ip_address: ip,
        })
        .await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// GET /api/auth/me/history
pub async fn my_history<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HistoryQuery>,
) -> AuthResult<Json<Vec<AuthEventResponse>>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let account_id = claims.account_id().ok_or(AuthError::NotFound("Account"))?;
    let events = state
        .service
        .login_history(&claims, &account_id, query.limit)
        .await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Password
// ============================================================================

/// POST /api/auth/password/change
pub async fn change_password<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    ClientIp(ip): ClientIp,
    Json(req): Json<ChangePasswordRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let account_id = claims.account_id().ok_or(AuthError::Forbidden)?;
    state
        .service
        .change_password(ChangePasswordInput {
            account_id,
            current_password: req.current_password,
            new_password: req.new_password,
            ip_address: ip,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed",
    }))
}

/// POST /api/auth/password/reset-request
///
/// Same response whether or not the e-mail is registered.
pub async fn request_password_reset<R, N>(
    State(state): State<AuthAppState<R, N>>,
    ClientIp(ip): ClientIp,
    Json(req): Json<PasswordResetRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    state
        .service
        .request_password_reset(&req.email, ip.as_deref())
        .await?;

    Ok(Json(MessageResponse {
        message: "If the address is registered, a reset link has been sent",
    }))
}

/// POST /api/auth/password/reset
pub async fn reset_password<R, N>(
    State(state): State<AuthAppState<R, N>>,
    ClientIp(ip): ClientIp,
    Json(req): Json<ResetPasswordRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    state
        .service
        .reset_password(ResetPasswordInput {
            token: req.token,
            new_password: req.new_password,
            ip_address: ip,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}

// ============================================================================
// E-mail verification
// ============================================================================

/// POST /api/auth/verify-email
pub async fn verify_email<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Json(req): Json<VerifyEmailRequest>,
) -> AuthResult<Json<VerifyEmailResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let outcome = state.service.verify_email(&req.token).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/auth/verify-email/resend
pub async fn resend_verification<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Json(req): Json<ResendVerificationRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    state.service.resend_verification(&req.email).await?;
    Ok(Json(MessageResponse {
        message: "If the address needs verification, a new link has been sent",
    }))
}

// ============================================================================
// Account administration
// ============================================================================

/// POST /api/auth/admin/accounts/{id}/unlock
pub async fn force_unlock<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let account_id = parse_account_id(&id)?;
    state.service.force_unlock(&claims, &account_id).await?;
    Ok(Json(MessageResponse {
        message: "Account unlocked",
    }))
}

/// PUT /api/auth/admin/accounts/{id}/status
pub async fn set_status<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let account_id = parse_account_id(&id)?;
    let account = state
        .service
        .set_status(&claims, &account_id, req.status)
        .await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// PUT /api/auth/admin/accounts/{id}/roles
pub async fn assign_roles<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<AssignRolesRequest>,
) -> AuthResult<Json<AccountResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let account_id = parse_account_id(&id)?;
    let account = state
        .service
        .assign_roles(&claims, &account_id, &req.roles)
        .await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// GET /api/auth/admin/accounts/{id}/history
pub async fn account_history<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AuthResult<Json<Vec<AuthEventResponse>>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let account_id = parse_account_id(&id)?;
    let events = state
        .service
        .login_history(&claims, &account_id, query.limit)
        .await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Role administration
// ============================================================================

/// GET /api/auth/admin/roles
pub async fn list_roles<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
) -> AuthResult<Json<Vec<RoleResponse>>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let roles = state.service.list_roles(&claims).await?;
    Ok(Json(roles.into_iter().map(Into::into).collect()))
}

/// POST /api/auth/admin/roles
pub async fn create_role<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRoleRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let role = state
        .service
        .create_role(
            &claims,
            CreateRoleInput {
                name: req.name,
                description: req.description,
                level: req.level,
                permissions: req.permissions,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

/// PUT /api/auth/admin/roles/{name}
pub async fn update_role<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> AuthResult<Json<RoleResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let role = state
        .service
        .update_role(
            &claims,
            &name,
            UpdateRoleInput {
                description: req.description,
                level: req.level,
                permissions: req.permissions,
            },
        )
        .await?;
    Ok(Json(role.into()))
}

/// DELETE /api/auth/admin/roles/{name}
pub async fn delete_role<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    state.service.delete_role(&claims, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Permission administration
// ============================================================================

/// GET /api/auth/admin/permissions
pub async fn list_permissions<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PermissionQuery>,
) -> AuthResult<Json<Vec<PermissionResponse>>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let permissions = state
        .service
        .list_permissions(&claims, query.module.as_deref())
        .await?;
    Ok(Json(permissions.into_iter().map(Into::into).collect()))
}

/// POST /api/auth/admin/permissions
pub async fn create_permission<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePermissionRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let permission = state
        .service
        .create_permission(
            &claims,
            CreatePermissionInput {
                name: req.name,
                description: req.description,
                module: req.module,
                action: req.action,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

/// PUT /api/auth/admin/permissions/{name}
pub async fn update_permission<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
    Json(req): Json<UpdatePermissionRequest>,
) -> AuthResult<Json<PermissionResponse>>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let permission = state
        .service
        .update_permission(
            &claims,
            &name,
            UpdatePermissionInput {
                description: req.description,
                module: req.module,
                action: req.action,
            },
        )
        .await?;
    Ok(Json(permission.into()))
}

/// DELETE /api/auth/admin/permissions/{name}
pub async fn delete_permission<R, N>(
    State(state): State<AuthAppState<R, N>>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    state.service.delete_permission(&claims, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
