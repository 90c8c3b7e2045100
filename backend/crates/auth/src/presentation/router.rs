//! Auth Router

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::application::{AuthConfig, AuthService, Notifier, TracingNotifier, service::AuthStore};
use crate::error::AuthResult;
use crate::infra::postgres::PgAuthRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::require_auth;

/// Create the Auth router with PostgreSQL repository
///
/// Notifications are only logged; wire a real [`Notifier`] through
/// [`auth_router_generic`].
pub fn auth_router(repo: PgAuthRepository, config: AuthConfig) -> AuthResult<Router> {
    let service = AuthService::new(repo, TracingNotifier, config)?;
    Ok(auth_router_generic(service))
}

/// Create a generic Auth router for any repository and notifier
pub fn auth_router_generic<R, N>(service: AuthService<R, N>) -> Router
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let state = AuthAppState { service };

    let protected = Router::new()
        .route("/me", get(handlers::me::<R, N>))
        .route("/me/profile", put(handlers::update_profile::<R, N>))
        .route("/me/history", get(handlers::my_history::<R, N>))
        .route("/password/change", post(handlers::change_password::<R, N>))
        .route(
            "/admin/accounts/{id}/unlock",
            post(handlers::force_unlock::<R, N>),
        )
        .route(
            "/admin/accounts/{id}/status",
            put(handlers::set_status::<R, N>),
        )
        .route(
            "/admin/accounts/{id}/roles",
            put(handlers::assign_roles::<R, N>),
        )
        .route(
            "/admin/accounts/{id}/history",
            get(handlers::account_history::<R, N>),
        )
        .route(
            "/admin/roles",
            get(handlers::list_roles::<R, N>).post(handlers::create_role::<R, N>),
        )
        .route(
            "/admin/roles/{name}",
            put(handlers::update_role::<R, N>).delete(handlers::delete_role::<R, N>),
        )
        .route(
            "/admin/permissions",
            get(handlers::list_permissions::<R, N>).post(handlers::create_permission::<R, N>),
        )
        .route(
            "/admin/permissions/{name}",
            put(handlers::update_permission::<R, N>).delete(handlers::delete_permission::<R, N>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<R, N>,
        ));

    Router::new()
        .route("/register", post(handlers::register::<R, N>))
        .route("/login", post(handlers::login::<R, N>))
        .route(
            "/super-admin/login",
            post(handlers::super_admin_login::<R, N>),
        )
        .route("/refresh", post(handlers::refresh::<R, N>))
        .route(
            "/password/reset-request",
            post(handlers::request_password_reset::<R, N>),
        )
        .route("/password/reset", post(handlers::reset_password::<R, N>))
        .route("/verify-email", post(handlers::verify_email::<R, N>))
        .route(
            "/verify-email/resend",
            post(handlers::resend_verification::<R, N>),
        )
        .merge(protected)
        .with_state(state)
}
