//! Auth Middleware
//!
//! Bearer-token authentication for protected routes, and a client IP
//! extractor for auth event records.

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::{HeaderMap, header, request::Parts};
use axum::middleware::Next;
use axum::response::Response;
use platform::client::extract_client_ip;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::application::Notifier;
use crate::application::service::AuthStore;
use crate::error::AuthError;
use crate::presentation::handlers::AuthAppState;

/// `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware that requires a valid access token.
///
/// Verified claims are stored in the request extensions for handlers
/// (`Extension<Claims>`).
pub async fn require_auth<R, N>(
    State(state): State<AuthAppState<R, N>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
    N: Notifier + Send + Sync + 'static,
{
    let token = bearer_token(req.headers()).ok_or(AuthError::TokenInvalid)?;
    let claims = state.service.authorize(token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Best-effort client IP (proxy headers first, then the peer address)
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());
        Ok(ClientIp(
            extract_client_ip(&parts.headers, peer).map(|ip| ip.to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer  abc.def "));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
