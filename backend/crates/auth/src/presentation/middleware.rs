//! Auth Middleware
//!
//! Decodes the session cookie into a [`CurrentUser`] request extension and
//! guards protected routes. Session verification is pure JWT validation;
//! no store access happens here.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::session::SessionTokenService;
use crate::domain::value_object::user_role::UserRole;
use crate::error::AuthError;

/// Middleware state
#[derive(Clone)]
pub struct SessionMiddlewareState {
    pub sessions: Arc<SessionTokenService>,
    pub config: Arc<AuthConfig>,
}

/// Authenticated identity extracted from the session cookie
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub public_id: String,
    pub role: UserRole,
    pub email_verified: bool,
}

fn current_user_from_request(
    state: &SessionMiddlewareState,
    req: &Request<Body>,
) -> Option<CurrentUser> {
    let token =
        platform::cookie::extract_cookie(req.headers(), &state.config.session_cookie_name)?;
    let claims = state.sessions.verify(&token).ok()?;

    Some(CurrentUser {
        public_id: claims.sub.clone(),
        role: claims.role(),
        email_verified: claims.email_verified,
    })
}

/// Require a valid session; inserts [`CurrentUser`] for the handler
pub async fn require_session(
    State(state): State<SessionMiddlewareState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match current_user_from_request(&state, &req) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => AuthError::SessionInvalid.into_response(),
    }
}

/// Require a valid session with the admin role
pub async fn require_admin(
    State(state): State<SessionMiddlewareState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match current_user_from_request(&state, &req) {
        Some(user) if user.role.is_admin() => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Some(_) => (
            StatusCode::FORBIDDEN,
            "Administrator access required",
        )
            .into_response(),
        None => AuthError::SessionInvalid.into_response(),
    }
}
