//! Auth Router

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;

use platform::rate_limit::RateLimitStore;

use crate::application::config::AuthConfig;
use crate::application::session::SessionTokenService;
use crate::domain::repository::AuthStore;
use crate::infra::mailer::{Mailer, TracingMailer};
use crate::infra::postgres::PgAuthRepository;
use crate::infra::redis::{RedisPool, RedisRateLimitStore};
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{SessionMiddlewareState, require_admin};

/// Create the auth router with the production stack (PostgreSQL
/// repository, Redis rate-limit counters, logging mailer)
pub fn auth_router(repo: PgAuthRepository, redis: RedisPool, config: AuthConfig) -> Router {
    auth_router_generic(
        repo,
        RedisRateLimitStore::new(redis.clone()),
        TracingMailer,
        redis,
        config,
    )
}

/// Create the auth router for any repository / store / mailer stack
pub fn auth_router_generic<R, S, M>(
    repo: R,
    rate_store: S,
    mailer: M,
    redis: RedisPool,
    config: AuthConfig,
) -> Router
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let sessions = Arc::new(SessionTokenService::new(
        &config.session_secret,
        config.session_ttl,
    ));
    let config = Arc::new(config);

    let state = AuthAppState {
        repo: Arc::new(repo),
        rate_store: Arc::new(rate_store),
        mailer: Arc::new(mailer),
        redis: Arc::new(redis),
        sessions: sessions.clone(),
        config: config.clone(),
    };

    let admin_guard = SessionMiddlewareState { sessions, config };

    let admin_routes = Router::new()
        .route("/events", get(handlers::list_events::<R, S, M>))
        .route_layer(from_fn_with_state(admin_guard, require_admin));

    Router::new()
        .route("/signup", post(handlers::sign_up::<R, S, M>))
        .route("/signin", post(handlers::sign_in::<R, S, M>))
        .route("/signout", post(handlers::sign_out::<R, S, M>))
        .route("/session", get(handlers::session_status::<R, S, M>))
        .route(
            "/magic-link/callback",
            get(handlers::magic_link_callback::<R, S, M>),
        )
        .route("/oauth/start", get(handlers::oauth_start::<R, S, M>))
        .route("/oauth/callback", get(handlers::oauth_callback::<R, S, M>))
        .route(
            "/verify-email/request",
            post(handlers::verify_email_request::<R, S, M>),
        )
        .route(
            "/verify-email/confirm",
            get(handlers::verify_email_confirm::<R, S, M>),
        )
        .route(
            "/password-reset/request",
            post(handlers::password_reset_request::<R, S, M>),
        )
        .route(
            "/password-reset/confirm",
            post(handlers::password_reset_confirm::<R, S, M>),
        )
        .merge(admin_routes)
        .with_state(state)
}
