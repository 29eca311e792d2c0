//! HTTP Handlers

use axum::Json;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

use platform::client::extract_client_info;
use platform::cookie::CookieConfig;
use platform::rate_limit::RateLimitStore;
use serde_json::json;

use crate::application::config::AuthConfig;
use crate::application::session::SessionTokenService;
use crate::application::sign_in::SignInOutput;
use crate::application::{
    MagicLinkUseCase, OAuthUseCase, PasswordResetUseCase, SecurityEventRecorder, SignInInput,
    SignInUseCase, SignUpInput, SignUpUseCase, VerifyEmailUseCase,
};
use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::public_id::PublicId;
use crate::error::{AuthError, AuthResult};
use crate::infra::mailer::Mailer;
use crate::infra::redis::RedisPool;
use crate::presentation::dto::{
    EmailRequest, EventsQuery, MessageResponse, OAuthCallbackQuery, OAuthStartResponse,
    PasswordResetConfirmRequest, SecurityEventResponse, SessionStatusResponse, SignInRequest,
    SignInResponse, SignUpRequest, SignUpResponse, TokenQuery,
};

/// Shared state for auth handlers
pub struct AuthAppState<R, S, M>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub rate_store: Arc<S>,
    pub mailer: Arc<M>,
    pub redis: Arc<RedisPool>,
    pub sessions: Arc<SessionTokenService>,
    pub config: Arc<AuthConfig>,
}

impl<R, S, M> Clone for AuthAppState<R, S, M>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            rate_store: self.rate_store.clone(),
            mailer: self.mailer.clone(),
            redis: self.redis.clone(),
            sessions: self.sessions.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Sign Up
// ============================================================================

/// POST /api/auth/signup
pub async fn sign_up<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<SignUpRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    let use_case = SignUpUseCase::new(
        state.repo.clone(),
        state.rate_store.clone(),
        state.mailer.clone(),
        state.config.clone(),
    );

    let input = SignUpInput {
        email: req.email,
        password: req.password,
        display_name: req.display_name,
        role: req.account_type.to_role(),
    };

    let output = use_case.execute(input, &client).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            public_id: output.public_id,
        }),
    ))
}

// ============================================================================
// Sign In (provider-discriminated)
// ============================================================================

/// POST /api/auth/signin
pub async fn sign_in<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<SignInRequest>,
) -> AuthResult<Response>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    match req {
        SignInRequest::Credentials { email, password } => {
            let use_case = SignInUseCase::new(
                state.repo.clone(),
                state.rate_store.clone(),
                state.sessions.clone(),
                state.config.clone(),
            );

            let output = use_case
                .execute(SignInInput { email, password }, &client)
                .await?;

            Ok(session_response(&state.config, output).into_response())
        }
        SignInRequest::Email { email } => {
            let use_case = MagicLinkUseCase::new(
                state.repo.clone(),
                state.rate_store.clone(),
                state.mailer.clone(),
                state.sessions.clone(),
                state.config.clone(),
            );

            use_case.request(&email, &client).await?;

            Ok(Json(MessageResponse {
                message: "If the address is registered, a sign-in link has been sent".to_string(),
            })
            .into_response())
        }
    }
}

/// GET /api/auth/magic-link/callback?token=...
pub async fn magic_link_callback<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<TokenQuery>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    let use_case = MagicLinkUseCase::new(
        state.repo.clone(),
        state.rate_store.clone(),
        state.mailer.clone(),
        state.sessions.clone(),
        state.config.clone(),
    );

    let output = use_case.verify(&query.token, &client).await?;

    Ok(session_response(&state.config, output))
}

// ============================================================================
// OAuth
// ============================================================================

/// GET /api/auth/oauth/start
pub async fn oauth_start<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
) -> AuthResult<Json<OAuthStartResponse>>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let use_case = oauth_use_case(&state)?;
    let authorize_url = use_case.start().await?;

    Ok(Json(OAuthStartResponse { authorize_url }))
}

/// GET /api/auth/oauth/callback?code=...&state=...
pub async fn oauth_callback<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<OAuthCallbackQuery>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    let use_case = oauth_use_case(&state)?;
    let output = use_case.callback(query.code, query.state, &client).await?;

    Ok(session_response(&state.config, output))
}

fn oauth_use_case<R, S, M>(state: &AuthAppState<R, S, M>) -> AuthResult<OAuthUseCase<R>>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    OAuthUseCase::from_config(
        state.repo.clone(),
        state.redis.clone(),
        state.sessions.clone(),
        &state.config,
    )
    .ok_or_else(|| AuthError::Validation("OAuth sign-in is not configured".to_string()))
}

// ============================================================================
// Sign Out
// ============================================================================

/// POST /api/auth/signout
pub async fn sign_out<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    // Best-effort audit trail; the cookie is cleared regardless
    if let Some(user) = current_session_user(&state, &headers).await {
        let events = SecurityEventRecorder::new(state.repo.clone());
        let _ = events
            .record(SecurityEvent::new(
                SecurityEventKind::SignOut,
                Some(user),
                json!({}),
                &client,
            ))
            .await;
    }

    let cookie = session_cookie(&state.config).build_delete_cookie();

    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

// ============================================================================
// Session Status
// ============================================================================

/// GET /api/auth/session
pub async fn session_status<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
) -> AuthResult<Json<SessionStatusResponse>>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let claims = platform::cookie::extract_cookie(&headers, &state.config.session_cookie_name)
        .and_then(|token| state.sessions.verify(&token).ok());

    match claims {
        Some(claims) => Ok(Json(SessionStatusResponse {
            authenticated: true,
            public_id: Some(claims.sub.clone()),
            role: Some(claims.role.clone()),
            email_verified: Some(claims.email_verified),
            expires_at_ms: Some(claims.expires_at_ms()),
        })),
        None => Ok(Json(SessionStatusResponse {
            authenticated: false,
            public_id: None,
            role: None,
            email_verified: None,
            expires_at_ms: None,
        })),
    }
}

// ============================================================================
// Email Verification
// ============================================================================

/// POST /api/auth/verify-email/request
pub async fn verify_email_request<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<EmailRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    let use_case =
        VerifyEmailUseCase::new(state.repo.clone(), state.mailer.clone(), state.config.clone());
    use_case.request(&req.email, &client).await?;

    Ok(Json(MessageResponse {
        message: "If the address is registered, a verification link has been sent".to_string(),
    }))
}

/// GET /api/auth/verify-email/confirm?token=...
pub async fn verify_email_confirm<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<TokenQuery>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    let use_case =
        VerifyEmailUseCase::new(state.repo.clone(), state.mailer.clone(), state.config.clone());
    use_case.confirm(&query.token, &client).await?;

    Ok(Json(MessageResponse {
        message: "Email address verified".to_string(),
    }))
}

// ============================================================================
// Password Reset
// ============================================================================

/// POST /api/auth/password-reset/request
pub async fn password_reset_request<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<EmailRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    let use_case = PasswordResetUseCase::new(
        state.repo.clone(),
        state.rate_store.clone(),
        state.mailer.clone(),
        state.config.clone(),
    );
    use_case.request(&req.email, &client).await?;

    Ok(Json(MessageResponse {
        message: "If the address is registered, a reset link has been sent".to_string(),
    }))
}

/// POST /api/auth/password-reset/confirm
pub async fn password_reset_confirm<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let client = extract_client_info(&headers, Some(addr.ip()));

    let use_case = PasswordResetUseCase::new(
        state.repo.clone(),
        state.rate_store.clone(),
        state.mailer.clone(),
        state.config.clone(),
    );
    use_case.confirm(&req.token, req.new_password, &client).await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

// ============================================================================
// Admin: security events
// ============================================================================

/// GET /api/auth/events?user=...&limit=N (admin only, enforced by
/// middleware on the route)
pub async fn list_events<R, S, M>(
    State(state): State<AuthAppState<R, S, M>>,
    Query(query): Query<EventsQuery>,
) -> AuthResult<Json<Vec<SecurityEventResponse>>>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let public_id = PublicId::parse_str(&query.user)
        .map_err(|_| AuthError::Validation("Invalid account id".to_string()))?;

    let user = state
        .repo
        .find_by_public_id(&public_id)
        .await?
        .ok_or_else(|| AuthError::Validation("Unknown account".to_string()))?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let events = SecurityEventRecorder::new(state.repo.clone());
    let recent = events.recent_for_user(&user, limit).await?;

    Ok(Json(
        recent
            .into_iter()
            .map(|e| SecurityEventResponse {
                kind: e.kind.as_str().to_string(),
                details: e.details,
                ip: e.ip,
                user_agent: e.user_agent,
                created_at_ms: e.created_at.timestamp_millis(),
            })
            .collect(),
    ))
}

// ============================================================================
// Helper Functions
// ============================================================================

fn session_cookie(config: &AuthConfig) -> CookieConfig {
    CookieConfig {
        name: config.session_cookie_name.clone(),
        secure: config.cookie_secure,
        http_only: true,
        same_site: config.cookie_same_site,
        path: "/".to_string(),
        max_age_secs: Some(config.session_ttl.as_secs() as i64),
    }
}

/// Session cookie + identity payload for any successful sign-in
fn session_response(config: &AuthConfig, output: SignInOutput) -> impl IntoResponse + use<> {
    let cookie = session_cookie(config).build_set_cookie(&output.session_token);

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SignInResponse {
            public_id: output.public_id,
            role: output.role.code().to_string(),
            email_verified: output.email_verified,
        }),
    )
}

/// Resolve the signed-in user's id from the session cookie, if any
async fn current_session_user<R, S, M>(
    state: &AuthAppState<R, S, M>,
    headers: &HeaderMap,
) -> Option<crate::domain::value_object::user_id::UserId>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let token = platform::cookie::extract_cookie(headers, &state.config.session_cookie_name)?;
    let claims = state.sessions.verify(&token).ok()?;
    let public_id = PublicId::parse_str(&claims.sub).ok()?;

    let user = state.repo.find_by_public_id(&public_id).await.ok()??;
    Some(user.user_id)
}
