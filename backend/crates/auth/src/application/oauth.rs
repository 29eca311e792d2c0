//! OAuth Sign-In Use Case
//!
//! Authorization-code + PKCE flow against a single configured provider.
//! The start endpoint hands back the provider's authorization URL and
//! parks `{state -> pkce verifier}` in the cache store for ten minutes;
//! the callback validates state, exchanges the code, pulls the userinfo
//! document and signs the account in, creating it on first sight. OAuth
//! accounts carry no password credential.

use std::sync::Arc;
use std::time::Duration;

use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use platform::client::ClientInfo;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::config::{AuthConfig, OAuthSettings};
use crate::application::events::SecurityEventRecorder;
use crate::application::session::SessionTokenService;
use crate::application::sign_in::SignInOutput;
use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::entity::user::User;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::{email::Email, user_role::UserRole};
use crate::error::{AuthError, AuthResult};
use crate::infra::redis::RedisPool;

/// Handshake state TTL in the cache store
const HANDSHAKE_TTL: Duration = Duration::from_secs(600);

/// Userinfo document returned by the provider
#[derive(Debug, Deserialize)]
pub struct OAuthUserProfile {
    pub email: String,
    #[serde(default, alias = "verified_email")]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// Handshake state parked in the cache between start and callback
#[derive(Debug, Serialize, Deserialize)]
struct OAuthHandshake {
    pkce_verifier: String,
}

/// OAuth sign-in use case
pub struct OAuthUseCase<R>
where
    R: AuthStore,
{
    repo: Arc<R>,
    redis: Arc<RedisPool>,
    sessions: Arc<SessionTokenService>,
    settings: OAuthSettings,
}

impl<R> OAuthUseCase<R>
where
    R: AuthStore,
{
    /// Build from config; `None` when no provider is configured.
    pub fn from_config(
        repo: Arc<R>,
        redis: Arc<RedisPool>,
        sessions: Arc<SessionTokenService>,
        config: &AuthConfig,
    ) -> Option<Self> {
        config.oauth.clone().map(|settings| Self {
            repo,
            redis,
            sessions,
            settings,
        })
    }

    fn client(&self) -> AuthResult<BasicClient> {
        let auth_url = AuthUrl::new(self.settings.auth_url.clone())
            .map_err(|e| AuthError::Internal(format!("Invalid OAuth auth URL: {}", e)))?;
        let token_url = TokenUrl::new(self.settings.token_url.clone())
            .map_err(|e| AuthError::Internal(format!("Invalid OAuth token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(self.settings.redirect_url.clone())
            .map_err(|e| AuthError::Internal(format!("Invalid OAuth redirect URL: {}", e)))?;

        Ok(BasicClient::new(
            ClientId::new(self.settings.client_id.clone()),
            Some(ClientSecret::new(self.settings.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url))
    }

    /// Begin the handshake: returns the provider authorization URL.
    pub async fn start(&self) -> AuthResult<String> {
        let client = self.client()?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let handshake = OAuthHandshake {
            pkce_verifier: pkce_verifier.secret().to_string(),
        };
        let payload = serde_json::to_string(&handshake)
            .map_err(|e| AuthError::Internal(format!("Failed to encode handshake: {}", e)))?;

        self.redis
            .set(
                &handshake_key(csrf_token.secret()),
                &payload,
                Some(HANDSHAKE_TTL.as_secs()),
            )
            .await
            .map_err(|e| AuthError::Cache(e.to_string()))?;

        Ok(auth_url.to_string())
    }

    /// Complete the handshake from the provider redirect.
    pub async fn callback(
        &self,
        code: String,
        state: String,
        client_info: &ClientInfo,
    ) -> AuthResult<SignInOutput> {
        let events = SecurityEventRecorder::new(self.repo.clone());

        // State is single-use; taking it also deletes it
        let payload = self
            .redis
            .take(&handshake_key(&state))
            .await
            .map_err(|e| AuthError::Cache(e.to_string()))?
            .ok_or(AuthError::OAuthState)?;

        let handshake: OAuthHandshake =
            serde_json::from_str(&payload).map_err(|_| AuthError::OAuthState)?;

        let client = self.client()?;
        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(handshake.pkce_verifier))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| AuthError::OAuthProvider(format!("Code exchange failed: {}", e)))?;

        let profile = self.fetch_profile(token.access_token().secret()).await?;

        let email = Email::new(&profile.email)
            .map_err(|_| AuthError::OAuthProvider("Provider returned invalid email".into()))?;

        let mut user = match self.repo.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let user = User::new(email.clone(), profile.name.clone(), UserRole::Customer);
                self.repo.create(&user).await?;
                user
            }
        };

        if !user.can_login() {
            return Err(AuthError::AccountInactive);
        }

        if profile.email_verified && !user.email_verified {
            user.mark_email_verified();
        }
        user.record_login();
        self.repo.update(&user).await?;

        events
            .record(SecurityEvent::new(
                SecurityEventKind::OauthLogin,
                Some(user.user_id),
                json!({ "emailVerifiedByProvider": profile.email_verified }),
                client_info,
            ))
            .await?;

        let session_token = self.sessions.issue(&user)?;

        tracing::info!(public_id = %user.public_id, "User signed in via OAuth");

        Ok(SignInOutput {
            public_id: user.public_id.to_string(),
            role: user.role,
            email_verified: user.email_verified,
            session_token,
        })
    }

    /// Fetch the userinfo document with the provider access token
    async fn fetch_profile(&self, access_token: &str) -> AuthResult<OAuthUserProfile> {
        let response = reqwest::Client::new()
            .get(&self.settings.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::OAuthProvider(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::OAuthProvider(format!(
                "Userinfo request returned {}",
                response.status()
            )));
        }

        response
            .json::<OAuthUserProfile>()
            .await
            .map_err(|e| AuthError::OAuthProvider(format!("Invalid userinfo document: {}", e)))
    }
}

fn handshake_key(state: &str) -> String {
    format!("oauth:state:{}", state)
}
