//! PostgreSQL Repository Implementations

use chrono::{DateTime, Duration, Utc};
use nid::Nanoid;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::entity::{
    account_token::{AccountToken, TokenKind},
    credential::{Credential, LockoutOutcome},
    security_event::{SecurityEvent, SecurityEventKind},
    user::User,
};
use crate::domain::repository::{
    CredentialRepository, SecurityEventRepository, TokenRepository, UserRepository,
};
use crate::domain::value_object::{
    account_status::AccountStatus, email::Email, public_id::PublicId, user_id::UserId,
    user_password::UserPassword, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed account-security repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Startup housekeeping: drop expired single-use tokens
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let deleted = self.delete_expired_tokens(Utc::now()).await?;
        tracing::info!(tokens_deleted = deleted, "Cleaned up expired account tokens");
        Ok(deleted)
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                public_id,
                email,
                email_verified,
                display_name,
                user_role,
                account_status,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.public_id.as_str())
        .bind(user.email.as_str())
        .bind(user.email_verified)
        .bind(&user.display_name)
        .bind(user.role.id())
        .bind(user.status.id())
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE user_id = $1",
            UserRow::SELECT
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn find_by_public_id(&self, public_id: &PublicId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE public_id = $1",
            UserRow::SELECT
        ))
        .bind(public_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE email = $1",
            UserRow::SELECT
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                email = $2,
                email_verified = $3,
                display_name = $4,
                user_role = $5,
                account_status = $6,
                last_login_at = $7,
                updated_at = $8
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.email_verified)
        .bind(&user.display_name)
        .bind(user.role.id())
        .bind(user.status.id())
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for PgAuthRepository {
    async fn create_credential(&self, credential: &Credential) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO credentials (
                user_id,
                password_hash,
                failed_attempts,
                locked,
                locked_until,
                last_failed_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(credential.user_id.as_uuid())
        .bind(credential.password_hash.as_str())
        .bind(credential.failed_attempts as i32)
        .bind(credential.locked)
        .bind(credential.locked_until)
        .bind(credential.last_failed_at)
        .bind(credential.created_at)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                user_id,
                password_hash,
                failed_attempts,
                locked,
                locked_until,
                last_failed_at,
                created_at,
                updated_at
            FROM credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_credential()))
    }

    async fn record_failed_attempt(
        &self,
        user_id: &UserId,
        max_attempts: u32,
        lockout: Duration,
    ) -> AuthResult<LockoutOutcome> {
        let now = Utc::now();
        let lock_until = now + lockout;

        // Single atomic statement: increment and lock transition together,
        // so N concurrent failures always count N
        let row = sqlx::query_as::<_, LockoutRow>(
            r#"
            UPDATE credentials SET
                failed_attempts = failed_attempts + 1,
                last_failed_at = $2,
                locked = failed_attempts + 1 >= $3,
                locked_until = CASE
                    WHEN failed_attempts + 1 >= $3 THEN $4
                    ELSE locked_until
                END,
                updated_at = $2
            WHERE user_id = $1
            RETURNING failed_attempts, locked, locked_until
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(now)
        .bind(max_attempts as i32)
        .bind(lock_until)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AuthError::Internal("Credential row missing".to_string()))?;

        Ok(LockoutOutcome {
            failed_attempts: row.failed_attempts.max(0) as u32,
            locked: row.locked,
            locked_until: row.locked_until,
        })
    }

    async fn reset_lockout(&self, user_id: &UserId) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE credentials SET
                failed_attempts = 0,
                locked = FALSE,
                locked_until = NULL,
                last_failed_at = NULL,
                updated_at = $2
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_password(&self, user_id: &UserId, password_hash: &str) -> AuthResult<()> {
        // Upsert: an OAuth-only account gains its first credential here
        sqlx::query(
            r#"
            INSERT INTO credentials (
                user_id, password_hash, failed_attempts, locked,
                locked_until, last_failed_at, created_at, updated_at
            ) VALUES ($1, $2, 0, FALSE, NULL, NULL, $3, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                password_hash = EXCLUDED.password_hash,
                failed_attempts = 0,
                locked = FALSE,
                locked_until = NULL,
                last_failed_at = NULL,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Security Event Repository Implementation
// ============================================================================

impl SecurityEventRepository for PgAuthRepository {
    async fn append(&self, event: &SecurityEvent) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_events (
                event_id,
                user_id,
                kind,
                details,
                ip,
                user_agent,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.event_id)
        .bind(event.user_id.as_ref().map(|id| *id.as_uuid()))
        .bind(event.kind.as_str())
        .bind(&event.details)
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_for_user(
        &self,
        user_id: &UserId,
        kind: SecurityEventKind,
        since: DateTime<Utc>,
    ) -> AuthResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM security_events
            WHERE user_id = $1 AND kind = $2 AND created_at >= $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn distinct_ips_for_user(
        &self,
        user_id: &UserId,
        kind: SecurityEventKind,
        since: DateTime<Utc>,
    ) -> AuthResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT ip)
            FROM security_events
            WHERE user_id = $1 AND kind = $2 AND created_at >= $3 AND ip IS NOT NULL
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn recent_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> AuthResult<Vec<SecurityEvent>> {
        let rows = sqlx::query_as::<_, SecurityEventRow>(
            r#"
            SELECT event_id, user_id, kind, details, ip, user_agent, created_at
            FROM security_events
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_event()).collect()
    }
}

// ============================================================================
// Token Repository Implementation
// ============================================================================

impl TokenRepository for PgAuthRepository {
    async fn store_token(&self, token: &AccountToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO account_tokens (
                token_id,
                kind,
                email,
                token,
                expires_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.token_id)
        .bind(token.kind.as_str())
        .bind(token.email.as_str())
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_tokens_for_email(&self, kind: TokenKind, email: &Email) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM account_tokens WHERE kind = $1 AND email = $2")
            .bind(kind.as_str())
            .bind(email.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn consume_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> AuthResult<Option<AccountToken>> {
        // DELETE .. RETURNING makes consumption single-use under
        // concurrent requests: only one caller gets the row
        let row = sqlx::query_as::<_, AccountTokenRow>(
            r#"
            DELETE FROM account_tokens
            WHERE kind = $1 AND token = $2
            RETURNING token_id, kind, email, token, expires_at, created_at
            "#,
        )
        .bind(kind.as_str())
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_token()).transpose()
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM account_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    public_id: String,
    email: String,
    email_verified: bool,
    display_name: Option<String>,
    user_role: i16,
    account_status: i16,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    const SELECT: &'static str = r#"
        SELECT
            user_id,
            public_id,
            email,
            email_verified,
            display_name,
            user_role,
            account_status,
            last_login_at,
            created_at,
            updated_at
        FROM users
    "#;

    fn into_user(self) -> AuthResult<User> {
        let public_id = PublicId::from_nanoid(
            Nanoid::from_str(&self.public_id)
                .map_err(|e| AuthError::Internal(format!("Invalid public_id: {}", e)))?,
        );

        Ok(User {
            user_id: UserId::from_uuid(self.user_id),
            public_id,
            email: Email::from_db(self.email),
            email_verified: self.email_verified,
            display_name: self.display_name,
            role: UserRole::from_id(self.user_role).unwrap_or_default(),
            status: AccountStatus::from_id(self.account_status).unwrap_or_default(),
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: Uuid,
    password_hash: String,
    failed_attempts: i32,
    locked: bool,
    locked_until: Option<DateTime<Utc>>,
    last_failed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> Credential {
        Credential {
            user_id: UserId::from_uuid(self.user_id),
            password_hash: UserPassword::from_db(self.password_hash),
            failed_attempts: self.failed_attempts.max(0) as u32,
            locked: self.locked,
            locked_until: self.locked_until,
            last_failed_at: self.last_failed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LockoutRow {
    failed_attempts: i32,
    locked: bool,
    locked_until: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct SecurityEventRow {
    event_id: Uuid,
    user_id: Option<Uuid>,
    kind: String,
    details: serde_json::Value,
    ip: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl SecurityEventRow {
    fn into_event(self) -> AuthResult<SecurityEvent> {
        let kind = SecurityEventKind::from_str(&self.kind)
            .ok_or_else(|| AuthError::Internal(format!("Unknown event kind: {}", self.kind)))?;

        Ok(SecurityEvent {
            event_id: self.event_id,
            user_id: self.user_id.map(UserId::from_uuid),
            kind,
            details: self.details,
            ip: self.ip,
            user_agent: self.user_agent,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AccountTokenRow {
    token_id: Uuid,
    kind: String,
    email: String,
    token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl AccountTokenRow {
    fn into_token(self) -> AuthResult<AccountToken> {
        let kind = TokenKind::from_str(&self.kind)
            .ok_or_else(|| AuthError::Internal(format!("Unknown token kind: {}", self.kind)))?;

        Ok(AccountToken {
            token_id: self.token_id,
            kind,
            email: Email::from_db(self.email),
            token: self.token,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}
