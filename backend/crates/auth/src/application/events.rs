//! Security Event Recording
//!
//! Thin application service over the append-only event log: appends
//! outcome events and aggregates the trailing-window activity summary the
//! suspicion heuristic consumes.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::entity::user::User;
use crate::domain::repository::SecurityEventRepository;
use crate::domain::suspicion::{self, ActivitySummary};
use crate::error::AuthResult;

/// Records and queries security events
pub struct SecurityEventRecorder<E>
where
    E: SecurityEventRepository,
{
    repo: Arc<E>,
}

impl<E> SecurityEventRecorder<E>
where
    E: SecurityEventRepository,
{
    pub fn new(repo: Arc<E>) -> Self {
        Self { repo }
    }

    /// Append an event to the log
    pub async fn record(&self, event: SecurityEvent) -> AuthResult<()> {
        tracing::debug!(kind = %event.kind, "Recording security event");
        self.repo.append(&event).await
    }

    /// Aggregate recent activity for the suspicion heuristic
    pub async fn activity_summary(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> AuthResult<ActivitySummary> {
        let since = now - suspicion::activity_window();

        let failed_logins = self
            .repo
            .count_for_user(&user.user_id, SecurityEventKind::LoginFailed, since)
            .await?;

        let distinct_login_ips = self
            .repo
            .distinct_ips_for_user(&user.user_id, SecurityEventKind::LoginSuccess, since)
            .await?;

        Ok(ActivitySummary {
            failed_logins,
            distinct_login_ips,
            account_age: user.age_at(now),
        })
    }

    /// Most recent events for a user, newest first (admin back office)
    pub async fn recent_for_user(
        &self,
        user: &User,
        limit: i64,
    ) -> AuthResult<Vec<SecurityEvent>> {
        self.repo.recent_for_user(&user.user_id, limit).await
    }
}
