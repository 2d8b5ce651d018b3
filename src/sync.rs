//! The sync pipeline: list recent ids, fetch their metadata concurrently,
//! normalize each payload and hand the batch to the idempotent store.

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::{IdentityProvider, Session};
use crate::config::SyncLimits;
use crate::connectors::{MailProvider, MessageRef, TransportError};
use crate::db::models::MessageSummary;
use crate::db::{Database, DbError};
use crate::extract::summarize_payload;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("no access token found; sign out and sign in again to grant mail access")]
    MissingCredential,

    #[error("failed to fetch messages: {}", .0.provider_text())]
    Transport(#[from] TransportError),

    #[error("identity lookup failed: {0}")]
    Identity(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub owner: String,
    /// Ids returned by the list call.
    pub listed: usize,
    /// Ids detail-fetched after applying the batch cap.
    pub attempted: usize,
    /// Records that survived fetch and extraction and were handed to the store.
    pub submitted: usize,
    /// Records newly stored; this is the count surfaced to callers.
    pub inserted: usize,
    /// Records the store already had.
    pub skipped: usize,
}

impl SyncReport {
    pub fn dropped(&self) -> usize {
        self.attempted.saturating_sub(self.submitted)
    }
}

/// Presentation-facing result: callers render a message instead of handling
/// an error value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<SyncReport, SyncError>> for SyncOutcome {
    fn from(result: &Result<SyncReport, SyncError>) -> Self {
        match result {
            Ok(report) => Self {
                success: true,
                count: report.inserted,
                error: None,
            },
            Err(error) => Self {
                success: false,
                count: 0,
                error: Some(error.to_string()),
            },
        }
    }
}

/// Stored summaries for the session's user, newest first. Anonymous
/// sessions see an empty list. Reads only the local store.
pub async fn list_for_session(
    identity: &dyn IdentityProvider,
    db: &Database,
    session: &Session,
) -> Result<Vec<MessageSummary>, SyncError> {
    let owner = identity
        .resolve_identity(session)
        .await
        .map_err(|e| SyncError::Identity(format!("{e:#}")))?;

    match owner {
        Some(owner) => Ok(db.list_summaries(&owner)?),
        None => Ok(Vec::new()),
    }
}

pub struct SyncService<'a> {
    provider: &'a dyn MailProvider,
    identity: &'a dyn IdentityProvider,
    db: &'a Database,
    limits: SyncLimits,
}

impl<'a> SyncService<'a> {
    pub fn new(
        provider: &'a dyn MailProvider,
        identity: &'a dyn IdentityProvider,
        db: &'a Database,
    ) -> Self {
        Self {
            provider,
            identity,
            db,
            limits: SyncLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SyncLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Run one sync for the session's user.
    ///
    /// Identity, credential and list failures abort before anything is
    /// written. Individual detail fetches that fail or cannot be parsed are
    /// dropped from the batch without failing the sync.
    pub async fn sync(&self, session: &Session) -> Result<SyncReport, SyncError> {
        let owner = self
            .identity
            .resolve_identity(session)
            .await
            .map_err(|e| SyncError::Identity(format!("{e:#}")))?
            .ok_or(SyncError::Unauthenticated)?;

        let token = self
            .identity
            .access_token(&owner)
            .await
            .map_err(|e| SyncError::Identity(format!("{e:#}")))?
            .filter(|token| !token.trim().is_empty())
            .ok_or(SyncError::MissingCredential)?;

        let refs = self
            .provider
            .list_message_ids(&token, self.limits.list_limit)
            .await?;
        let listed = refs.len();
        let batch: Vec<MessageRef> = refs.into_iter().take(self.limits.batch_cap).collect();

        let fetches = batch
            .iter()
            .map(|message| self.fetch_summary(&owner, &token, message));
        let records: Vec<MessageSummary> = join_all(fetches).await.into_iter().flatten().collect();

        let outcome = self.db.insert_summaries_if_absent(&owner, &records)?;
        // Records are already committed here.
        if let Err(error) = self.db.touch_last_sync(&owner) {
            warn!(owner = %owner, "failed to record last sync time: {error}");
        }

        let report = SyncReport {
            owner,
            listed,
            attempted: batch.len(),
            submitted: outcome.submitted,
            inserted: outcome.inserted,
            skipped: outcome.skipped,
        };
        info!(
            provider = self.provider.name(),
            owner = %report.owner,
            listed = report.listed,
            attempted = report.attempted,
            dropped = report.dropped(),
            inserted = report.inserted,
            "sync finished"
        );
        Ok(report)
    }

    pub async fn list(&self, session: &Session) -> Result<Vec<MessageSummary>, SyncError> {
        list_for_session(self.identity, self.db, session).await
    }

    async fn fetch_summary(
        &self,
        owner: &str,
        token: &str,
        message: &MessageRef,
    ) -> Option<MessageSummary> {
        let Some(payload) = self.provider.get_message_detail(token, &message.id).await else {
            debug!(message_id = %message.id, "dropping message: detail fetch failed");
            return None;
        };

        match summarize_payload(owner, &payload) {
            Ok(summary) => Some(summary),
            Err(error) => {
                warn!(message_id = %message.id, "dropping message: {error}");
                None
            }
        }
    }
}
