use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::db::Database;

/// Caller context handed explicitly to every sync and read operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Resolves who is calling and which bearer token belongs to them.
#[async_trait(?Send)]
pub trait IdentityProvider {
    async fn resolve_identity(&self, session: &Session) -> Result<Option<String>>;

    async fn access_token(&self, user_id: &str) -> Result<Option<String>>;
}

/// Accounts table as the identity source: a session names a known account,
/// and the account row carries the token stored by the sign-in flow.
#[async_trait(?Send)]
impl IdentityProvider for Database {
    async fn resolve_identity(&self, session: &Session) -> Result<Option<String>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        let account = self
            .get_account(user_id)
            .with_context(|| format!("look up account '{user_id}'"))?;
        Ok(account.map(|account| account.user_id))
    }

    async fn access_token(&self, user_id: &str) -> Result<Option<String>> {
        let account = self
            .get_account(user_id)
            .with_context(|| format!("look up access token for '{user_id}'"))?;
        Ok(account
            .and_then(|account| account.access_token)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty()))
    }
}
