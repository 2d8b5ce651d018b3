use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::connectors::{MailProvider, MessageRef, TransportError};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
const DETAIL_HEADERS: [&str; 3] = ["From", "Subject", "Date"];
const REDACTED_BODY_MAX_LEN: usize = 200;

/// Gmail REST client for the list and metadata-detail endpoints.
#[derive(Debug, Clone)]
pub struct GmailApiConnector {
    client: Client,
    base_url: String,
}

impl GmailApiConnector {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        Self::new(&settings.api_base, settings.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self) -> String {
        format!("{}/users/me/messages", self.base_url)
    }

    fn detail_url(&self, message_id: &str) -> String {
        format!("{}/users/me/messages/{message_id}", self.base_url)
    }

    fn detail_query() -> Vec<(&'static str, &'static str)> {
        let mut query = vec![("format", "metadata")];
        query.extend(DETAIL_HEADERS.iter().map(|header| ("metadataHeaders", *header)));
        query
    }
}

#[async_trait]
impl MailProvider for GmailApiConnector {
    fn name(&self) -> &str {
        "gmail_api"
    }

    async fn list_message_ids(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<MessageRef>, TransportError> {
        let response = self
            .client
            .get(self.list_url())
            .bearer_auth(token)
            .header("accept", "application/json")
            .query(&[("maxResults", limit.to_string())])
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(format!("read list response: {e}")))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: provider_error_message(&body),
            });
        }

        let list: GmailMessageList =
            serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        let mut messages = list.messages.unwrap_or_default();
        messages.truncate(limit);
        debug!(count = messages.len(), "listed gmail message ids");
        Ok(messages)
    }

    async fn get_message_detail(&self, token: &str, message_id: &str) -> Option<Value> {
        let response = match self
            .client
            .get(self.detail_url(message_id))
            .bearer_auth(token)
            .header("accept", "application/json")
            .query(&Self::detail_query())
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(message_id, "gmail detail request failed: {error}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                message_id,
                status = status.as_u16(),
                "gmail detail request rejected: {}",
                redact_response_body(&body)
            );
            return None;
        }

        match response.json::<Value>().await {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(message_id, "gmail detail response unreadable: {error}");
                None
            }
        }
    }
}

/// Gmail wraps failures as `{"error": {"message": ...}}`; fall back to the
/// raw (bounded) body when it does not.
fn provider_error_message(body: &str) -> String {
    let message = serde_json::from_str::<GmailErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty());
    match message {
        Some(message) => redact_response_body(&message),
        None => redact_response_body(body),
    }
}

fn redact_response_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= REDACTED_BODY_MAX_LEN {
        return trimmed.to_string();
    }

    let mut cut = REDACTED_BODY_MAX_LEN;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}…[truncated {} bytes]",
        &trimmed[..cut],
        trimmed.len()
    )
}

#[derive(Debug, Clone, Deserialize)]
struct GmailMessageList {
    messages: Option<Vec<MessageRef>>,
}

#[derive(Debug, Deserialize)]
struct GmailErrorEnvelope {
    error: GmailErrorBody,
}

#[derive(Debug, Deserialize)]
struct GmailErrorBody {
    message: Option<String>,
}
