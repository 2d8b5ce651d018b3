use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod gmail_api;

pub use gmail_api::GmailApiConnector;

/// Identifier pair returned by the provider's list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
    #[serde(rename = "threadId", default)]
    pub thread_id: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("provider request failed: status={status} body={body}")]
    Status { status: u16, body: String },

    #[error("provider request error: {0}")]
    Request(String),

    #[error("decode provider response: {0}")]
    Decode(String),
}

impl TransportError {
    /// The provider-facing text, without the status prefix.
    pub fn provider_text(&self) -> &str {
        match self {
            Self::Status { body, .. } => body,
            Self::Request(message) | Self::Decode(message) => message,
        }
    }
}

/// Remote mail provider: list recent ids, then fetch per-message metadata.
#[async_trait]
pub trait MailProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn list_message_ids(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<MessageRef>, TransportError>;

    /// Raw detail payload, or `None` when the fetch did not succeed.
    async fn get_message_detail(&self, token: &str, message_id: &str) -> Option<Value>;
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::{MailProvider, MessageRef, TransportError};

    struct DummyProvider;

    #[async_trait]
    impl MailProvider for DummyProvider {
        fn name(&self) -> &str {
            "dummy"
        }

        async fn list_message_ids(
            &self,
            _token: &str,
            _limit: usize,
        ) -> Result<Vec<MessageRef>, TransportError> {
            Ok(Vec::new())
        }

        async fn get_message_detail(&self, _token: &str, _message_id: &str) -> Option<Value> {
            None
        }
    }

    #[test]
    fn provider_trait_is_object_safe() {
        let provider: Box<dyn MailProvider> = Box::new(DummyProvider);
        assert_eq!(provider.name(), "dummy");
    }

    #[test]
    fn message_ref_deserializes_without_thread_id() {
        let decoded: MessageRef = serde_json::from_str(r#"{"id":"m1"}"#).expect("decode ref");
        assert_eq!(decoded.id, "m1");
        assert_eq!(decoded.thread_id, "");
    }

    #[test]
    fn transport_error_exposes_provider_text() {
        let error = TransportError::Status {
            status: 401,
            body: "Invalid Credentials".to_string(),
        };
        assert_eq!(error.provider_text(), "Invalid Credentials");
        assert!(error.to_string().contains("status=401"));
    }
}
