use rusqlite::{Result as SqlResult, Row};
use serde::{Deserialize, Serialize};

/// One normalized message summary owned by a local user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageSummary {
    pub owner: String,
    pub provider_message_id: String,
    pub thread_id: String,
    pub sender_name: String,
    pub sender_address: String,
    pub subject: String,
    pub snippet: String,
    /// Raw `Date` header as reported by the provider.
    pub sent_at: String,
    /// `sent_at` normalized to RFC3339 UTC at ingest, when parseable.
    pub sent_at_utc: Option<String>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub user_id: String,
    pub email_address: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub last_sync: Option<String>,
    pub created_at: Option<String>,
}

impl MessageSummary {
    pub fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            owner: row.get("owner")?,
            provider_message_id: row.get("provider_message_id")?,
            thread_id: row.get("thread_id")?,
            sender_name: row.get("sender_name")?,
            sender_address: row.get("sender_address")?,
            subject: row.get("subject")?,
            snippet: row.get("snippet")?,
            sent_at: row.get("sent_at")?,
            sent_at_utc: row.get("sent_at_utc")?,
            is_read: row.get("is_read")?,
        })
    }
}

impl Account {
    pub fn new(user_id: &str, email_address: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email_address: email_address.to_string(),
            display_name: None,
            access_token: None,
            last_sync: None,
            created_at: None,
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }

    pub fn from_row(row: &Row<'_>) -> SqlResult<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            email_address: row.get("email_address")?,
            display_name: row.get("display_name")?,
            access_token: row.get("access_token")?,
            last_sync: row.get("last_sync")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Account, MessageSummary};

    #[test]
    fn account_token_presence_ignores_blank_values() {
        let mut account = Account::new("user-1", "user@example.com");
        assert!(!account.has_access_token());

        account.access_token = Some("   ".to_string());
        assert!(!account.has_access_token());

        account.access_token = Some("ya29.token".to_string());
        assert!(account.has_access_token());
    }

    #[test]
    fn account_json_never_exposes_access_token() {
        let mut account = Account::new("user-1", "user@example.com");
        account.access_token = Some("ya29.secret".to_string());

        let rendered = serde_json::to_string(&account).expect("serialize account");
        assert!(!rendered.contains("ya29.secret"));
        assert!(rendered.contains("user@example.com"));
    }

    #[test]
    fn summary_serializes_with_snake_case_fields() {
        let summary = MessageSummary {
            owner: "user-1".to_string(),
            provider_message_id: "18e1".to_string(),
            thread_id: "18e0".to_string(),
            sender_name: "Jane Doe".to_string(),
            sender_address: "jane@x.com".to_string(),
            subject: "Hello".to_string(),
            snippet: "Hi there".to_string(),
            sent_at: "Thu, 01 Jan 2026 12:00:00 +0000".to_string(),
            sent_at_utc: Some("2026-01-01T12:00:00+00:00".to_string()),
            is_read: false,
        };

        let value = serde_json::to_value(&summary).expect("serialize summary");
        assert_eq!(value["provider_message_id"], "18e1");
        assert_eq!(value["is_read"], false);
    }
}
