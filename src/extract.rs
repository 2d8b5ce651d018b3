//! Normalization of provider message-detail payloads into [`MessageSummary`]
//! records.
//!
//! The provider's detail JSON is validated once into a [`MessageDetail`]; only
//! a payload without a usable message id is rejected. Every other missing or
//! malformed field falls back to a default instead of dropping the record.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::dates::normalize_sent_at;
use crate::db::models::MessageSummary;

pub const NO_SUBJECT: &str = "(No Subject)";
pub const UNREAD_LABEL: &str = "UNREAD";

static SENDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*<(.+?)>$").expect("compile sender header regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("message detail is not a JSON object")]
    NotAnObject,

    #[error("message detail has no id")]
    MissingId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Typed view of one provider message-detail payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDetail {
    pub id: String,
    pub thread_id: String,
    pub snippet: String,
    pub label_ids: Vec<String>,
    pub headers: Vec<Header>,
}

impl MessageDetail {
    pub fn from_json(value: &Value) -> Result<Self, ExtractError> {
        let object = value.as_object().ok_or(ExtractError::NotAnObject)?;

        let id = object
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or(ExtractError::MissingId)?
            .to_string();

        let thread_id = string_field(object.get("threadId"));
        let snippet = string_field(object.get("snippet"));

        let label_ids = object
            .get("labelIds")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let headers = object
            .get("payload")
            .and_then(|payload| payload.get("headers"))
            .and_then(Value::as_array)
            .map(|headers| headers.iter().filter_map(parse_header).collect())
            .unwrap_or_default();

        Ok(Self {
            id,
            thread_id,
            snippet,
            label_ids,
            headers,
        })
    }

    /// Exact, case-sensitive lookup; first match wins; missing yields "".
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .iter()
            .find(|header| header.name == name)
            .map(|header| header.value.as_str())
            .unwrap_or("")
    }

    pub fn is_read(&self) -> bool {
        !self.label_ids.iter().any(|label| label == UNREAD_LABEL)
    }
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn parse_header(value: &Value) -> Option<Header> {
    let name = value.get("name")?.as_str()?;
    let value = value.get("value").and_then(Value::as_str).unwrap_or("");
    Some(Header {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Validate a raw detail payload and normalize it for `owner`.
pub fn summarize_payload(owner: &str, payload: &Value) -> Result<MessageSummary, ExtractError> {
    let detail = MessageDetail::from_json(payload)?;
    Ok(extract_summary(owner, &detail))
}

pub fn extract_summary(owner: &str, detail: &MessageDetail) -> MessageSummary {
    let (sender_name, sender_address) = parse_sender(detail.header("From"));

    let subject = match detail.header("Subject") {
        "" => NO_SUBJECT.to_string(),
        subject => subject.to_string(),
    };

    let sent_at = detail.header("Date").to_string();
    let sent_at_utc = normalize_sent_at(&sent_at);

    MessageSummary {
        owner: owner.to_string(),
        provider_message_id: detail.id.clone(),
        thread_id: detail.thread_id.clone(),
        sender_name,
        sender_address,
        subject,
        snippet: html_entity_decode(&detail.snippet),
        sent_at,
        sent_at_utc,
        is_read: detail.is_read(),
    }
}

/// Split a `From` header into display name and address.
///
/// `"Jane Doe" <jane@x.com>` yields `("Jane Doe", "jane@x.com")`; a value
/// without the angle-bracket form is returned unchanged for both.
pub fn parse_sender(raw: &str) -> (String, String) {
    match SENDER_PATTERN.captures(raw) {
        Some(captures) => {
            let name = captures[1].replace('"', "");
            let address = captures[2].to_string();
            (name, address)
        }
        None => (raw.to_string(), raw.to_string()),
    }
}

fn html_entity_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
