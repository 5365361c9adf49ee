//! Gmail REST adapter for the [`MailFeed`] trait.
//!
//! One listing call (provider default page size, newest first), then a full
//! fetch per listed id. Bodies prefer the first `text/plain` part and fall
//! back to the top-level payload body; both are base64url-encoded.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{AccountMetadata, MailFeed, MailItem, MailListing};
use crate::error::FeedError;

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Gmail REST client, authenticated with an OAuth access token.
pub struct GmailFeed {
    http: reqwest::Client,
    access_token: SecretString,
}

impl GmailFeed {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MailFeed for GmailFeed {
    async fn list_candidates(&self) -> Result<MailListing, FeedError> {
        let list: ListResponse = self.get_json(&format!("{API_BASE}/messages")).await?;

        let mut items = Vec::with_capacity(list.messages.len());
        for entry in &list.messages {
            let message: MessageResponse = self
                .get_json(&format!("{API_BASE}/messages/{}?format=full", entry.id))
                .await?;
            items.push(message_to_item(message)?);
        }

        debug!(
            fetched = items.len(),
            estimate = list.result_size_estimate,
            "Listed mailbox"
        );
        Ok(MailListing {
            items,
            total: list.result_size_estimate,
        })
    }

    async fn account_metadata(&self) -> Result<AccountMetadata, FeedError> {
        let profile: ProfileResponse = self.get_json(&format!("{API_BASE}/profile")).await?;
        Ok(AccountMetadata {
            email: profile.email_address,
            messages_total: profile.messages_total,
        })
    }
}

// ── Raw API responses ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(default)]
    result_size_estimate: u64,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    id: String,
    /// Epoch milliseconds, encoded as a decimal string.
    internal_date: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Payload,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: PartBody,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    body: PartBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email_address: String,
    messages_total: u64,
}

fn message_to_item(message: MessageResponse) -> Result<MailItem, FeedError> {
    let received_at_ms: i64 = message.internal_date.parse().map_err(|_| FeedError::Decode {
        id: message.id.clone(),
        reason: format!("bad internalDate {:?}", message.internal_date),
    })?;

    let mut sender = String::new();
    let mut subject = String::new();
    for header in &message.payload.headers {
        match header.name.as_str() {
            "From" => sender = header.value.clone(),
            "Subject" => subject = header.value.clone(),
            _ => {}
        }
    }

    let raw_body = message
        .payload
        .parts
        .iter()
        .find(|part| part.mime_type == "text/plain")
        .map(|part| part.body.data.clone().unwrap_or_default())
        .or_else(|| message.payload.body.data.clone());

    let body = match raw_body {
        Some(data) if !data.is_empty() => {
            let bytes = URL_SAFE.decode(data.as_bytes()).map_err(|e| FeedError::Decode {
                id: message.id.clone(),
                reason: format!("body is not base64url: {e}"),
            })?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        _ => String::new(),
    };

    Ok(MailItem {
        id: message.id,
        received_at_ms,
        sender,
        subject,
        snippet: message.snippet,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_message_json() -> serde_json::Value {
        serde_json::json!({
            "id": "18c2f0a1b2c3d4e5",
            "internalDate": "1700000123456",
            "snippet": "Hi there &amp; hello",
            "payload": {
                "headers": [
                    {"name": "Date", "value": "Tue, 14 Nov 2023 22:15:23 +0000"},
                    {"name": "From", "value": "Alice <alice@example.com>"},
                    {"name": "To", "value": "me@example.com"},
                    {"name": "Subject", "value": "Greetings"}
                ],
                "body": {"size": 0},
                "parts": [
                    {
                        "mimeType": "text/html",
                        "body": {"data": "PGI-aHRtbDwvYj4="}
                    },
                    {
                        "mimeType": "text/plain",
                        "body": {"data": "aGVsbG8gd29ybGQ="}
                    }
                ]
            }
        })
    }

    #[test]
    fn full_message_converts_to_item() {
        let message: MessageResponse = serde_json::from_value(full_message_json()).unwrap();
        let item = message_to_item(message).unwrap();

        assert_eq!(item.id, "18c2f0a1b2c3d4e5");
        assert_eq!(item.received_at_ms, 1_700_000_123_456);
        assert_eq!(item.sender, "Alice <alice@example.com>");
        assert_eq!(item.subject, "Greetings");
        assert_eq!(item.snippet, "Hi there &amp; hello");
        assert_eq!(item.body, "hello world");
    }

    #[test]
    fn top_level_body_is_the_fallback() {
        let message: MessageResponse = serde_json::from_value(serde_json::json!({
            "id": "m-2",
            "internalDate": "1700000000000",
            "payload": {
                "headers": [{"name": "From", "value": "bob@example.com"}],
                "body": {"data": "ZmFsbGJhY2s="}
            }
        }))
        .unwrap();

        let item = message_to_item(message).unwrap();
        assert_eq!(item.body, "fallback");
        assert_eq!(item.subject, "");
    }

    #[test]
    fn bad_internal_date_is_a_decode_error() {
        let message: MessageResponse = serde_json::from_value(serde_json::json!({
            "id": "m-3",
            "internalDate": "not-a-number",
            "payload": {}
        }))
        .unwrap();

        match message_to_item(message) {
            Err(FeedError::Decode { id, .. }) => assert_eq!(id, "m-3"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn bad_base64_body_is_a_decode_error() {
        let message: MessageResponse = serde_json::from_value(serde_json::json!({
            "id": "m-4",
            "internalDate": "1700000000000",
            "payload": {"body": {"data": "!!! not base64 !!!"}}
        }))
        .unwrap();

        assert!(matches!(
            message_to_item(message),
            Err(FeedError::Decode { .. })
        ));
    }

    #[test]
    fn empty_listing_parses_without_messages_key() {
        let list: ListResponse =
            serde_json::from_value(serde_json::json!({"resultSizeEstimate": 0})).unwrap();
        assert!(list.messages.is_empty());
        assert_eq!(list.result_size_estimate, 0);
    }
}
