//! Mail feed abstraction — what a run needs from the provider.

pub mod gmail;

use async_trait::async_trait;

use crate::error::FeedError;

/// One fetched message, normalized for rule matching and speech.
///
/// Built by the provider adapter, consumed within a single run, never
/// persisted.
#[derive(Debug, Clone)]
pub struct MailItem {
    /// Provider-assigned message id.
    pub id: String,
    /// Provider receive timestamp, epoch milliseconds.
    pub received_at_ms: i64,
    /// Raw `From` header value.
    pub sender: String,
    /// Raw `Subject` header value.
    pub subject: String,
    /// Provider-generated preview text (HTML-escaped).
    pub snippet: String,
    /// Decoded plain-text body.
    pub body: String,
}

/// A bulk listing: newest-first items plus the mailbox total.
#[derive(Debug, Clone)]
pub struct MailListing {
    pub items: Vec<MailItem>,
    pub total: u64,
}

/// Account identity and size, refreshed on every commit.
#[derive(Debug, Clone)]
pub struct AccountMetadata {
    pub email: String,
    pub messages_total: u64,
}

/// Provider adapter — pure I/O, no selection logic.
///
/// `list_candidates` returns messages in the provider's order, newest
/// first. Watermark selection and rule matching happen in the caller.
#[async_trait]
pub trait MailFeed: Send + Sync {
    async fn list_candidates(&self) -> Result<MailListing, FeedError>;

    async fn account_metadata(&self) -> Result<AccountMetadata, FeedError>;
}
