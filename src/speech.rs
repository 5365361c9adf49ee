//! Derives the sentence handed to the speech pipeline.

use std::sync::LazyLock;

use mail_parser::decoders::html::html_to_text;
use regex::Regex;

use crate::feed::MailItem;

/// Snippets are cut to this many code points before composing.
const SNIPPET_LIMIT: usize = 140;

/// The `<addr@host>` part of a `From` header display string.
static ADDRESS_PART: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*>").unwrap());

/// Compose the spoken sentence for one message.
///
/// The sender keeps only its display name (angle-bracket address and quote
/// characters removed), the subject is trimmed, and the snippet is
/// entity-unescaped and truncated to [`SNIPPET_LIMIT`] code points.
pub fn speak_text(item: &MailItem) -> String {
    let sender = ADDRESS_PART.replace_all(&item.sender, "").replace('"', "");
    let sender = sender.trim();

    let subject = item.subject.trim();

    let snippet = html_to_text(&item.snippet);
    let snippet: String = snippet.chars().take(SNIPPET_LIMIT).collect();
    let snippet = snippet.trim();

    format!("New mail from {sender}. The subject is {subject}. It begins: {snippet}")
}
