//! Rule matching for fetched mail.
//!
//! A rule matches when the sender contains its substring and, if subject
//! substrings are configured, the subject contains at least one of them.
//! Matching is literal and case-sensitive. The rule set as a whole is an
//! OR over rules; an empty or absent set accepts everything.

use serde::{Deserialize, Serialize};

use crate::feed::MailItem;

/// One user-configured selection rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterRule {
    /// Literal substring matched against the `From` header.
    pub sender: String,
    /// Literal substrings matched against the subject. `None` or an empty
    /// list means the sender match alone is sufficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,
}

impl FilterRule {
    fn matches(&self, item: &MailItem) -> bool {
        if !item.sender.contains(&self.sender) {
            return false;
        }
        match &self.subjects {
            None => true,
            Some(subjects) if subjects.is_empty() => true,
            Some(subjects) => subjects
                .iter()
                .any(|needle| item.subject.contains(needle.as_str())),
        }
    }
}

/// Evaluate the rule set against one item.
pub fn matches_any(rules: Option<&[FilterRule]>, item: &MailItem) -> bool {
    match rules {
        None => true,
        Some(rules) if rules.is_empty() => true,
        Some(rules) => rules.iter().any(|rule| rule.matches(item)),
    }
}
