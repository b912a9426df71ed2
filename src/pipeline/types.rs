//! Shared types for the planning pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Channel message ─────────────────────────────────────────────────

/// One historical chat message, normalized from the provider's raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Provider id, or a stable synthesized id when the record has none.
    pub id: String,
    /// Sender display name.
    pub sender: String,
    /// Plain-text body (markup stripped). May be empty.
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Display names of mentioned users, in order.
    pub mentions: Vec<String>,
}

// ── Urgency ─────────────────────────────────────────────────────────

/// How soon an action should be handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
}

impl Urgency {
    /// Parse a free-form urgency label. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" | "medium" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Proposed action ─────────────────────────────────────────────────

/// One suggested follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub title: String,
    pub details: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub recommended_recipient: Option<String>,
    /// Literal text that would be posted back to the channel.
    #[serde(default)]
    pub suggested_message: Option<String>,
    /// Id of the `ChannelMessage` that triggered this action.
    #[serde(default)]
    pub related_message_id: Option<String>,
}

impl ProposedAction {
    pub fn new(title: impl Into<String>, details: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            title: title.into(),
            details: details.into(),
            urgency,
            recommended_recipient: None,
            suggested_message: None,
            related_message_id: None,
        }
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recommended_recipient = Some(recipient.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.suggested_message = Some(message.into());
        self
    }

    pub fn with_related_message(mut self, id: impl Into<String>) -> Self {
        self.related_message_id = Some(id.into());
        self
    }

    /// The message to send. Absent and empty messages are skipped;
    /// whitespace is sent as written.
    pub fn sendable_message(&self) -> Option<&str> {
        self.suggested_message.as_deref().filter(|m| !m.is_empty())
    }
}

// ── Action plan ─────────────────────────────────────────────────────

/// Output of one planning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub generated_at: DateTime<Utc>,
    /// Horizon the suggestions target.
    pub timespan_hours: u32,
    /// Number of normalized messages the analyzer saw.
    pub message_sample_size: usize,
    /// In analyzer output order.
    pub actions: Vec<ProposedAction>,
}

// ── Follow-up results ───────────────────────────────────────────────

/// Outcome of sending one suggested message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    Sent { receipt: serde_json::Value },
    Failed { reason: String },
}

/// One entry per attempted send, in plan order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendResult {
    /// Position of the action in `ActionPlan::actions`.
    pub action_index: usize,
    pub title: String,
    pub outcome: SendOutcome,
}

impl SendResult {
    pub fn is_sent(&self) -> bool {
        matches!(self.outcome, SendOutcome::Sent { .. })
    }
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_parse_is_case_insensitive() {
        assert_eq!(Urgency::parse("HIGH"), Some(Urgency::High));
        assert_eq!(Urgency::parse(" low "), Some(Urgency::Low));
        assert_eq!(Urgency::parse("Normal"), Some(Urgency::Normal));
        assert_eq!(Urgency::parse("medium"), Some(Urgency::Normal));
        assert_eq!(Urgency::parse("critical"), None);
        assert_eq!(Urgency::parse(""), None);
    }

    #[test]
    fn urgency_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Urgency::High).unwrap(), "high");
        let u: Urgency = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(u, Urgency::Low);
    }

    #[test]
    fn urgency_default_is_normal() {
        assert_eq!(Urgency::default(), Urgency::Normal);
    }

    #[test]
    fn action_serializes_absent_optionals_as_null() {
        let action = ProposedAction::new("t", "d", Urgency::Low);
        let json = serde_json::to_value(&action).unwrap();
        assert!(json["recommended_recipient"].is_null());
        assert!(json["suggested_message"].is_null());
        assert!(json["related_message_id"].is_null());
        assert_eq!(json["urgency"], "low");
    }

    #[test]
    fn sendable_message_skips_only_absent_or_empty() {
        let absent = ProposedAction::new("t", "d", Urgency::Low);
        assert_eq!(absent.sendable_message(), None);
        let empty = ProposedAction::new("t", "d", Urgency::Low).with_message("");
        assert_eq!(empty.sendable_message(), None);
        let spaces = ProposedAction::new("t", "d", Urgency::Low).with_message("   ");
        assert_eq!(spaces.sendable_message(), Some("   "));
        let real = ProposedAction::new("t", "d", Urgency::Low).with_message("hi");
        assert_eq!(real.sendable_message(), Some("hi"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn send_outcome_tagged() {
        let result = SendResult {
            action_index: 2,
            title: "x".into(),
            outcome: SendOutcome::Failed {
                reason: "boom".into(),
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert!(!result.is_sent());
    }
}
