//! Keyword rules analyzer: no LLM, no I/O.
//!
//! Used for offline runs and tests. Rules, checked per message in order:
//! - status keywords ("update", "status", "eta") → request an update
//! - deadline keywords ("reminder", "due") → confirm deadline ownership
//!
//! If nothing matches across the whole batch, a single low-urgency
//! check-in is suggested instead, so the output is never empty.

use async_trait::async_trait;
use tracing::debug;

use crate::error::PlannerError;
use crate::pipeline::analyzer::ActionAnalyzer;
use crate::pipeline::types::{ChannelMessage, ProposedAction, Urgency, truncate_chars};

const STATUS_KEYWORDS: &[&str] = &["update", "status", "eta"];
const DEADLINE_KEYWORDS: &[&str] = &["reminder", "due"];
const ESCALATION_KEYWORDS: &[&str] = &["overdue", "today"];

const STATUS_DETAILS_CHARS: usize = 80;
const STATUS_MESSAGE_CHARS: usize = 200;
const DEADLINE_DETAILS_CHARS: usize = 100;
const DEADLINE_MESSAGE_CHARS: usize = 160;

const CHECK_IN_DETAILS: &str =
    "No obvious blockers. Consider posting a quick roundup asking for pending items.";
const CHECK_IN_MESSAGE: &str =
    "Quick sync reminder: please share blockers or pending updates for today's agenda.";

/// Deterministic keyword-based analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAnalyzer;

impl RuleBasedAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of the strategy. The rules do not depend on the
    /// planning horizon.
    pub fn analyze(&self, messages: &[ChannelMessage], focus: Option<&str>) -> Vec<ProposedAction> {
        let mut actions: Vec<ProposedAction> = messages.iter().filter_map(rule_for).collect();

        if actions.is_empty() {
            debug!("No keyword matches, suggesting a check-in");
            actions.push(check_in(focus));
        }
        actions
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

fn rule_for(message: &ChannelMessage) -> Option<ProposedAction> {
    let lower = message.content.to_lowercase();
    let target = message
        .mentions
        .first()
        .map(String::as_str)
        .unwrap_or(&message.sender);

    if contains_any(&lower, STATUS_KEYWORDS) {
        let urgency = if contains_any(&lower, ESCALATION_KEYWORDS) {
            Urgency::High
        } else {
            Urgency::Normal
        };
        let first_name = target.split_whitespace().next().unwrap_or(target);
        debug!(id = %message.id, recipient = target, %urgency, "Status rule matched");
        return Some(
            ProposedAction::new(
                format!("Request update from {target}"),
                format!(
                    "{} needs a status update related to: '{}...'",
                    message.sender,
                    truncate_chars(&message.content, STATUS_DETAILS_CHARS)
                ),
                urgency,
            )
            .with_recipient(target)
            .with_message(format!(
                "Hi {first_name}, could you share an update on the request mentioned by {}? Original note: {}",
                message.sender,
                truncate_chars(&message.content, STATUS_MESSAGE_CHARS)
            ))
            .with_related_message(&message.id),
        );
    }

    if contains_any(&lower, DEADLINE_KEYWORDS) {
        debug!(id = %message.id, recipient = target, "Deadline rule matched");
        return Some(
            ProposedAction::new(
                "Confirm deadline ownership",
                format!(
                    "Reminder detected: {}...",
                    truncate_chars(&message.content, DEADLINE_DETAILS_CHARS)
                ),
                Urgency::Normal,
            )
            .with_recipient(target)
            .with_message(format!(
                "Following up on the reminder from {}: {}",
                message.sender,
                truncate_chars(&message.content, DEADLINE_MESSAGE_CHARS)
            ))
            .with_related_message(&message.id),
        );
    }

    None
}

fn check_in(focus: Option<&str>) -> ProposedAction {
    let focus = focus.map(str::trim).filter(|f| !f.is_empty()).unwrap_or("General");
    ProposedAction::new(
        format!("Proactive check-in ({focus})"),
        CHECK_IN_DETAILS,
        Urgency::Low,
    )
    .with_message(CHECK_IN_MESSAGE)
}

#[async_trait]
impl ActionAnalyzer for RuleBasedAnalyzer {
    fn name(&self) -> &str {
        "rules"
    }

    async fn suggest_actions(
        &self,
        messages: &[ChannelMessage],
        focus: Option<&str>,
        _time_horizon_hours: u32,
    ) -> Result<Vec<ProposedAction>, PlannerError> {
        Ok(self.analyze(messages, focus))
    }
}
