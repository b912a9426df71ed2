//! LLM-backed analyzer: one prompt in, one JSON action list out.
//!
//! No retry and no fallback here. A response that does not parse is a
//! `MalformedResponse`; whether to fall back to the rules analyzer is the
//! caller's decision.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PlannerError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::analyzer::ActionAnalyzer;
use crate::pipeline::types::{ChannelMessage, ProposedAction, Urgency, truncate_chars};

const ANALYSIS_TEMPERATURE: f32 = 0.4;

/// Room for a dozen or so actions with suggested messages.
const ANALYSIS_MAX_TOKENS: u32 = 1500;

/// Per-message content cap in the prompt.
const PROMPT_CONTENT_CHARS: usize = 400;

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_FOCUS: &str = "General productivity";

/// Suggests actions by asking an LLM.
pub struct LlmAnalyzer {
    llm: Arc<dyn LlmProvider>,
}

impl LlmAnalyzer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ActionAnalyzer for LlmAnalyzer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn suggest_actions(
        &self,
        messages: &[ChannelMessage],
        focus: Option<&str>,
        time_horizon_hours: u32,
    ) -> Result<Vec<ProposedAction>, PlannerError> {
        let user_prompt = build_user_prompt(messages, focus, time_horizon_hours);
        debug!(
            model = self.llm.model_name(),
            messages = messages.len(),
            prompt_chars = user_prompt.len(),
            "Requesting action suggestions"
        );

        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ])
        .with_temperature(ANALYSIS_TEMPERATURE)
        .with_max_tokens(ANALYSIS_MAX_TOKENS);

        let response = self.llm.complete(request).await?;

        let actions = parse_actions(&response.content).map_err(|e| {
            warn!(
                raw_response = %response.content,
                error = %e,
                "Failed to parse action suggestions"
            );
            PlannerError::MalformedResponse(e)
        })?;

        info!(
            model = self.llm.model_name(),
            count = actions.len(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "LLM suggested actions"
        );
        Ok(actions)
    }
}

// ── Prompt construction ─────────────────────────────────────────────

const SYSTEM_PROMPT: &str = "You are an operations chief of staff bot that reviews Microsoft Teams \
     channels. Summarize active threads and propose tactically useful actions. \
     Respond with strict JSON using the schema: {\"actions\":[{\"title\":str,\
     \"details\":str,\"urgency\":\"low|normal|high\",\"recommended_recipient\":str|null,\
     \"suggested_message\":str|null,\"related_message_id\":str|null}]}";

/// One line per message, then the horizon and focus.
fn build_user_prompt(
    messages: &[ChannelMessage],
    focus: Option<&str>,
    time_horizon_hours: u32,
) -> String {
    let mut rows = Vec::with_capacity(messages.len() + 3);
    rows.push("Recent Teams channel activity (oldest to newest):".to_string());

    for msg in messages {
        let mentions = if msg.mentions.is_empty() {
            String::new()
        } else {
            format!(" mentions {}", msg.mentions.join(", "))
        };
        rows.push(format!(
            "- {} | {}{}: {}",
            msg.created_at.to_rfc3339(),
            msg.sender,
            mentions,
            truncate_chars(&msg.content, PROMPT_CONTENT_CHARS)
        ));
    }

    let focus = focus.map(str::trim).filter(|f| !f.is_empty()).unwrap_or(DEFAULT_FOCUS);
    rows.push(format!(
        "Desired time horizon: next {time_horizon_hours} hours. Operational focus: {focus}."
    ));
    rows.push(
        "Return an action list prioritizing blockers, unresolved requests, and status updates."
            .to_string(),
    );
    rows.join("\n")
}

// ── Response parsing ────────────────────────────────────────────────

/// One action as the model wrote it. Any field may be missing or of the
/// wrong JSON type; scalars are read as text.
#[derive(Debug, Default, Deserialize)]
struct RawAction {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    details: Option<Value>,
    #[serde(default)]
    urgency: Option<Value>,
    #[serde(default)]
    recommended_recipient: Option<Value>,
    #[serde(default)]
    suggested_message: Option<Value>,
    #[serde(default)]
    related_message_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionsPayload {
    Wrapped {
        #[serde(default)]
        actions: Vec<RawAction>,
    },
    Bare(Vec<RawAction>),
}

/// Text form of a scalar. Numbers keep their JSON spelling; null, arrays
/// and objects have none.
fn scalar_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn non_blank(value: Option<Value>) -> Option<String> {
    scalar_text(value).filter(|v| !v.trim().is_empty())
}

fn coerce_urgency(raw: Option<&Value>) -> Urgency {
    match raw {
        None | Some(Value::Null) => Urgency::default(),
        Some(Value::String(label)) => Urgency::parse(label).unwrap_or_else(|| {
            warn!(urgency = %label, "Unknown urgency from model, using normal");
            Urgency::Normal
        }),
        Some(other) => {
            warn!(urgency = %other, "Non-text urgency from model, using normal");
            Urgency::Normal
        }
    }
}

impl From<RawAction> for ProposedAction {
    fn from(raw: RawAction) -> Self {
        Self {
            urgency: coerce_urgency(raw.urgency.as_ref()),
            title: non_blank(raw.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            details: scalar_text(raw.details).unwrap_or_default(),
            recommended_recipient: non_blank(raw.recommended_recipient),
            suggested_message: non_blank(raw.suggested_message),
            related_message_id: non_blank(raw.related_message_id),
        }
    }
}

/// Parse the model output into actions.
fn parse_actions(raw: &str) -> Result<Vec<ProposedAction>, String> {
    if raw.trim().is_empty() {
        return Err("empty response".to_string());
    }
    let json_str = extract_json(raw);
    let payload: ActionsPayload =
        serde_json::from_str(json_str).map_err(|e| format!("JSON parse error: {e}"))?;

    let raw_actions = match payload {
        ActionsPayload::Wrapped { actions } | ActionsPayload::Bare(actions) => actions,
    };
    Ok(raw_actions.into_iter().map(ProposedAction::from).collect())
}

/// Extract a JSON object or array from LLM output (handles markdown wrapping).
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return inner;
            }
        }
    }

    // Outermost object, else outermost array.
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close))
            && end > start
        {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn message(id: &str, sender: &str, content: &str, mentions: &[&str]) -> ChannelMessage {
        ChannelMessage {
            id: id.into(),
            sender: sender.into(),
            content: content.into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            mentions: mentions.iter().map(|m| m.to_string()).collect(),
        }
    }

    // ── Prompt construction ─────────────────────────────────────────

    #[test]
    fn system_prompt_describes_schema() {
        assert!(SYSTEM_PROMPT.contains("\"actions\""));
        assert!(SYSTEM_PROMPT.contains("low|normal|high"));
        assert!(SYSTEM_PROMPT.contains("related_message_id"));
    }

    #[test]
    fn user_prompt_lists_messages() {
        let msgs = vec![
            message("1", "Alice", "Where is the deck?", &["Bob", "Cy"]),
            message("2", "Bob", "Uploading now", &[]),
        ];
        let prompt = build_user_prompt(&msgs, Some("customers"), 6);
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[0], "Recent Teams channel activity (oldest to newest):");
        assert_eq!(
            lines[1],
            "- 2024-05-01T09:00:00+00:00 | Alice mentions Bob, Cy: Where is the deck?"
        );
        assert_eq!(lines[2], "- 2024-05-01T09:00:00+00:00 | Bob: Uploading now");
        assert_eq!(
            lines[3],
            "Desired time horizon: next 6 hours. Operational focus: customers."
        );
        assert!(lines[4].starts_with("Return an action list"));
    }

    #[test]
    fn user_prompt_default_focus() {
        let prompt = build_user_prompt(&[], None, 8);
        assert!(prompt.contains("Operational focus: General productivity."));
    }

    #[test]
    fn user_prompt_truncates_content() {
        let long = "x".repeat(1000);
        let prompt = build_user_prompt(&[message("1", "A", &long, &[])], None, 8);
        let line = prompt.lines().nth(1).unwrap();
        let body = line.split(": ").nth(1).unwrap();
        assert_eq!(body.len(), PROMPT_CONTENT_CHARS);
    }

    // ── Response parsing ────────────────────────────────────────────

    #[test]
    fn parses_wrapped_actions() {
        let raw = r#"{"actions": [
            {"title": "Ping Bob", "details": "Deck missing", "urgency": "high",
             "recommended_recipient": "Bob", "suggested_message": "Bob, deck?", "related_message_id": "1"}
        ]}"#;
        let actions = parse_actions(raw).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Ping Bob");
        assert_eq!(actions[0].urgency, Urgency::High);
        assert_eq!(actions[0].recommended_recipient.as_deref(), Some("Bob"));
        assert_eq!(actions[0].related_message_id.as_deref(), Some("1"));
    }

    #[test]
    fn parses_bare_array() {
        let actions = parse_actions(r#"[{"title": "A"}, {"title": "B"}]"#).unwrap();
        let titles: Vec<_> = actions.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn applies_defaults() {
        let actions = parse_actions(r#"{"actions": [{}]}"#).unwrap();
        let action = &actions[0];
        assert_eq!(action.title, "Untitled");
        assert_eq!(action.details, "");
        assert_eq!(action.urgency, Urgency::Normal);
        assert!(action.recommended_recipient.is_none());
        assert!(action.suggested_message.is_none());
        assert!(action.related_message_id.is_none());
    }

    #[test]
    fn coerces_unknown_urgency() {
        let actions = parse_actions(
            r#"{"actions": [{"urgency": "CRITICAL"}, {"urgency": "Low"}, {"urgency": null}]}"#,
        )
        .unwrap();
        assert_eq!(actions[0].urgency, Urgency::Normal);
        assert_eq!(actions[1].urgency, Urgency::Low);
        assert_eq!(actions[2].urgency, Urgency::Normal);
    }

    #[test]
    fn numeric_related_message_id_is_kept_as_text() {
        let actions = parse_actions(
            r#"{"actions":[{"title":"Ping Bob","urgency":"high","related_message_id":1700000000001}]}"#,
        )
        .unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Ping Bob");
        assert_eq!(actions[0].urgency, Urgency::High);
        assert_eq!(actions[0].related_message_id.as_deref(), Some("1700000000001"));
    }

    #[test]
    fn numeric_urgency_becomes_normal() {
        let actions =
            parse_actions(r#"{"actions": [{"title": "A", "urgency": 2}, {"title": "B", "urgency": "low"}]}"#)
                .unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].urgency, Urgency::Normal);
        assert_eq!(actions[1].urgency, Urgency::Low);
    }

    #[test]
    fn non_scalar_fields_fall_back_to_defaults() {
        let actions = parse_actions(
            r#"[{"title": ["x"], "details": 42, "recommended_recipient": {"name": "Bob"}, "suggested_message": true}]"#,
        )
        .unwrap();
        assert_eq!(actions[0].title, "Untitled");
        assert_eq!(actions[0].details, "42");
        assert!(actions[0].recommended_recipient.is_none());
        assert_eq!(actions[0].suggested_message.as_deref(), Some("true"));
    }

    #[test]
    fn blank_optionals_become_none() {
        let actions =
            parse_actions(r#"{"actions": [{"title": " ", "suggested_message": ""}]}"#).unwrap();
        assert_eq!(actions[0].title, "Untitled");
        assert!(actions[0].suggested_message.is_none());
    }

    #[test]
    fn empty_action_list_is_ok() {
        assert!(parse_actions(r#"{"actions": []}"#).unwrap().is_empty());
        assert!(parse_actions(r#"{"summary": "nothing"}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_actions("Sorry, I can't help with that.").is_err());
        assert!(parse_actions("").is_err());
        assert!(parse_actions(r#"{"actions": "none"}"#).is_err());
    }

    #[test]
    fn extract_json_from_markdown() {
        let input = "Here you go:\n```json\n{\"actions\": []}\n```\n";
        assert_eq!(extract_json(input), "{\"actions\": []}");
    }

    #[test]
    fn extract_json_from_plain_fence() {
        let input = "```\n[{\"title\": \"x\"}]\n```";
        assert_eq!(extract_json(input), "[{\"title\": \"x\"}]");
    }

    #[test]
    fn extract_json_with_surrounding_text() {
        let input = "Sure! {\"actions\": [{\"title\": \"x\"}]} hope that helps";
        assert_eq!(extract_json(input), "{\"actions\": [{\"title\": \"x\"}]}");
    }

    // ── Provider interaction ────────────────────────────────────────

    struct CannedLlm {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for CannedLlm {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<crate::llm::CompletionResponse, crate::error::LlmError> {
            assert_eq!(request.temperature, Some(ANALYSIS_TEMPERATURE));
            assert!(request.system_prompt().is_some());
            Ok(crate::llm::CompletionResponse {
                content: self.reply.clone(),
                input_tokens: 10,
                output_tokens: 5,
            })
        }
    }

    fn analyzer(reply: &str) -> LlmAnalyzer {
        LlmAnalyzer::new(Arc::new(CannedLlm {
            reply: reply.to_string(),
        }))
    }

    #[tokio::test]
    async fn malformed_reply_is_an_error() {
        let err = analyzer("not json at all")
            .suggest_actions(&[message("1", "A", "hi", &[])], None, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn valid_reply_maps_actions() {
        let actions = analyzer(r#"{"actions": [{"title": "Follow up", "urgency": "high"}]}"#)
            .suggest_actions(&[], Some("blockers"), 8)
            .await
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].urgency, Urgency::High);
    }
}
