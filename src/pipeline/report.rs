//! Plan presentation: console table, JSON export, offline input documents.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::pipeline::types::{ActionPlan, SendOutcome, SendResult};

const URGENCY_WIDTH: usize = 7;
const TITLE_MAX: usize = 40;
const DETAILS_MAX: usize = 60;
const RECIPIENT_MAX: usize = 24;
const NO_RECIPIENT: &str = "—";

// ── Console table ───────────────────────────────────────────────────

/// Render the plan as a fixed-width text table.
pub fn render_table(plan: &ActionPlan) -> String {
    let mut out = format!(
        "Suggested follow-ups ({} messages analyzed, next {} hours)\n",
        plan.message_sample_size, plan.timespan_hours
    );

    if plan.actions.is_empty() {
        out.push_str("No actions suggested.\n");
        return out;
    }

    let rows: Vec<[String; 4]> = plan
        .actions
        .iter()
        .map(|a| {
            [
                a.urgency.as_str().to_uppercase(),
                clip(&a.title, TITLE_MAX),
                clip(&a.details, DETAILS_MAX),
                clip(
                    a.recommended_recipient.as_deref().unwrap_or(NO_RECIPIENT),
                    RECIPIENT_MAX,
                ),
            ]
        })
        .collect();

    let header = ["Urgency", "Title", "Details", "Recipient"];
    let mut widths = [URGENCY_WIDTH, 0, 0, 0];
    for (i, h) in header.iter().enumerate() {
        widths[i] = widths[i].max(h.chars().count());
    }
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    push_row(&mut out, &header.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

/// Shorten to `max` characters, marking the cut with an ellipsis.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// One line per send attempt.
pub fn render_send_results(results: &[SendResult]) -> String {
    let mut out = String::new();
    for result in results {
        match &result.outcome {
            SendOutcome::Sent { receipt } => {
                let id = receipt.get("id").and_then(Value::as_str).unwrap_or("?");
                out.push_str(&format!("sent    #{} {} (id {})\n", result.action_index, result.title, id));
            }
            SendOutcome::Failed { reason } => {
                out.push_str(&format!("FAILED  #{} {}: {}\n", result.action_index, result.title, reason));
            }
        }
    }
    out
}

// ── Export document ─────────────────────────────────────────────────

/// Pretty-printed export document.
pub fn plan_to_json(plan: &ActionPlan) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(plan).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse an export document back into a plan.
pub fn plan_from_json(json: &str) -> Result<ActionPlan, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Write the export document to `path`.
pub fn export_plan(plan: &ActionPlan, path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, plan_to_json(plan)?)?;
    tracing::info!(path = %path.display(), "Exported plan");
    Ok(())
}

// ── Offline input ───────────────────────────────────────────────────

/// Either a bare record list or a Graph-style `{"value": [...]}` page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OfflineDocument {
    Bare(Vec<Value>),
    Page {
        #[serde(default)]
        value: Vec<Value>,
    },
}

/// Parse an offline input document into raw records.
pub fn parse_offline_document(json: &str) -> Result<Vec<Value>, ConfigError> {
    let doc: OfflineDocument = serde_json::from_str(json).map_err(|e| {
        ConfigError::ParseError(format!(
            "offline input must be a list of messages or an object with a 'value' list: {e}"
        ))
    })?;
    Ok(match doc {
        OfflineDocument::Bare(records) | OfflineDocument::Page { value: records } => records,
    })
}

/// Read and parse an offline input document.
pub fn load_offline_messages(path: &Path) -> Result<Vec<Value>, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let records = parse_offline_document(&text)?;
    tracing::info!(path = %path.display(), count = records.len(), "Loaded offline messages");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::pipeline::normalize::normalize;
    use crate::pipeline::types::{ProposedAction, Urgency};

    fn sample_plan() -> ActionPlan {
        ActionPlan {
            generated_at: Utc::now(),
            timespan_hours: 8,
            message_sample_size: 3,
            actions: vec![
                ProposedAction::new("Request update from Bob", "Alice needs a status update", Urgency::High)
                    .with_recipient("Bob")
                    .with_message("Hi Bob")
                    .with_related_message("m1"),
                ProposedAction::new("Proactive check-in (General)", "x".repeat(100), Urgency::Low),
            ],
        }
    }

    #[test]
    fn table_has_header_and_rows() {
        let table = render_table(&sample_plan());
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].contains("3 messages analyzed"));
        assert!(lines[1].starts_with("Urgency"));
        assert!(lines[1].contains("Recipient"));
        assert!(lines[3].starts_with("HIGH"));
        assert!(lines[3].ends_with("Bob"));
        assert!(lines[4].starts_with("LOW"));
        assert!(lines[4].ends_with(NO_RECIPIENT));
        assert!(lines[4].contains('…'));
    }

    #[test]
    fn empty_plan_says_so() {
        let mut plan = sample_plan();
        plan.actions.clear();
        assert!(render_table(&plan).contains("No actions suggested."));
    }

    #[test]
    fn clip_marks_cut() {
        assert_eq!(clip("abcdef", 4), "abc…");
        assert_eq!(clip("abc", 4), "abc");
    }

    #[test]
    fn send_results_rendered() {
        let results = vec![
            SendResult {
                action_index: 0,
                title: "a".into(),
                outcome: SendOutcome::Sent {
                    receipt: serde_json::json!({"id": "42"}),
                },
            },
            SendResult {
                action_index: 2,
                title: "b".into(),
                outcome: SendOutcome::Failed {
                    reason: "boom".into(),
                },
            },
        ];
        let text = render_send_results(&results);
        assert!(text.contains("sent    #0 a (id 42)"));
        assert!(text.contains("FAILED  #2 b: boom"));
    }

    #[test]
    fn export_round_trip() {
        let plan = sample_plan();
        let json = plan_to_json(&plan).unwrap();
        let back = plan_from_json(&json).unwrap();
        assert_eq!(back.timespan_hours, plan.timespan_hours);
        assert_eq!(back.message_sample_size, plan.message_sample_size);
        assert_eq!(back.actions, plan.actions);
        assert_eq!(back.generated_at.timestamp(), plan.generated_at.timestamp());
    }

    #[test]
    fn export_document_shape() {
        let json: Value = serde_json::from_str(&plan_to_json(&sample_plan()).unwrap()).unwrap();
        assert!(json["generated_at"].as_str().unwrap().contains('T'));
        assert_eq!(json["timespan_hours"], 8);
        assert_eq!(json["message_sample_size"], 3);
        assert_eq!(json["actions"][0]["urgency"], "high");
        assert_eq!(json["actions"][0]["related_message_id"], "m1");
        assert!(json["actions"][1]["recommended_recipient"].is_null());
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        export_plan(&sample_plan(), &path).unwrap();
        let back = plan_from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.actions.len(), 2);
    }

    #[test]
    fn offline_page_and_bare_list_normalize_identically() {
        let record = r#"{"from": {"user": {"displayName": "Alice"}}, "body": {"content": "<p>hi</p>"}}"#;
        let page = parse_offline_document(&format!(r#"{{"value": [{record}]}}"#)).unwrap();
        let bare = parse_offline_document(&format!("[{record}]")).unwrap();
        assert_eq!(normalize(&page).messages, normalize(&bare).messages);
    }

    #[test]
    fn offline_page_without_value_is_empty() {
        assert!(parse_offline_document(r#"{"@odata.context": "x"}"#).unwrap().is_empty());
    }

    #[test]
    fn offline_rejects_scalars() {
        assert!(matches!(
            parse_offline_document("42"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn load_offline_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        std::fs::write(&path, r#"[{"id": "1"}, {"id": "2"}]"#).unwrap();
        assert_eq!(load_offline_messages(&path).unwrap().len(), 2);
    }

    #[test]
    fn load_offline_missing_file_is_io_error() {
        let err = load_offline_messages(Path::new("/nonexistent/messages.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
