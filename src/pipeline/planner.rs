//! Planner: fetch (or accept offline input) → normalize → analyze → plan,
//! plus the dry-run-gated send-back of suggested messages.
//!
//! **Dry run is the default posture.** Nothing leaves the process unless the
//! caller passes `dry_run = false` explicitly.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::DEFAULT_TIME_HORIZON_HOURS;
use crate::error::PlannerError;
use crate::graph::ChannelGateway;
use crate::pipeline::analyzer::ActionAnalyzer;
use crate::pipeline::normalize::normalize;
use crate::pipeline::types::{ActionPlan, SendOutcome, SendResult, truncate_chars};

/// Default number of messages to fetch.
pub const DEFAULT_TOP: u32 = 40;

/// Default fetch window in hours.
pub const DEFAULT_LOOKBACK_HOURS: u32 = 24;

/// Characters of each message shown in dry-run previews.
const PREVIEW_CHARS: usize = 120;

/// Inputs for one planning run.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub team_id: String,
    pub channel_id: String,
    pub focus: Option<String>,
    pub top: u32,
    pub lookback_hours: u32,
    /// Raw records to use instead of fetching.
    pub offline_messages: Option<Vec<serde_json::Value>>,
}

impl PlanRequest {
    pub fn new(team_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            channel_id: channel_id.into(),
            focus: None,
            top: DEFAULT_TOP,
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            offline_messages: None,
        }
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    pub fn with_top(mut self, top: u32) -> Self {
        self.top = top;
        self
    }

    pub fn with_lookback_hours(mut self, hours: u32) -> Self {
        self.lookback_hours = hours;
        self
    }

    pub fn with_offline_messages(mut self, records: Vec<serde_json::Value>) -> Self {
        self.offline_messages = Some(records);
        self
    }
}

/// Generates action plans and executes their follow-ups.
pub struct Planner {
    gateway: Option<Arc<dyn ChannelGateway>>,
    analyzer: Arc<dyn ActionAnalyzer>,
    time_horizon_hours: u32,
}

impl Planner {
    pub fn new(gateway: Option<Arc<dyn ChannelGateway>>, analyzer: Arc<dyn ActionAnalyzer>) -> Self {
        Self {
            gateway,
            analyzer,
            time_horizon_hours: DEFAULT_TIME_HORIZON_HOURS,
        }
    }

    /// Horizon the suggestions target. Zero is treated as one hour.
    pub fn with_time_horizon_hours(mut self, hours: u32) -> Self {
        self.time_horizon_hours = hours.max(1);
        self
    }

    /// Build a plan from offline records or a live fetch.
    pub async fn generate_plan(&self, request: PlanRequest) -> Result<ActionPlan, PlannerError> {
        let raw = match request.offline_messages {
            Some(records) => {
                info!(count = records.len(), "Using offline messages");
                records
            }
            None => {
                let gateway = self.gateway.as_ref().ok_or_else(|| {
                    PlannerError::NotConfigured(
                        "channel gateway is not configured; provide team and channel ids or offline input"
                            .to_string(),
                    )
                })?;
                gateway
                    .get_recent_messages(
                        &request.team_id,
                        &request.channel_id,
                        request.top,
                        request.lookback_hours,
                    )
                    .await?
            }
        };

        let normalized = normalize(&raw);
        let actions = self
            .analyzer
            .suggest_actions(
                &normalized.messages,
                request.focus.as_deref(),
                self.time_horizon_hours,
            )
            .await?;

        info!(
            analyzer = self.analyzer.name(),
            raw = raw.len(),
            normalized = normalized.messages.len(),
            skipped = normalized.skipped,
            actions = actions.len(),
            "Generated action plan"
        );

        Ok(ActionPlan {
            generated_at: Utc::now(),
            timespan_hours: self.time_horizon_hours,
            message_sample_size: normalized.messages.len(),
            actions,
        })
    }

    /// Send each action's suggested message to the channel, in plan order.
    ///
    /// With `dry_run` the messages are only logged and the result is empty.
    /// Otherwise every candidate yields one `SendResult`; a failed send is
    /// recorded and the remaining actions are still sent.
    pub async fn execute_followups(
        &self,
        plan: &ActionPlan,
        team_id: &str,
        channel_id: &str,
        dry_run: bool,
    ) -> Result<Vec<SendResult>, PlannerError> {
        let gateway = self.gateway.as_ref().ok_or_else(|| {
            PlannerError::NotConfigured("cannot send follow-ups without a channel gateway".to_string())
        })?;

        let mut results = Vec::new();
        for (index, action) in plan.actions.iter().enumerate() {
            let Some(message) = action.sendable_message() else {
                continue;
            };

            if dry_run {
                info!(
                    action = %action.title,
                    preview = truncate_chars(message, PREVIEW_CHARS),
                    "DRY RUN: would send"
                );
                continue;
            }

            let outcome = match gateway
                .send_channel_message(team_id, channel_id, message)
                .await
            {
                Ok(receipt) => {
                    info!(action = %action.title, gateway = gateway.name(), "Sent follow-up");
                    SendOutcome::Sent { receipt }
                }
                Err(e) => {
                    error!(action = %action.title, error = %e, "Failed to send follow-up");
                    SendOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            results.push(SendResult {
                action_index: index,
                title: action.title.clone(),
                outcome,
            });
        }

        let failed = results.iter().filter(|r| !r.is_sent()).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "Some follow-ups failed to send");
        }
        Ok(results)
    }
}
