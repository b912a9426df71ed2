//! The action-suggestion contract shared by every analysis strategy.

use async_trait::async_trait;

use crate::error::PlannerError;
use crate::pipeline::types::{ChannelMessage, ProposedAction};

/// Turns recent channel activity into suggested follow-ups.
///
/// Implementations: [`RuleBasedAnalyzer`](crate::pipeline::rules::RuleBasedAnalyzer)
/// (offline, deterministic) and [`LlmAnalyzer`](crate::pipeline::llm_analyzer::LlmAnalyzer).
#[async_trait]
pub trait ActionAnalyzer: Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &str;

    /// Suggest actions for `messages` (oldest first). Output order is kept
    /// as-is in the plan.
    async fn suggest_actions(
        &self,
        messages: &[ChannelMessage],
        focus: Option<&str>,
        time_horizon_hours: u32,
    ) -> Result<Vec<ProposedAction>, PlannerError>;
}
