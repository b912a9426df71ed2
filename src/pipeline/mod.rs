//! Planning pipeline.
//!
//! Every run flows through:
//! 1. `ChannelGateway::get_recent_messages()` or offline records
//! 2. `normalize()`: raw records → `ChannelMessage` (lenient, pure)
//! 3. `ActionAnalyzer::suggest_actions()`: rules or LLM
//! 4. `ActionPlan`: presented, exported, and optionally sent back
//!
//! **Sending is dry-run unless explicitly forced.**

pub mod analyzer;
pub mod llm_analyzer;
pub mod normalize;
pub mod planner;
pub mod report;
pub mod rules;
pub mod types;

pub use analyzer::ActionAnalyzer;
pub use llm_analyzer::LlmAnalyzer;
pub use planner::{PlanRequest, Planner};
pub use rules::RuleBasedAnalyzer;
pub use types::{ActionPlan, ChannelMessage, ProposedAction, SendOutcome, SendResult, Urgency};
