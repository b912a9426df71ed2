//! Chat gateway abstraction and its Microsoft Graph implementation.

mod client;

pub use client::{GraphClient, GraphCredentials};

use async_trait::async_trait;

use crate::error::GatewayError;

/// Trait for chat gateways: pure I/O, no planning logic.
///
/// Records are returned in the provider's raw JSON shape; the planner
/// normalizes them.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Gateway name for logging (e.g. "graph").
    fn name(&self) -> &str;

    /// Fetch up to `top` messages posted in the last `lookback_hours`.
    async fn get_recent_messages(
        &self,
        team_id: &str,
        channel_id: &str,
        top: u32,
        lookback_hours: u32,
    ) -> Result<Vec<serde_json::Value>, GatewayError>;

    /// Post a message to the channel, returning the provider's receipt.
    async fn send_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<serde_json::Value, GatewayError>;
}
