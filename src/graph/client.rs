//! Microsoft Graph client for Teams channel messages.
//!
//! Authenticates with the OAuth2 client-credentials flow and caches the
//! access token until shortly before it expires.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ChannelGateway;
use crate::error::GatewayError;

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh this many seconds before the token actually expires.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// App registration credentials for the client-credentials flow.
#[derive(Debug, Clone)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Minimal Graph client: list and post channel messages.
pub struct GraphClient {
    credentials: GraphCredentials,
    client: reqwest::Client,
    graph_base_url: String,
    login_base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl GraphClient {
    pub fn new(credentials: GraphCredentials) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            credentials,
            client,
            graph_base_url: GRAPH_BASE_URL.to_string(),
            login_base_url: LOGIN_BASE_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Point both the Graph API and the token endpoint at other hosts.
    pub fn with_base_urls(mut self, graph_base_url: &str, login_base_url: &str) -> Self {
        self.graph_base_url = graph_base_url.trim_end_matches('/').to_string();
        self.login_base_url = login_base_url.trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self, team_id: &str, channel_id: &str) -> String {
        format!(
            "{}/teams/{}/channels/{}/messages",
            self.graph_base_url, team_id, channel_id
        )
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Utc::now()
        {
            return Ok(token.access_token.clone());
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base_url, self.credentials.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("scope", GRAPH_SCOPE),
        ];

        debug!(tenant = %self.credentials.tenant_id, "Requesting Graph access token");
        let resp = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::Auth {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorResponse>(&text)
                .ok()
                .map(|e| e.error_description.unwrap_or(e.error))
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| format!("status {status}"));
            return Err(GatewayError::Auth { reason });
        }

        let token: TokenResponse = resp.json().await.map_err(|e| GatewayError::Auth {
            reason: format!("invalid token response: {e}"),
        })?;

        let lifetime = (token.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(lifetime),
        });
        info!(expires_in = token.expires_in, "Acquired Graph access token");
        Ok(token.access_token)
    }

    async fn check(resp: reqwest::Response) -> Result<serde_json::Value, GatewayError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

/// `$filter` value selecting messages created after `now - lookback_hours`.
fn created_after_filter(now: DateTime<Utc>, lookback_hours: u32) -> String {
    let start = now - chrono::Duration::hours(i64::from(lookback_hours));
    format!(
        "createdDateTime ge {}",
        start.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

#[async_trait]
impl ChannelGateway for GraphClient {
    fn name(&self) -> &str {
        "graph"
    }

    async fn get_recent_messages(
        &self,
        team_id: &str,
        channel_id: &str,
        top: u32,
        lookback_hours: u32,
    ) -> Result<Vec<serde_json::Value>, GatewayError> {
        let token = self.access_token().await?;

        let mut query = vec![("$top", top.to_string())];
        if lookback_hours > 0 {
            query.push(("$filter", created_after_filter(Utc::now(), lookback_hours)));
        }

        let resp = self
            .client
            .get(self.messages_url(team_id, channel_id))
            .bearer_auth(&token)
            .query(&query)
            .send()
            .await?;
        let data = Self::check(resp).await?;

        let messages = match data.get("value") {
            Some(serde_json::Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        info!(
            team = team_id,
            channel = channel_id,
            count = messages.len(),
            "Fetched channel messages"
        );
        Ok(messages)
    }

    async fn send_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let token = self.access_token().await?;
        let payload = serde_json::json!({
            "body": {"contentType": "html", "content": text}
        });

        let resp = self
            .client
            .post(self.messages_url(team_id, channel_id))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;
        let receipt = Self::check(resp).await?;
        debug!(team = team_id, channel = channel_id, "Posted channel message");
        Ok(receipt)
    }
}
