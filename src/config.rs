//! Runtime settings sourced from the environment and an optional `.env` file.

use std::path::Path;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default model used when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default planning horizon in hours.
pub const DEFAULT_TIME_HORIZON_HOURS: u32 = 8;

/// Placeholder used for Graph credentials when running offline.
const OFFLINE: &str = "offline";

/// Planner settings.
///
/// Secrets are wrapped in [`SecretString`], so the derived `Debug` output
/// never prints them.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub openai_api_key: SecretString,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub planner_time_horizon_hours: u32,
}

impl Settings {
    /// Load settings from the process environment, reading `env_file` first
    /// when it exists. Variables already set in the process take precedence.
    pub fn from_env(
        env_file: Option<&Path>,
        require_ai: bool,
        require_graph: bool,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = env_file
            && path.exists()
        {
            dotenvy::from_path(path).map_err(|e| {
                ConfigError::ParseError(format!("{}: {}", path.display(), e))
            })?;
            tracing::debug!(path = %path.display(), "Loaded env file");
        }

        Self::from_lookup(|key| std::env::var(key).ok(), require_ai, require_graph)
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(
        lookup: F,
        require_ai: bool,
        require_graph: bool,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let graph_var = |key: &str| -> Result<String, ConfigError> {
            match get(key) {
                Some(v) => Ok(v),
                None if require_graph => Err(ConfigError::MissingEnvVar(key.to_string())),
                None => Ok(OFFLINE.to_string()),
            }
        };

        let tenant_id = graph_var("TEAMS_TENANT_ID")?;
        let client_id = graph_var("TEAMS_CLIENT_ID")?;
        let client_secret = graph_var("TEAMS_CLIENT_SECRET")?;

        let openai_api_key = match get("OPENAI_API_KEY") {
            Some(v) => v,
            None if require_ai => {
                return Err(ConfigError::MissingRequired {
                    key: "OPENAI_API_KEY".to_string(),
                    hint: "Set it or run with --fake-ai for offline testing.".to_string(),
                });
            }
            None => OFFLINE.to_string(),
        };

        let planner_time_horizon_hours = match get("PLANNER_TIME_HORIZON_HOURS") {
            Some(raw) => parse_horizon(&raw)?,
            None => DEFAULT_TIME_HORIZON_HOURS,
        };

        Ok(Self {
            tenant_id,
            client_id,
            client_secret: SecretString::from(client_secret),
            openai_api_key: SecretString::from(openai_api_key),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: get("OPENAI_BASE_URL"),
            planner_time_horizon_hours,
        })
    }

    /// Settings as JSON with secrets replaced, for logging.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "tenant_id": self.tenant_id,
            "client_id": self.client_id,
            "client_secret": "***",
            "openai_api_key": "***",
            "openai_model": self.openai_model,
            "openai_base_url": self.openai_base_url,
            "planner_time_horizon_hours": self.planner_time_horizon_hours,
        })
    }
}

fn parse_horizon(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: "PLANNER_TIME_HORIZON_HOURS".to_string(),
            message: "must be greater than zero".to_string(),
        }),
        Ok(hours) => Ok(hours),
        Err(e) => Err(ConfigError::InvalidValue {
            key: "PLANNER_TIME_HORIZON_HOURS".to_string(),
            message: e.to_string(),
        }),
    }
}
