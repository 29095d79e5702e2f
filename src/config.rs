//! Adapter configuration
//!
//! The configuration mirrors the shape agents already use: one section per
//! agent (holding `API_KEY`, `API_MODEL` and `API_TYPE`) next to process-wide
//! generation defaults, retry budget and pricing. Unknown top-level keys such
//! as `PRICES` are accepted and left alone.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Agent section name used when the configuration comes from the environment.
pub const ENV_AGENT: &str = "HOST_AGENT";

const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Per-agent provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AgentConfig {
    pub api_key: String,
    pub api_model: String,
    pub api_type: String,
}

/// Unit prices for one model, per estimated token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCost {
    #[serde(default)]
    pub input_cost: f64,
    #[serde(default)]
    pub output_cost: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub max_retry: u32,
    #[serde(default)]
    pub enable_cost_tracking: bool,
    #[serde(default)]
    pub model_costs: HashMap<String, ModelCost>,
    #[serde(flatten)]
    sections: HashMap<String, serde_json::Value>,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Build a configuration from environment variables (and `.env`).
    ///
    /// The agent section is registered under [`ENV_AGENT`].
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let agent = AgentConfig {
            api_key: std::env::var("GEMINI_API_KEY")
                .map_err(|_| Error::Config("GEMINI_API_KEY not set".to_string()))?,
            api_model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            api_type: "gemini".to_string(),
        };

        let model_costs = match std::env::var("MODEL_COSTS") {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| Error::Config(format!("MODEL_COSTS is not valid JSON: {}", e)))?,
            Err(_) => HashMap::new(),
        };

        let mut sections = HashMap::new();
        sections.insert(ENV_AGENT.to_string(), serde_json::to_value(agent)?);

        Ok(Self {
            max_tokens: env_or("MAX_TOKENS", 2000)?,
            temperature: env_or("TEMPERATURE", 0.0)?,
            top_p: env_or("TOP_P", 0.0)?,
            max_retry: env_or("MAX_RETRY", 3)?,
            enable_cost_tracking: env_or("ENABLE_COST_TRACKING", false)?,
            model_costs,
            sections,
        })
    }

    /// Look up the provider section for `agent_type`.
    pub fn agent(&self, agent_type: &str) -> Result<AgentConfig> {
        let section = self
            .sections
            .get(agent_type)
            .ok_or_else(|| Error::Config(format!("No configuration for agent {}", agent_type)))?;

        serde_json::from_value(section.clone()).map_err(|e| {
            Error::Config(format!(
                "Invalid configuration for agent {}: {}",
                agent_type, e
            ))
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
