//! Configuration loading from warden.toml.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use host::RegisteredTool;
use policy::{Policy, PolicyStore};
use serde::Deserialize;
use supervisor::{LaunchSpec, SupervisorConfig};
use wire::ToolDefinition;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Reasoning collaborator configuration.
    #[serde(default)]
    pub collaborator: CollaboratorConfig,

    /// Process supervisor tuning.
    #[serde(default)]
    pub supervisor: SupervisorSection,

    /// Inline policy. Mutually exclusive with `policy_file`.
    pub policy: Option<Policy>,

    /// Path to a standalone policy file. Unlike an inline policy, a file
    /// can be hot-reloaded with the `reload` chat command.
    pub policy_file: Option<PathBuf>,

    /// Tool registrations.
    #[serde(default)]
    pub tools: Vec<ToolEntry>,
}

/// Reasoning collaborator provider configuration.
#[derive(Debug, Deserialize, Default)]
pub struct CollaboratorConfig {
    /// Provider name (currently only "anthropic" supported).
    #[serde(default = "default_provider")]
    #[allow(dead_code)]
    pub provider: String,

    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Anthropic API key. Falls back to ANTHROPIC_API_KEY when unset.
    pub api_key: Option<String>,
}

/// Supervisor knobs, all optional.
#[derive(Debug, Deserialize, Default)]
pub struct SupervisorSection {
    pub max_concurrent: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub grace_period_ms: Option<u64>,
}

/// One registered tool: what to advertise and how to launch it.
#[derive(Debug, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub input_schema: serde_json::Value,
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Create a default configuration: no tools, deny-all policy.
    pub fn default_config() -> Self {
        Self {
            collaborator: CollaboratorConfig::default(),
            supervisor: SupervisorSection::default(),
            policy: None,
            policy_file: None,
            tools: Vec::new(),
        }
    }

    /// Resolve the API key from config or environment.
    pub fn api_key(&self) -> Option<String> {
        self.collaborator
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }

    /// Build the policy store from config.
    ///
    /// Absence of any policy section means deny-all.
    pub fn policy_store(&self) -> Result<PolicyStore, ConfigError> {
        match (&self.policy, &self.policy_file) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousPolicy),
            (Some(inline), None) => Ok(PolicyStore::new(inline.clone())),
            (None, Some(path)) => {
                PolicyStore::open(path).map_err(|e| ConfigError::Policy(e.to_string()))
            }
            (None, None) => Ok(PolicyStore::new(Policy::default())),
        }
    }

    /// Effective policy snapshot, for dry-run checks.
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        match (&self.policy, &self.policy_file) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousPolicy),
            (Some(inline), None) => Ok(inline.clone()),
            (None, Some(path)) => Policy::load(path).map_err(|e| ConfigError::Policy(e.to_string())),
            (None, None) => Ok(Policy::default()),
        }
    }

    /// Supervisor configuration with config overrides applied.
    pub fn supervisor_config(&self) -> SupervisorConfig {
        let defaults = SupervisorConfig::default();
        SupervisorConfig {
            max_concurrent: self.supervisor.max_concurrent.unwrap_or(defaults.max_concurrent),
            default_timeout: self
                .supervisor
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_timeout),
            grace_period: self
                .supervisor
                .grace_period_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.grace_period),
        }
    }

    /// Turn tool entries into registry registrations.
    pub fn registered_tools(&self) -> Vec<RegisteredTool> {
        self.tools
            .iter()
            .map(|entry| RegisteredTool {
                definition: ToolDefinition {
                    name: entry.name.clone(),
                    description: entry.description.clone(),
                    input_schema: entry.input_schema.clone(),
                },
                launch: LaunchSpec {
                    tool_name: entry.name.clone(),
                    command: entry.command.clone(),
                    args: entry.args.clone(),
                    env: entry.env.clone(),
                },
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("ambiguous policy: set either [policy] OR policy_file, not both")]
    AmbiguousPolicy,

    #[error("failed to load policy: {0}")]
    Policy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::Decision;

    const SAMPLE: &str = r#"
[collaborator]
model = "claude-sonnet-4-20250514"

[supervisor]
max_concurrent = 4
timeout_secs = 30

[policy]
global_policy = "deny"

[policy.rules]
calculate_sum = "allow"

[[tools]]
name = "calculate_sum"
description = "Add two numbers"
command = "stub-tool"
input_schema = { type = "object", properties = { a = { type = "number" }, b = { type = "number" } }, required = ["a", "b"] }
"#;

    #[test]
    fn parse_full_config() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.tools.len(), 1);
        assert_eq!(config.tools[0].name, "calculate_sum");

        let sup = config.supervisor_config();
        assert_eq!(sup.max_concurrent, 4);
        assert_eq!(sup.default_timeout, Duration::from_secs(30));

        let policy = config.policy().unwrap();
        assert_eq!(policy.decision_for("calculate_sum").0, Decision::Allow);
        assert_eq!(policy.decision_for("other").0, Decision::Deny);
    }

    #[test]
    fn empty_config_denies_everything() {
        let config = Config::parse("").unwrap();
        assert!(config.tools.is_empty());
        assert_eq!(config.policy().unwrap().decision_for("x").0, Decision::Deny);
    }

    #[test]
    fn inline_and_file_policy_conflict() {
        let toml = r#"
policy_file = "policy.toml"

[policy]
global_policy = "allow"
"#;
        let config = Config::parse(toml).unwrap();
        assert!(matches!(
            config.policy_store(),
            Err(ConfigError::AmbiguousPolicy)
        ));
    }

    #[test]
    fn tool_entries_become_registrations() {
        let config = Config::parse(SAMPLE).unwrap();
        let tools = config.registered_tools();
        assert_eq!(tools[0].launch.command, "stub-tool");
        assert_eq!(tools[0].definition.input_schema["type"], "object");
    }
}
