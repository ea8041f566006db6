//! Policy configuration and lookup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Allow/deny decision for a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// The rule that produced a decision. Recorded with every verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// An explicit per-tool rule matched.
    ToolRule(String),
    /// No per-tool rule; the global default applied.
    GlobalDefault,
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToolRule(name) => write!(f, "rules.{name}"),
            Self::GlobalDefault => write!(f, "global_policy"),
        }
    }
}

/// Policy configuration loaded from TOML.
///
/// Lookup is total: every tool name yields exactly one decision, either an
/// explicit per-tool rule or the global default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Default decision applied when no per-tool rule exists.
    pub global_policy: Decision,

    /// Per-tool overrides.
    #[serde(default)]
    pub rules: HashMap<String, Decision>,
}

impl Default for Policy {
    /// Deny by default: absence of an explicit allow is a deny.
    fn default() -> Self {
        Self {
            global_policy: Decision::Deny,
            rules: HashMap::new(),
        }
    }
}

impl Policy {
    /// Load policy from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse policy from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Look up the decision for a tool, with the rule that produced it.
    pub fn decision_for(&self, tool_name: &str) -> (Decision, RuleSource) {
        match self.rules.get(tool_name) {
            Some(&decision) => (decision, RuleSource::ToolRule(tool_name.to_string())),
            None => (self.global_policy, RuleSource::GlobalDefault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_deny_all() {
        let policy = Policy::default();
        let (decision, source) = policy.decision_for("anything");
        assert_eq!(decision, Decision::Deny);
        assert_eq!(source, RuleSource::GlobalDefault);
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
global_policy = "deny"

[rules]
calculate_sum = "allow"
delete_system32 = "deny"
"#;
        let policy = Policy::parse(toml).unwrap();

        let (decision, source) = policy.decision_for("calculate_sum");
        assert_eq!(decision, Decision::Allow);
        assert_eq!(source, RuleSource::ToolRule("calculate_sum".into()));

        assert_eq!(policy.decision_for("delete_system32").0, Decision::Deny);
        // No rule: global default applies.
        assert_eq!(policy.decision_for("unlisted").0, Decision::Deny);
    }

    #[test]
    fn rule_overrides_permissive_default() {
        let toml = r#"
global_policy = "allow"

[rules]
rm = "deny"
"#;
        let policy = Policy::parse(toml).unwrap();
        assert_eq!(policy.decision_for("rm").0, Decision::Deny);
        assert_eq!(policy.decision_for("ls").0, Decision::Allow);
    }

    #[test]
    fn rejects_invalid_decision() {
        let toml = r#"
global_policy = "maybe"
"#;
        assert!(matches!(Policy::parse(toml), Err(Error::Parse(_))));
    }

    #[test]
    fn rejects_missing_global_policy() {
        assert!(Policy::parse("[rules]\nfoo = \"allow\"\n").is_err());
    }
}
