//! Process-wide tool registry.

use crate::{Error, Result};
use std::collections::HashMap;
use supervisor::LaunchSpec;
use wire::ToolDefinition;

/// A tool definition paired with how to launch its executable.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub launch: LaunchSpec,
}

/// Immutable registry of the tools this host may execute.
///
/// Built once at startup; read by the controller (to advertise definitions to
/// the collaborator) and by the pipeline (to validate arguments and resolve
/// the launch spec). A tool absent from this registry can never run, no
/// matter what the policy says.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Build the registry, rejecting duplicate tool names at startup.
    pub fn new(tools: impl IntoIterator<Item = RegisteredTool>) -> Result<Self> {
        let mut map = HashMap::new();
        for tool in tools {
            let name = tool.definition.name.clone();
            if map.insert(name.clone(), tool).is_some() {
                return Err(Error::Config(format!("duplicate tool name '{name}'")));
            }
        }
        Ok(Self { tools: map })
    }

    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Definitions advertised to the reasoning collaborator.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
