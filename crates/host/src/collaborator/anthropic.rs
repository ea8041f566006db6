//! Anthropic Messages API collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wire::{RequestId, ToolCallRequest, ToolDefinition};

use super::Reply;
use crate::conversation::{Message, Part, Role};
use crate::{Error, Result};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the Anthropic collaborator.
#[derive(Debug, Clone)]
pub struct AnthropicCollaboratorBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicCollaboratorBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn build(self) -> AnthropicCollaborator {
        AnthropicCollaborator {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
        }
    }
}

/// Reasoning collaborator backed by the Anthropic Messages API.
pub struct AnthropicCollaborator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicCollaborator {
    pub fn builder(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> AnthropicCollaboratorBuilder {
        AnthropicCollaboratorBuilder::new(api_key, model)
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        // Simple case: single text part
        if msg.parts.len() == 1 {
            if let Part::Text { text } = &msg.parts[0] {
                return ApiMessage {
                    role,
                    content: ApiContent::Text(text.clone()),
                };
            }
        }

        let blocks: Vec<ApiContentBlock> = msg
            .parts
            .iter()
            .map(|part| match part {
                Part::Text { text } => ApiContentBlock::Text { text: text.clone() },
                Part::ToolCall(call) => ApiContentBlock::ToolUse {
                    id: call.id.to_string(),
                    name: call.tool_name.clone(),
                    input: call.arguments.clone(),
                },
                Part::ToolResult(result) => ApiContentBlock::ToolResult {
                    tool_use_id: result.request_id.to_string(),
                    content: result.outcome.describe(),
                    is_error: !result.outcome.is_success(),
                },
            })
            .collect();

        ApiMessage {
            role,
            content: ApiContent::Blocks(blocks),
        }
    }

    fn tool_to_api(def: &ToolDefinition) -> ApiTool {
        ApiTool {
            name: def.name.clone(),
            description: def.description.clone().unwrap_or_default(),
            input_schema: def.input_schema.clone(),
        }
    }

    fn response_to_reply(blocks: Vec<ApiResponseBlock>) -> Reply {
        let mut text = Vec::new();
        let mut calls = Vec::new();

        for block in blocks {
            match block {
                ApiResponseBlock::Text { text: t } => text.push(t),
                ApiResponseBlock::ToolUse { id, name, input } => calls.push(ToolCallRequest {
                    id: RequestId::String(id),
                    tool_name: name,
                    arguments: input,
                }),
                ApiResponseBlock::Unknown => {}
            }
        }

        if calls.is_empty() {
            Reply::FinalAnswer(text.join("\n"))
        } else {
            Reply::ToolCalls(calls)
        }
    }
}

impl super::Collaborator for AnthropicCollaborator {
    async fn decide(
        &self,
        system: Option<&str>,
        tools: &[ToolDefinition],
        history: &[Message],
    ) -> Result<Reply> {
        let api_request = ApiRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: history.iter().map(Self::message_to_api).collect(),
            system: system.map(str::to_string),
            tools: tools.iter().map(Self::tool_to_api).collect(),
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("network error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Collaborator(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Collaborator(format!("invalid response: {e}")))?;

        Ok(Self::response_to_reply(api_response.content))
    }
}
