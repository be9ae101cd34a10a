use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{LangbaseError, LangbaseResult};
use crate::reflection::ReflectionPrompt;
use crate::rubric::{AnalysisResult, RawCoaching};

/// Message in a Langbase conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Pipe instructions
    System,
    /// Caller input
    User,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request to run a Langbase pipe
#[derive(Debug, Clone, Serialize)]
pub struct PipeRequest {
    /// Pipe name (required by Langbase API)
    pub name: String,
    /// Conversation sent to the pipe
    pub messages: Vec<Message>,
    /// Always false; the workshop reads whole completions.
    pub stream: bool,
    /// Template variables substituted into the pipe prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,
}

impl PipeRequest {
    /// Create a non-streaming request
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
            variables: None,
        }
    }

    /// Add a single template variable
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Response from a Langbase pipe
#[derive(Debug, Clone, Deserialize)]
pub struct PipeResponse {
    /// Whether the pipe ran
    pub success: bool,
    /// Model output text
    pub completion: String,
    /// Model details, when returned
    pub raw: Option<RawResponse>,
}

/// Raw model response details
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    /// Model identifier
    pub model: Option<String>,
    /// Token counts
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: Option<u32>,
    /// Tokens in the completion
    pub completion_tokens: Option<u32>,
    /// Prompt plus completion
    pub total_tokens: Option<u32>,
}

impl PipeResponse {
    /// Model that produced the completion, when reported
    pub fn model(&self) -> Option<&str> {
        self.raw.as_ref().and_then(|r| r.model.as_deref())
    }
}

/// Request to create (or upsert) a Langbase pipe
#[derive(Debug, Clone, Serialize)]
pub struct CreatePipeRequest {
    /// Pipe name
    pub name: String,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Model in `provider:model` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Update the pipe if it already exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upsert: Option<bool>,
    /// Force JSON output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Completion token limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stored prompt messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

/// Response from creating a pipe
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePipeResponse {
    /// Pipe name
    pub name: String,
    /// Creation status
    #[serde(default)]
    pub status: Option<String>,
    /// Pipe URL
    #[serde(default)]
    pub url: Option<String>,
}

impl CreatePipeRequest {
    /// JSON-mode pipe with a single system prompt
    pub fn json_pipe(name: impl Into<String>, system_prompt: &str) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            upsert: Some(true),
            json: Some(true),
            temperature: None,
            max_tokens: None,
            messages: Some(vec![Message::system(system_prompt)]),
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set model (e.g., "openai:gpt-4o-mini")
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Pull the JSON document out of a completion that may be wrapped in a
/// markdown code fence.
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    let fenced = if completion.contains("```json") {
        completion.split("```json").nth(1)
    } else {
        completion.split("```").nth(1)
    };

    fenced
        .and_then(|s| s.split("```").next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            format!(
                "No JSON found in response. First 100 chars: '{}'",
                completion.chars().take(100).collect::<String>()
            )
        })
}

fn parse_completion(completion: &str) -> LangbaseResult<Value> {
    let json = extract_json_from_completion(completion)
        .map_err(|message| LangbaseError::InvalidResponse { message })?;
    serde_json::from_str(json).map_err(|e| LangbaseError::InvalidResponse {
        message: format!("Completion is not valid JSON: {}", e),
    })
}

/// Analysis pipe completion, validated.
#[derive(Debug, Clone)]
pub struct AnalysisCompletion {
    /// Validated rubric scores.
    pub analysis: AnalysisResult,
    /// Qualitative coaching, when the pipe returned it.
    pub coaching: Option<RawCoaching>,
}

impl AnalysisCompletion {
    /// Parse and validate an analysis completion
    pub fn from_completion(completion: &str) -> LangbaseResult<Self> {
        let value = parse_completion(completion)?;
        let analysis =
            AnalysisResult::from_value(&value).map_err(|e| LangbaseError::InvalidResponse {
                message: e.to_string(),
            })?;
        let coaching = value
            .get("coaching")
            .filter(|c| !c.is_null())
            .map(RawCoaching::from_value);
        Ok(Self { analysis, coaching })
    }
}

/// Reflection pipe completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ReflectionCompletion {
    /// Generated prompts with blank questions dropped.
    pub prompts: Vec<ReflectionPrompt>,
}

impl ReflectionCompletion {
    /// Parse a reflection completion; accepts a bare array as well
    pub fn from_completion(completion: &str) -> LangbaseResult<Self> {
        let value = parse_completion(completion)?;
        let prompts = match value {
            Value::Array(_) => value,
            Value::Object(mut map) => map.remove("prompts").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        let prompts: Vec<ReflectionPrompt> =
            serde_json::from_value(prompts).map_err(|e| LangbaseError::InvalidResponse {
                message: format!("Malformed reflection prompts: {}", e),
            })?;
        Ok(Self { prompts })
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
