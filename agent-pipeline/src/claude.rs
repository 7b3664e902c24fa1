//! Completion client for the Anthropic messages API
//!
//! The completion service is a black box to the rest of the pipeline: callers
//! hand over a system prompt and a user prompt and get text back. The
//! `CompletionClient` trait is the seam the orchestrator and agent runtimes
//! depend on, so tests can substitute a scripted client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use agent_pipeline_sdk::ExecutionResult;

/// Anthropic messages API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Request timeout. The upstream service has no bound of its own.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Text-completion seam between the pipeline and the language model.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion and return the raw response text.
    async fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String>;
}

/// Anthropic messages API request
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Anthropic messages API response
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Completion client backed by the Anthropic messages API.
pub struct AnthropicClient {
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::upstream)?;

        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            http_client,
        })
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(PipelineError::upstream)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Upstream(format!(
                "completion request failed with {status}: {body}"
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(PipelineError::upstream)?;
        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();

        Ok(text)
    }
}

/// Extract the first JSON object from free text.
///
/// Model responses routinely wrap JSON in prose or code fences; everything
/// outside the outermost braces is ignored.
pub fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Parse a completion response into an execution result.
///
/// A parseable JSON object is deserialized leniently (missing fields default);
/// anything else is wrapped as a raw-text result with reduced confidence.
pub fn parse_execution_result(text: &str) -> ExecutionResult {
    if let Some(value) = extract_json(text) {
        if let Ok(result) = serde_json::from_value::<ExecutionResult>(value) {
            return result;
        }
    }

    ExecutionResult {
        output: Value::String(text.to_string()),
        confidence: Some(0.7),
        ..ExecutionResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_json_ignores_surrounding_prose() {
        let text = "Here is the plan:\n```json\n{\"tasks\": [1, 2]}\n```\nDone.";
        assert_eq!(extract_json(text), Some(json!({"tasks": [1, 2]})));
    }

    #[test]
    fn extract_json_handles_missing_or_malformed_braces() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
        assert_eq!(extract_json("{not valid json}"), None);
    }

    #[test]
    fn parse_wraps_raw_text_with_reduced_confidence() {
        let result = parse_execution_result("The research suggests dark mode is popular.");
        assert_eq!(
            result.output,
            Value::String("The research suggests dark mode is popular.".to_string())
        );
        assert_eq!(result.confidence, Some(0.7));
        assert!(result.next_steps.is_empty());
        assert!(!result.needs_input);
    }

    #[test]
    fn parse_accepts_partial_json_objects() {
        let result = parse_execution_result(r#"{"output": {"summary": "ok"}, "needs_input": true}"#);
        assert_eq!(result.output, json!({"summary": "ok"}));
        assert!(result.needs_input);
        assert_eq!(result.confidence, None);
    }
}
