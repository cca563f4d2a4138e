/// LLM Client — the single point of entry for all completion calls.
///
/// No other module may call the Anthropic API directly. Candidate scoring and
/// job-description drafting both go through `LlmClient`.
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all completion calls.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenated text of all text blocks.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Messages API client with retry on 429 and 5xx.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, api_key })
    }

    /// Makes a raw call, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        max_tokens: u32,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = MessagesRequest {
            model: MODEL,
            max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Returns the model's free-text answer.
    pub async fn complete(
        &self,
        prompt: &str,
        system: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.call(prompt, system, max_tokens)
            .await?
            .text()
            .ok_or(LlmError::EmptyContent)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"score\": 80}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 80}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"score\": 80}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 80}");
    }

    #[test]
    fn test_strip_json_fences_unterminated() {
        let input = "```json\n{\"score\": 80}";
        assert_eq!(strip_json_fences(input), "{\"score\": 80}");
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let response: LlmResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "text", "text": "Hello "},
                    {"type": "tool_use", "text": null},
                    {"type": "text", "text": "world"}
                ],
                "usage": {"input_tokens": 3, "output_tokens": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_blank_response_has_no_text() {
        let response: LlmResponse = serde_json::from_str(
            r#"{"content": [{"type": "text", "text": "  "}], "usage": {"input_tokens": 1, "output_tokens": 1}}"#,
        )
        .unwrap();
        assert!(response.text().is_none());
    }
}
