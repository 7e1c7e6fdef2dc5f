use crate::error::GenerationError;
use crate::synthesis::Generator;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 300;

/// Generator backed by an OpenAI-style `/chat/completions` endpoint.
///
/// Requests carry a hard timeout and transient failures (timeouts, 5xx)
/// are retried a bounded number of times with linear backoff before the
/// error is handed back as generation-unavailable.
pub struct ChatGenerator {
    endpoint: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
    client: Client,
}

impl ChatGenerator {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base = api_base.into();
        let endpoint = if base.ends_with("/chat/completions") {
            base
        } else {
            format!("{}/chat/completions", base.trim_end_matches('/'))
        };

        Self {
            endpoint,
            api_key: api_key.into(),
            model: model.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            client: Client::new(),
        }
    }

    /// Reads `LLM_API_BASE` (default `https://api.openai.com/v1`),
    /// `LLM_API_KEY`/`OPENAI_API_KEY` (required), and `LLM_MODEL`.
    pub fn from_env() -> Result<Self, GenerationError> {
        let api_base = std::env::var("LLM_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                GenerationError::NotConfigured(
                    "set LLM_API_KEY or OPENAI_API_KEY".to_string(),
                )
            })?;
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_base, api_key, model))
    }

    fn request_once(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_millis(self.timeout_ms))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "user", "content": prompt }
                ],
                "temperature": 0.2,
            }))
            .send()
            .map_err(|error| self.classify(error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status {
                code: status.as_u16(),
                details: self.endpoint.clone(),
            });
        }

        let payload: Value = response.json().map_err(|error| self.classify(error))?;
        parse_completion(&payload)
    }

    fn classify(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.timeout_ms)
        } else {
            GenerationError::Http(error)
        }
    }
}

impl Generator for ChatGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 1u32;

        loop {
            match self.request_once(prompt) {
                Ok(text) => return Ok(text),
                Err(error) => {
                    if attempt >= MAX_ATTEMPTS || !is_transient(&error) {
                        return Err(error);
                    }
                    std::thread::sleep(Duration::from_millis(
                        BACKOFF_BASE_MS * u64::from(attempt),
                    ));
                    attempt += 1;
                }
            }
        }
    }
}

fn is_transient(error: &GenerationError) -> bool {
    match error {
        GenerationError::Timeout(_) => true,
        GenerationError::Status { code, .. } => (500..=599).contains(code),
        _ => false,
    }
}

fn parse_completion(payload: &Value) -> Result<String, GenerationError> {
    let content = payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GenerationError::BackendResponse(
                "response has no choices[0].message.content".to_string(),
            )
        })?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::BackendResponse(
            "completion content was empty".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_content_is_extracted_and_trimmed() {
        let payload = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  A loop repeats code.\n" } }
            ]
        });
        let text = parse_completion(&payload).unwrap();
        assert_eq!(text, "A loop repeats code.");
    }

    #[test]
    fn missing_choices_are_rejected() {
        let payload = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_completion(&payload),
            Err(GenerationError::BackendResponse(_))
        ));
    }

    #[test]
    fn empty_completion_is_rejected() {
        let payload = serde_json::json!({
            "choices": [ { "message": { "content": "   " } } ]
        });
        assert!(parse_completion(&payload).is_err());
    }

    #[test]
    fn timeouts_and_server_errors_are_transient() {
        assert!(is_transient(&GenerationError::Timeout(30_000)));
        assert!(is_transient(&GenerationError::Status {
            code: 503,
            details: "https://api.example.com/v1/chat/completions".to_string()
        }));
        assert!(!is_transient(&GenerationError::Status {
            code: 401,
            details: "https://api.example.com/v1/chat/completions".to_string()
        }));
    }

    #[test]
    fn client_errors_are_permanent_even_with_5xx_digits_in_the_url() {
        // A local proxy on port 5000 puts "500" in the endpoint string; the
        // status code alone decides whether the call is retried.
        assert!(!is_transient(&GenerationError::Status {
            code: 404,
            details: "http://localhost:5000/v1/chat/completions".to_string()
        }));
        assert!(!is_transient(&GenerationError::BackendResponse(
            "completion content was empty".to_string()
        )));
    }

    #[test]
    fn endpoint_suffix_is_only_appended_once() {
        let generator = ChatGenerator::new("https://api.example.com/v1/", "key", "model");
        assert_eq!(
            generator.endpoint,
            "https://api.example.com/v1/chat/completions"
        );

        let explicit =
            ChatGenerator::new("https://api.example.com/v1/chat/completions", "key", "model");
        assert_eq!(
            explicit.endpoint,
            "https://api.example.com/v1/chat/completions"
        );
    }
}
