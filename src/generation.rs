//! Text generation backends.
//!
//! The only deployment backend is [`GeminiBackend`], which calls the Gemini
//! REST API:
//!
//! ```text
//! POST {base_url}/v1beta/models/{model}:generateContent
//! x-goog-api-key: <key>
//! ```
//!
//! The API key is read from the environment variable named by
//! `[generation].api_key_env` when the backend is built, so a missing key
//! is reported at startup, before any document is processed.
//!
//! Each question makes exactly one request. Errors (network, non-2xx,
//! unparseable body) are returned as [`BackendError`] and turned into a
//! user-facing message by the answerer.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use pdfchat_core::answer::{GenerationBackend, GenerationRequest};
use pdfchat_core::error::BackendError;

use crate::config::GenerationConfig;

pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    name: String,
}

impl GeminiBackend {
    /// Build from config, reading the key from the environment.
    ///
    /// # Errors
    ///
    /// [`BackendError::MissingApiKey`] when the variable is unset or blank.
    pub fn new(config: &GenerationConfig) -> Result<Self, BackendError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| BackendError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: String) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client,
            endpoint,
            api_key,
            name: format!("gemini:{}", config.model),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, BackendError> {
        let body = request_body(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let text = parse_gemini_response(&json)?;
        debug!(backend = %self.name, has_text = text.is_some(), "generation finished");
        Ok(text)
    }
}

fn request_body(request: &GenerationRequest) -> serde_json::Value {
    serde_json::json!({
        "systemInstruction": {
            "parts": [{ "text": request.system }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.user_text }]
        }],
        "generationConfig": {
            "temperature": request.temperature,
            "maxOutputTokens": request.max_output_tokens
        }
    })
}

/// Pull the reply text out of a `generateContent` response.
///
/// Text parts of the first candidate are concatenated. No candidates, or a
/// candidate without text (e.g. blocked by safety filters), is `Ok(None)`.
fn parse_gemini_response(json: &serde_json::Value) -> Result<Option<String>, BackendError> {
    if !json.is_object() {
        return Err(BackendError::Malformed(
            "expected a JSON object".to_string(),
        ));
    }

    let candidate = match json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    {
        Some(c) => c,
        None => return Ok(None),
    };

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let text: String = parts
        .into_iter()
        .flatten()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

/// Create the configured [`GenerationBackend`].
pub fn create_backend(config: &GenerationConfig) -> Result<Arc<dyn GenerationBackend>, BackendError> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiBackend::new(config)?)),
        other => Err(BackendError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_carries_system_and_sampling() {
        let body = request_body(&GenerationRequest {
            system: "SYS".into(),
            user_text: "USER".into(),
            temperature: 0.5,
            max_output_tokens: 1000,
        });
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "SYS");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "USER");
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn parses_first_candidate_text() {
        let json = json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "Hold it " }, { "text": "for 3 seconds." }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(
            parse_gemini_response(&json).unwrap(),
            Some("Hold it for 3 seconds.".to_string())
        );
    }

    #[test]
    fn no_text_is_none() {
        assert_eq!(parse_gemini_response(&json!({})).unwrap(), None);
        assert_eq!(
            parse_gemini_response(&json!({ "candidates": [] })).unwrap(),
            None
        );
        let blocked = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(parse_gemini_response(&blocked).unwrap(), None);
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(
            parse_gemini_response(&json!([1, 2])),
            Err(BackendError::Malformed(_))
        ));
    }

    #[test]
    fn missing_key_is_reported_by_variable_name() {
        let config = GenerationConfig {
            api_key_env: "PDFCHAT_TEST_UNSET_KEY_VARIABLE".to_string(),
            ..GenerationConfig::default()
        };
        let err = GeminiBackend::new(&config).err().unwrap();
        assert_eq!(
            err.to_string(),
            "PDFCHAT_TEST_UNSET_KEY_VARIABLE not found in environment variables"
        );
    }

    #[test]
    fn unknown_provider_is_its_own_error() {
        let config = GenerationConfig {
            provider: "openai".to_string(),
            ..GenerationConfig::default()
        };
        let err = create_backend(&config).err().unwrap();
        assert_eq!(err, BackendError::UnknownProvider("openai".to_string()));
        assert_eq!(err.to_string(), "unknown generation provider: openai");
    }

    #[test]
    fn endpoint_uses_model_and_trims_base_url() {
        let config = GenerationConfig {
            base_url: "http://127.0.0.1:9999/".to_string(),
            ..GenerationConfig::default()
        };
        let backend = GeminiBackend::with_api_key(&config, "k".into()).unwrap();
        assert_eq!(
            backend.endpoint(),
            "http://127.0.0.1:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(backend.name(), "gemini:gemini-2.5-flash");
    }
}
