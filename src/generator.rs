//! # Text Generation Backend Module
//!
//! ## Purpose
//! The opaque generation capability consumed by the orchestrator, plus the
//! production HTTP implementation. Latency and availability of the backend
//! are outside this crate's control; all this module does is classify
//! failures so the orchestrator can decide what is retryable.
//!
//! ## Input/Output Specification
//! - **Input**: Prompt and system prompt strings
//! - **Output**: Generated text, or a transient/permanent error class
//! - **Mapping**: 429/503/504 and network failures are transient; 4xx
//!   request, auth and policy rejections are permanent
//!
//! ## Key Features
//! - Trait seam so tests and alternative backends plug in
//! - Retry-After header propagation for rate-limit responses

use crate::config::GeneratorConfig;
use crate::errors::{AssistError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque text generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt under a system prompt
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// HTTP-backed generator for the production generation gateway
pub struct HttpTextGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl HttpTextGenerator {
    /// Build a generator with a pooled client and the configured timeout
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AssistError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    fn classify_status(status: StatusCode, body: String, retry_after: Option<u64>) -> AssistError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => AssistError::RateLimited {
                retry_after_seconds: retry_after,
            },
            StatusCode::SERVICE_UNAVAILABLE => AssistError::ServiceUnavailable { details: body },
            StatusCode::GATEWAY_TIMEOUT => AssistError::GatewayTimeout { details: body },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AssistError::AuthenticationFailed {
                reason: format!("{}: {}", status, body),
            },
            StatusCode::UNPROCESSABLE_ENTITY => AssistError::ContentRejected { details: body },
            s if s.is_server_error() => AssistError::ServiceUnavailable {
                details: format!("{}: {}", s, body),
            },
            s => AssistError::BadRequest {
                details: format!("{}: {}", s, body),
            },
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.model,
            system: system_prompt,
            prompt,
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = response.text().await.unwrap_or_default();
            let err = Self::classify_status(status, body, retry_after);
            tracing::warn!(
                "Generation request failed with {} (transient: {})",
                status,
                err.is_transient()
            );
            return Err(err);
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| AssistError::Serialization {
                    message: format!("Invalid generation response: {}", e),
                })?;
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator_for(server: &MockServer) -> HttpTextGenerator {
        HttpTextGenerator::new(GeneratorConfig {
            endpoint: format!("{}/v1/generate", server.uri()),
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            request_timeout_seconds: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_generation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "Betriebsanweisung ..."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let result = generator.generate("prompt", "system").await.unwrap();
        assert_eq!(result, "Betriebsanweisung ...");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate("prompt", "system").await.unwrap_err();
        assert!(err.is_transient());
        match err {
            AssistError::RateLimited {
                retry_after_seconds,
            } => assert_eq!(retry_after_seconds, Some(7)),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_request_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("missing prompt"))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate("prompt", "system").await.unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, AssistError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_gateway_timeout_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(504))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate("prompt", "system").await.unwrap_err();
        assert!(matches!(err, AssistError::GatewayTimeout { .. }));
    }
}
