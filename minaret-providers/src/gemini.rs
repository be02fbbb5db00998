//! Gemini HTTP client implementation

use async_trait::async_trait;
use minaret_core::session::ChatTurn;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{ChatModel, ProviderError, ProviderResult};

/// Gemini generateContent request format
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

/// Gemini generateContent response format
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UsageMetadata {
    #[serde(default, rename = "promptTokenCount")]
    prompt_token_count: i64,
    #[serde(default, rename = "candidatesTokenCount")]
    candidates_token_count: i64,
    #[serde(default, rename = "totalTokenCount")]
    total_token_count: i64,
}

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_output_tokens,
        }
    }

    fn build_request(&self, turns: &[ChatTurn]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: turns
                .iter()
                .map(|turn| Content {
                    role: turn.role.clone(),
                    parts: vec![Part {
                        text: turn.content.clone(),
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    /// Extract the reply text from the first candidate
    fn parse_response(response: GenerateContentResponse) -> ProviderResult<String> {
        if let Some(usage) = &response.usage_metadata {
            debug!(
                "Token usage: prompt={} candidates={} total={}",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("No candidates in response".to_string())
        })?;

        if let Some(reason) = &candidate.finish_reason {
            debug!("Finish reason: {}", reason);
        }

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Candidate carried no text".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(&self, turns: &[ChatTurn]) -> ProviderResult<String> {
        let request = self.build_request(turns);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        debug!(
            "Sending generate request to model {} ({} turns)",
            self.model,
            turns.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError { status, message });
        }

        let response_data: GenerateContentResponse = response.json().await?;
        Self::parse_response(response_data)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> GeminiClient {
        GeminiClient::new("test-key", server.url(), "gemini-2.5-flash", 0.7, 2048)
    }

    fn turns() -> Vec<ChatTurn> {
        vec![
            ChatTurn::user("persona"),
            ChatTurn::model("ack"),
            ChatTurn::user("What are the pillars of prayer?"),
        ]
    }

    #[test]
    fn test_build_request_maps_turns_to_contents() {
        let client = GeminiClient::new("k", "https://example.test", "gemini-2.5-flash", 0.5, 512);
        let request = client.build_request(&turns());

        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].role, "user");
        assert_eq!(request.contents[1].role, "model");
        assert_eq!(request.contents[2].parts[0].text, "What are the pillars of prayer?");
        assert_eq!(request.generation_config.max_output_tokens, 512);
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.5-flash:generateContent",
            )
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                  "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "The pillars are..."}]},
                    "finishReason": "STOP"
                  }],
                  "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
                }"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let reply = client.generate(&turns()).await.unwrap();

        assert_eq!(reply, "The pillars are...");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_maps_http_failure_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.5-flash:generateContent",
            )
            .with_status(503)
            .with_body("model overloaded")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.generate(&turns()).await.unwrap_err();

        match err {
            ProviderError::ApiError { status, message } => {
                assert_eq!(status, 503);
                assert!(message.contains("overloaded"));
                assert!(ProviderError::ApiError { status, message }.is_transient());
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_candidates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.5-flash:generateContent",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.generate(&turns()).await.unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
        assert!(!err.is_transient());
    }
}
