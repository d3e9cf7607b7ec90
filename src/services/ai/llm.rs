use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::types::{GenerationResponse, InvokeRequest};
use crate::error::{AppError, AppResult, ResultExt};
use crate::services::GenerationConfig;

/// Client for Bedrock's Anthropic `InvokeModel` endpoint, authenticated with
/// a Bedrock API key
pub struct LlmService {
    client: Client,
    config: GenerationConfig,
}

impl LlmService {
    pub fn new(config: GenerationConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .config_err("build HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn invoke_url(&self) -> String {
        format!(
            "{}/model/{}/invoke",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model_id
        )
    }

    pub async fn generate(&self, prompt: &str) -> AppResult<GenerationResponse> {
        let api_key = self.config.api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::Generation("missing Bedrock API key".to_string()));
        }

        let request = InvokeRequest::user_prompt(prompt, self.config.max_tokens, self.config.temperature);
        let response = self
            .client
            .post(self.invoke_url())
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&request)
            .send()
            .await
            .generation_err("bedrock request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "bedrock request failed: {status} {body}"
            )));
        }

        let payload: Value = response.json().await.generation_err("bedrock response invalid")?;
        let parsed = GenerationResponse::from_value(payload);
        if !parsed.is_recognized() {
            tracing::warn!(model = %self.config.model_id, "Unrecognized generation response shape");
        }
        Ok(parsed)
    }
}
