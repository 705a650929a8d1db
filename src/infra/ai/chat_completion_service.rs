use crate::config::LlmConfig;
use crate::domain::ports::LlmService;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{error, info, warn, instrument};
use std::time::Duration;
use tokio::time::sleep;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const MAX_OUTPUT_TOKENS: u32 = 400;

/// Client for an OpenAI-compatible chat completions deployment.
pub struct ChatCompletionService {
    client: Client,
    url: String,
    api_key: String,
}

impl ChatCompletionService {
    pub fn new(config: &LlmConfig) -> Self {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.deployment,
            config.api_version
        );
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            url,
            api_key: config.api_key.clone(),
        }
    }

    async fn send_request_with_retry(&self, payload: &Value) -> Result<String, AppError> {
        let mut retries = 0;
        let mut backoff = INITIAL_BACKOFF_MS;

        loop {
            let res = self.client.post(&self.url)
                .header("api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(payload)
                .send()
                .await;

            match res {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body: Value = response.json().await.map_err(|e| {
                            error!("Failed to parse completion response JSON: {:?}", e);
                            AppError::Dependency("Model response was not JSON".to_string())
                        })?;
                        return extract_content(body);
                    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        if retries >= MAX_RETRIES {
                            error!("Model endpoint failed after {} retries. Status: {}", retries, status);
                            let text = response.text().await.unwrap_or_default();
                            return Err(AppError::Dependency(format!("Model provider error: {} - {}", status, text)));
                        }
                        warn!("Model endpoint transient error {}. Retrying in {}ms...", status, backoff);
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        error!("Model endpoint terminal error {}: {}", status, text);
                        return Err(AppError::Dependency(format!("Model request rejected: {} - {}", status, text)));
                    }
                },
                Err(e) => {
                    if retries >= MAX_RETRIES {
                        error!("Model network error after {} retries: {:?}", retries, e);
                        return Err(AppError::Dependency(format!("Model network error: {}", e)));
                    }
                    warn!("Model network error. Retrying in {}ms... {:?}", backoff, e);
                }
            }

            sleep(Duration::from_millis(backoff)).await;
            retries += 1;
            backoff *= 2;
        }
    }
}

fn extract_content(body: Value) -> Result<String, AppError> {
    if let Some(choices) = body.get("choices").and_then(|c| c.as_array())
        && let Some(first) = choices.first()
    {
        if let Some(finish_reason) = first.get("finish_reason").and_then(|s| s.as_str())
            && finish_reason == "content_filter"
        {
            warn!("Completion blocked by content filter");
            return Err(AppError::Dependency("Model output blocked by content filter".to_string()));
        }

        if let Some(text) = first
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
        {
            let cleaned = text
                .trim()
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim();
            return Ok(cleaned.to_string());
        }
    }

    error!("Unexpected completion response structure: {:?}", body);
    Err(AppError::Dependency("Model response missing content".to_string()))
}

#[async_trait]
impl LlmService for ChatCompletionService {
    #[instrument(skip(self, prompt, system_instruction), fields(prompt_len = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String, AppError> {
        let payload = json!({
            "messages": [
                {"role": "system", "content": system_instruction},
                {"role": "user", "content": prompt}
            ],
            "temperature": temperature,
            "max_tokens": MAX_OUTPUT_TOKENS
        });

        info!("Sending completion request");
        let result = self.send_request_with_retry(&payload).await?;
        info!("Completion received");
        Ok(result)
    }
}
