use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{Result, WellnessError};
use crate::models::{GeminiRequest, GeminiResponse};

/// Longest upstream error body kept in `WellnessError::Upstream`.
const MAX_ERROR_BODY: usize = 512;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(&self, req: &GeminiRequest) -> Result<GeminiResponse>;
}

/// Single-shot HTTP transport for a `generateContent` endpoint. No retries:
/// a failed call is handled by the caller's fallback.
pub struct GeminiTransport {
    client: Client,
    api_url: String,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate(&self, req: &GeminiRequest) -> Result<GeminiResponse> {
        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(WellnessError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = response.json().await?;
        tracing::debug!(
            "Generation endpoint returned {} candidate(s)",
            parsed.candidates.len()
        );
        Ok(parsed)
    }
}
