use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info};

use crate::config::CurioConfig;
use crate::errors::{CurioError, CurioResult};
use crate::types::ChatCompletionRequest;

/// Raw response body of a streaming completion, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = CurioResult<Bytes>> + Send>>;

/// Anything that can carry a streaming chat-completion request
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends `request` and returns the response body once the status is known to be 2xx
    async fn stream_chat(&self, api_key: &str, request: &ChatCompletionRequest)
        -> CurioResult<ByteStream>;
}

/// Client for the Perplexity chat-completions API
#[derive(Debug, Clone)]
pub struct PerplexityClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl PerplexityClient {
    /// Create a new client using the endpoint and timeout from `config`
    pub fn new(config: &CurioConfig) -> CurioResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Get the chat-completions endpoint URL
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_headers(&self, api_key: &str) -> CurioResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = format!("Bearer {}", api_key);
        let header_value = HeaderValue::from_str(&auth_value)
            .map_err(|e| CurioError::ConfigError(format!("Invalid API key format: {}", e)))?;
        headers.insert(AUTHORIZATION, header_value);

        Ok(headers)
    }

    fn transport_error(&self, e: reqwest::Error) -> CurioError {
        if e.is_timeout() {
            CurioError::Timeout(self.timeout_secs)
        } else {
            CurioError::RequestError(format!("Failed to send request: {}", e))
        }
    }
}

#[async_trait]
impl ChatBackend for PerplexityClient {
    async fn stream_chat(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> CurioResult<ByteStream> {
        let url = self.completions_url();
        let headers = self.build_headers(api_key)?;

        info!(
            model = %request.model,
            messages = request.messages.len(),
            "Streaming response and collecting metadata"
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response body: {}", e));

            return Err(CurioError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }
        debug!(status = status.as_u16(), "Response stream opened");

        let timeout_secs = self.timeout_secs;
        let body = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| {
                if e.is_timeout() {
                    CurioError::Timeout(timeout_secs)
                } else {
                    CurioError::StreamError(format!("Failed to read response stream: {}", e))
                }
            })
        });

        Ok(Box::pin(body))
    }
}
