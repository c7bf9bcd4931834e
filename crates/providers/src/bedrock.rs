//! AWS Bedrock runtime provider.
//!
//! Invokes Claude models through `POST /model/{modelId}/invoke` on
//! `bedrock-runtime.{region}.amazonaws.com`, using the Anthropic Messages
//! body with `anthropic_version = "bedrock-2023-05-31"`.

use async_trait::async_trait;
use stratadesk_core::error::ProviderError;
use stratadesk_core::provider::{ProviderRequest, ProviderResponse};
use tracing::{debug, warn};

use crate::aws::{AwsAuth, uri_encode};
use crate::messages::{MessagesBody, MessagesResponse, status_error};

pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Bedrock runtime endpoint for a region.
pub fn runtime_endpoint(region: &str) -> String {
    format!("https://bedrock-runtime.{region}.amazonaws.com")
}

/// Claude-on-Bedrock provider.
pub struct BedrockProvider {
    name: String,
    region: String,
    base_url: String,
    auth: AwsAuth,
    client: reqwest::Client,
}

impl BedrockProvider {
    /// Create a provider for `region` with the given authentication.
    pub fn new(region: impl Into<String>, auth: AwsAuth) -> Self {
        let region = region.into();
        Self {
            name: "bedrock".into(),
            base_url: runtime_endpoint(&region),
            region,
            auth,
            client: reqwest::Client::new(),
        }
    }

    /// Override the endpoint (VPC endpoints, proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a per-request timeout to the HTTP client.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/model/{percent-encoded model id}/invoke`
    fn invoke_url(&self, model: &str) -> String {
        format!("{}/model/{}/invoke", self.base_url, uri_encode(model))
    }
}

#[async_trait]
impl stratadesk_core::Provider for BedrockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = reqwest::Url::parse(&self.invoke_url(&request.model))
            .map_err(|e| ProviderError::NotConfigured(format!("invalid Bedrock endpoint: {e}")))?;

        let body = MessagesBody::from_request(&request, Some(BEDROCK_ANTHROPIC_VERSION), false);
        let payload = serde_json::to_vec(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to encode request: {e}")))?;

        debug!(
            provider = "bedrock",
            model = %request.model,
            auth = self.auth.scheme(),
            max_tokens = request.max_tokens,
            "Sending invoke request"
        );

        let builder = self
            .client
            .post(url.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        let builder = self.auth.authorize(builder, &url, &payload, &self.region);

        let response = builder.body(payload).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Bedrock invoke error");
            return Err(status_error(status, error_body, &request.model));
        }

        let api_resp: MessagesResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Bedrock response: {e}"))
        })?;

        api_resp.into_provider_response(&request.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratadesk_core::Provider;

    #[test]
    fn constructor() {
        let provider = BedrockProvider::new("ap-southeast-2", AwsAuth::Anonymous);
        assert_eq!(provider.name(), "bedrock");
        assert_eq!(
            provider.base_url(),
            "https://bedrock-runtime.ap-southeast-2.amazonaws.com"
        );
        assert_eq!(provider.region(), "ap-southeast-2");
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = BedrockProvider::new("us-east-1", AwsAuth::Bearer("tok".into()))
            .with_base_url("http://localhost:4566/");
        assert_eq!(provider.base_url(), "http://localhost:4566");
    }

    #[test]
    fn invoke_url_encodes_model_id() {
        let provider = BedrockProvider::new("ap-southeast-2", AwsAuth::Anonymous);
        assert_eq!(
            provider.invoke_url("anthropic.claude-3-haiku-20240307-v1:0"),
            "https://bedrock-runtime.ap-southeast-2.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1%3A0/invoke"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let provider = BedrockProvider::new("ap-southeast-2", AwsAuth::Anonymous)
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(std::time::Duration::from_secs(2));
        let result = provider
            .complete(ProviderRequest::new("m", "hello", 10))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::Network(_)) | Err(ProviderError::Timeout(_))
        ));
    }
}
