//! Anthropic Messages wire format, shared by the Bedrock and direct providers.
//!
//! Bedrock's `invoke` endpoint for Claude models accepts the same body as
//! Anthropic's `/v1/messages`, except that the model travels in the URL and
//! the body carries `anthropic_version` instead of a header.

use serde::{Deserialize, Serialize};
use stratadesk_core::error::ProviderError;
use stratadesk_core::provider::{ProviderRequest, ProviderResponse, Usage};

#[derive(Debug, Serialize)]
pub(crate) struct MessagesBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "no_stops")]
    pub stop_sequences: &'a [String],
    pub messages: Vec<ApiMessage<'a>>,
}

impl<'a> MessagesBody<'a> {
    /// One user turn carrying the whole prompt as a text block.
    pub fn from_request(
        request: &'a ProviderRequest,
        anthropic_version: Option<&'a str>,
        include_model: bool,
    ) -> Self {
        Self {
            anthropic_version,
            model: include_model.then_some(request.model.as_str()),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stop_sequences: &request.stop,
            messages: vec![ApiMessage {
                role: "user",
                content: vec![ContentBlock::Text {
                    text: &request.prompt,
                }],
            }],
        }
    }
}

fn no_stops(stops: &&[String]) -> bool {
    stops.is_empty()
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiMessage<'a> {
    pub role: &'static str,
    pub content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(crate) enum ContentBlock<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub usage: Option<ApiUsage>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    /// Concatenate text blocks into a provider response.
    pub fn into_provider_response(
        self,
        requested_model: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let text: String = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() && self.stop_reason.as_deref() != Some("max_tokens") {
            return Err(ProviderError::InvalidResponse(
                "response contained no text content".into(),
            ));
        }

        let usage = self.usage.map(|u| Usage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        Ok(ProviderResponse {
            text,
            usage,
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            stop_reason: self.stop_reason,
        })
    }
}

/// Map a non-success HTTP status to a provider error.
pub(crate) fn status_error(status: u16, body: String, model: &str) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed(if body.is_empty() {
            "credentials rejected".into()
        } else {
            body
        }),
        404 => ProviderError::ModelNotFound(model.to_string()),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}
