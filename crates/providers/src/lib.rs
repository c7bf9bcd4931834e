//! LLM provider implementations for StrataDesk.
//!
//! All providers implement the `stratadesk_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod anthropic;
pub mod aws;
pub mod bedrock;
mod messages;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use aws::{AwsAuth, AwsCredentials};
pub use bedrock::BedrockProvider;
pub use router::ProviderRouter;
