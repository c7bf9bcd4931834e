//! Knowledge store implementations for StrataDesk.
//!
//! All stores implement `stratadesk_core::KnowledgeStore`. The backend is
//! chosen by `retrieval.backend`; every configured source queries the same
//! backend with its own store id.

pub mod bedrock_kb;
pub mod file_backend;
pub mod in_memory;

pub use bedrock_kb::BedrockKnowledgeBase;
pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;

use std::sync::Arc;
use std::time::Duration;

use stratadesk_config::AppConfig;
use stratadesk_core::error::RetrievalError;
use stratadesk_core::knowledge::KnowledgeStore;
use stratadesk_providers::AwsAuth;

/// Build the knowledge store selected by `retrieval.backend`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn KnowledgeStore>, RetrievalError> {
    match config.retrieval.backend.as_str() {
        "bedrock" => {
            let mut kb = BedrockKnowledgeBase::new(
                &config.region,
                AwsAuth::resolve(config.api_key_for("bedrock")),
            )
            .with_timeout(Duration::from_secs(config.request_timeout_secs));
            if let Some(endpoint) = &config.retrieval.endpoint {
                kb = kb.with_base_url(endpoint);
            }
            Ok(Arc::new(kb))
        }
        "file" => {
            let path = config
                .retrieval
                .knowledge_file
                .clone()
                .unwrap_or_else(AppConfig::default_knowledge_file);
            Ok(Arc::new(FileStore::new(path)))
        }
        other => Err(RetrievalError::NotConfigured(format!(
            "unknown retrieval backend '{other}' (expected bedrock or file)"
        ))),
    }
}
