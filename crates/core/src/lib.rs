//! # StrataDesk Core
//!
//! Domain types, service traits, and error definitions for the StrataDesk
//! drafting assistant. This crate has **no transport dependencies**; it
//! defines the model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Each external collaborator is a trait here:
//! - [`Provider`]: the judge and generation services (any LLM backend)
//! - [`KnowledgeStore`]: the retrieval service (any passage search backend)
//!
//! Implementations live in `stratadesk-providers` and `stratadesk-knowledge`,
//! so the pipeline can be tested with scripted stubs and pointed at real
//! services purely through configuration.

pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, RetrievalError};
pub use knowledge::{KnowledgeStore, RawPassage, RetrievalQuery};
pub use message::{History, Role, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
