//! Configuration loading, validation, and management for StrataDesk.
//!
//! Loads configuration from `~/.stratadesk/config.toml` with environment
//! variable overrides. Validates all settings at startup, then each pipeline
//! component receives the values it needs at construction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.stratadesk/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM backend used for both judge and generation ("bedrock" or "anthropic")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// AWS region for Bedrock runtime and knowledge base endpoints
    #[serde(default = "default_region")]
    pub region: String,

    /// Global API key, used by any provider without its own `providers.<name>.api_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// HTTP request timeout for every outbound call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Draft generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Retrieval-necessity judge settings
    #[serde(default)]
    pub judge: JudgeConfig,

    /// Knowledge retrieval and context budget settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Prompt assembly settings
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Provider-specific overrides
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "bedrock".into()
}
fn default_region() -> String {
    "ap-southeast-2".into()
}
fn default_request_timeout() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("api_key", &redact(&self.api_key))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("generation", &self.generation)
            .field("judge", &self.judge)
            .field("retrieval", &self.retrieval)
            .field("prompt", &self.prompt)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Sampling controls for the draft generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_generation_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_generation_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p", skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

fn default_generation_model() -> String {
    "anthropic.claude-3-sonnet-20240229-v1:0".into()
}
fn default_generation_max_tokens() -> u32 {
    1000
}
fn default_generation_temperature() -> f32 {
    0.2
}
fn default_top_p() -> Option<f32> {
    Some(0.9)
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            max_tokens: default_generation_max_tokens(),
            temperature: default_generation_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// The retrieval-necessity judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// When false, retrieval runs on every query
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_judge_model")]
    pub model: String,

    #[serde(default = "default_judge_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,
}

fn default_judge_model() -> String {
    "anthropic.claude-3-haiku-20240307-v1:0".into()
}
fn default_judge_max_tokens() -> u32 {
    10
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_judge_model(),
            max_tokens: default_judge_max_tokens(),
            temperature: 0.0,
        }
    }
}

/// Knowledge retrieval and context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Store backend: "bedrock" (knowledge bases) or "file" (local JSONL)
    #[serde(default = "default_retrieval_backend")]
    pub backend: String,

    /// Endpoint override for the knowledge base API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// JSONL passage file for the "file" backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_file: Option<PathBuf>,

    /// Heuristic ceiling on combined passage size, in counter units
    #[serde(default = "default_context_token_limit")]
    pub context_token_limit: usize,

    /// Token counter: "whitespace" or "chars"
    #[serde(default = "default_token_counter")]
    pub token_counter: String,

    /// Score normalisation before ranking: "none" or "min_max"
    #[serde(default = "default_score_normalization")]
    pub score_normalization: String,

    /// Query all sources concurrently
    #[serde(default = "default_true")]
    pub concurrent: bool,

    /// Knowledge sources, queried in this order
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

fn default_retrieval_backend() -> String {
    "bedrock".into()
}
fn default_context_token_limit() -> usize {
    2000
}
fn default_token_counter() -> String {
    "whitespace".into()
}
fn default_score_normalization() -> String {
    "none".into()
}
fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            label: "Building_A".into(),
            store_id: "YOUR_BUILDING_A_KB_ID".into(),
            top_k: 2,
        },
        SourceConfig {
            label: "Global".into(),
            store_id: String::new(),
            top_k: 1,
        },
    ]
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_retrieval_backend(),
            endpoint: None,
            knowledge_file: None,
            context_token_limit: default_context_token_limit(),
            token_counter: default_token_counter(),
            score_normalization: default_score_normalization(),
            concurrent: true,
            sources: default_sources(),
        }
    }
}

/// One knowledge source in the fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Provenance label, used in chunk tags ("<label>_Chunk_<i>")
    pub label: String,

    /// Backend store identifier; empty means "not provisioned yet"
    #[serde(default)]
    pub store_id: String,

    /// Number of passages to request
    pub top_k: usize,
}

/// Prompt assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// How many recent turns are shown to the judge and the generator
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Replace the built-in drafting policy entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_override: Option<String>,
}

fn default_history_turns() -> usize {
    6
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
            policy_override: None,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Vendor-specific key variables and the provider each one belongs to.
const VENDOR_KEY_VARS: [(&str, &str); 2] = [
    ("bedrock", "AWS_BEARER_TOKEN_BEDROCK"),
    ("anthropic", "ANTHROPIC_API_KEY"),
];

impl AppConfig {
    /// Load configuration from the default path (~/.stratadesk/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment variable overrides:
    /// - `STRATADESK_API_KEY` (global key)
    /// - `AWS_BEARER_TOKEN_BEDROCK` (bedrock only), `ANTHROPIC_API_KEY` (anthropic only)
    /// - `STRATADESK_PROVIDER`
    /// - `STRATADESK_REGION`, then `AWS_REGION`
    /// - `STRATADESK_MODEL`, `STRATADESK_JUDGE_MODEL`
    /// - `STRATADESK_CONTEXT_TOKENS`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("STRATADESK_API_KEY");
        }

        // Vendor keys only ever reach their own provider.
        for (provider, var) in VENDOR_KEY_VARS {
            if let Some(key) = lookup(var) {
                let entry = self.providers.entry(provider.to_string()).or_default();
                if entry.api_key.is_none() {
                    entry.api_key = Some(key);
                }
            }
        }

        if let Some(provider) = lookup("STRATADESK_PROVIDER") {
            self.provider = provider;
        }

        if let Some(region) = lookup("STRATADESK_REGION").or_else(|| lookup("AWS_REGION")) {
            self.region = region;
        }

        if let Some(model) = lookup("STRATADESK_MODEL") {
            self.generation.model = model;
        }

        if let Some(model) = lookup("STRATADESK_JUDGE_MODEL") {
            self.judge.model = model;
        }

        if let Some(limit) = lookup("STRATADESK_CONTEXT_TOKENS") {
            self.retrieval.context_token_limit = limit.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "STRATADESK_CONTEXT_TOKENS must be a positive integer, got '{limit}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stratadesk")
    }

    /// Default location of the local passage file.
    pub fn default_knowledge_file() -> PathBuf {
        Self::config_dir().join("knowledge.jsonl")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, temperature) in [
            ("generation.temperature", self.generation.temperature),
            ("judge.temperature", self.judge.temperature),
        ] {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }

        if let Some(top_p) = self.generation.top_p {
            if top_p <= 0.0 || top_p > 1.0 {
                return Err(ConfigError::ValidationError(
                    "generation.top_p must be in (0.0, 1.0]".into(),
                ));
            }
        }

        if self.generation.max_tokens == 0 || self.judge.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than 0".into(),
            ));
        }

        if self.retrieval.context_token_limit == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.context_token_limit must be greater than 0".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for source in &self.retrieval.sources {
            if source.top_k == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "source '{}' must request at least one passage",
                    source.label
                )));
            }
            if !seen.insert(source.label.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate source label '{}'",
                    source.label
                )));
            }
        }

        Ok(())
    }

    /// The API key for a provider: per-provider override first, then the global key.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        Self::default().to_toml()
    }

    /// Serialise this configuration (for the `onboard` command).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            region: default_region(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
            generation: GenerationConfig::default(),
            judge: JudgeConfig::default(),
            retrieval: RetrievalConfig::default(),
            prompt: PromptConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
