//! TOML configuration loading and validation.
//!
//! All keys are optional; defaults reproduce the engine's standard tuning
//! (500/50 chunking, top-2 retrieval with a single context chunk, local
//! MiniLM embeddings, a local Ollama generation backend). See
//! `docqa.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of one page.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Number of retrieved chunks whose text feeds the prompt.
    ///
    /// Sources always report all `top_k` retrieved chunks; this only
    /// bounds the generation context. The historical behavior is 1.
    #[serde(default = "default_context_chunk_count")]
    pub context_chunk_count: usize,
    /// Maximum context characters handed to the prompt builder.
    #[serde(default = "default_context_budget")]
    pub context_budget: usize,
    /// Maximum characters of the rendered prompt sent to the backend.
    #[serde(default = "default_request_budget")]
    pub request_budget: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            context_chunk_count: default_context_chunk_count(),
            context_budget: default_context_budget(),
            request_budget: default_request_budget(),
        }
    }
}

fn default_top_k() -> usize {
    2
}
fn default_context_chunk_count() -> usize {
    1
}
fn default_context_budget() -> usize {
    1000
}
fn default_request_budget() -> usize {
    1500
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// One of `"local"`, `"ollama"`, `"hash"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector dimensionality. Resolved from the model name for the local
    /// provider when unset; required for `"ollama"`.
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL of the Ollama instance (`"ollama"` provider only).
    #[serde(default = "default_embedding_url")]
    pub url: String,
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: None,
            url: default_embedding_url(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_embedding_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_embedding_batch_size() -> usize {
    64
}
fn default_embedding_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Full URL of the generation endpoint.
    #[serde(default = "default_generation_url")]
    pub url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Output token cap passed to the backend.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}
fn default_generation_model() -> String {
    "mistral".to_string()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_max_output_tokens() -> u32 {
    200
}
fn default_generation_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one persisted index per fingerprint.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// JSON file holding the question/answer history.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            history_path: default_history_path(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/vector_cache")
}
fn default_history_path() -> PathBuf {
    PathBuf::from("data/chat_history.json")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.chunk_overlap ({}) must be < chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.context_chunk_count < 1 {
        anyhow::bail!("retrieval.context_chunk_count must be >= 1");
    }
    if config.retrieval.context_budget == 0 {
        anyhow::bail!("retrieval.context_budget must be > 0");
    }
    if config.retrieval.request_budget == 0 {
        anyhow::bail!("retrieval.request_budget must be > 0");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "local" | "ollama" | "hash" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, ollama, or hash.",
            other
        ),
    }
    if config.embedding.model.is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0 when set");
    }
    if config.embedding.provider == "ollama" && config.embedding.dims.is_none() {
        anyhow::bail!("embedding.dims is required when embedding.provider is 'ollama'");
    }

    // Validate generation
    if config.generation.url.is_empty() {
        anyhow::bail!("generation.url must not be empty");
    }
    if config.generation.model.is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }

    Ok(())
}
