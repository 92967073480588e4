//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`LocalProvider`]** — runs models locally via fastembed; no network
//!   calls after the initial model download. Default provider.
//! - **[`OllamaProvider`]** — calls a local Ollama instance's `/api/embed`
//!   endpoint.
//! - **[`HashProvider`]** — deterministic bag-of-words feature hashing.
//!   Purely local, no model download; similarity tracks term overlap.
//!   Meant for tests and offline development, not answer quality.
//!
//! Use [`create_provider`] to instantiate the provider named by the
//! configuration. The same provider instance must embed both a cache's
//! chunks and every query against it; the vector store enforces this by
//! recording the model name alongside each persisted index.

#[cfg(feature = "local-embeddings")]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::EmbeddingConfig;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier recorded in persisted indexes.
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// # Supported Providers
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"local"` | [`LocalProvider`] (fastembed, needs the `local-embeddings` feature) |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"hash"` | [`HashProvider`] |
///
/// # Errors
///
/// Returns an error for unknown provider names or if the provider cannot
/// be initialized (missing config or feature flag).
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Box::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        "hash" => Ok(Box::new(HashProvider::new(config))),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

// ============ Local Provider (fastembed) ============

/// Embedding provider for local inference via fastembed.
///
/// The model is downloaded on first use from Hugging Face and cached;
/// after that, embedding runs entirely offline. The loaded model is kept
/// for the lifetime of the provider, so a build followed by queries pays
/// the initialization cost once.
#[cfg(feature = "local-embeddings")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        // Fail on unknown model names at construction, not first embed.
        config_to_fastembed_model(&config.model)?;
        let dims = config.dims.unwrap_or(default_local_dims(&config.model));

        Ok(Self {
            model_name: config.model.clone(),
            dims,
            batch_size: config.batch_size,
            model: Arc::new(Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model_name = self.model_name.clone();
        let batch_size = self.batch_size;
        let cell = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = cell
                .lock()
                .map_err(|_| anyhow::anyhow!("embedding model lock poisoned"))?;

            if guard.is_none() {
                let fastembed_model = config_to_fastembed_model(&model_name)?;
                let model = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
                )
                .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))?;
                *guard = Some(model);
            }

            let model = guard
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("embedding model not initialized"))?;

            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
        })
        .await?
    }
}

#[cfg(feature = "local-embeddings")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings")]
fn default_local_dims(model: &str) -> usize {
    match model {
        "all-minilm-l6-v2" => 384,
        "bge-small-en-v1.5" => 384,
        "bge-base-en-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        _ => 384,
    }
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL. Requires Ollama to be
/// running with an embedding model pulled (e.g. `ollama pull
/// nomic-embed-text`) and `embedding.dims` set to that model's
/// dimensionality.
#[derive(Debug)]
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;

        Ok(Self {
            model: config.model.clone(),
            dims,
            url: config.url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let url = format!("{}/api/embed", self.url);

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Ollama embedding request failed (is Ollama running at {}?)", url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama embedding API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("Invalid Ollama embedding response")?;
        parse_embed_response(&json)
    }
}

fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

// ============ Hash Provider ============

/// Deterministic bag-of-words embedder.
///
/// Lowercases and tokenizes on non-alphanumeric boundaries, hashes each
/// token into one of `dims` buckets, and L2-normalizes the bucket counts.
/// Stable across runs and platforms, so cached indexes remain valid, and
/// texts sharing terms score higher under cosine similarity than texts
/// sharing none. All-whitespace text embeds to the zero vector.
pub struct HashProvider {
    dims: usize,
}

impl HashProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            dims: config.dims.unwrap_or(384),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_embed(t, self.dims)).collect())
    }
}

fn hash_embed(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims];

    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let digest = Sha256::digest(token.to_lowercase().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(prefix) % dims as u64) as usize;
        vector[bucket] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }

    vector
}
