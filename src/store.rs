//! Persisted vector index store.
//!
//! One index per content fingerprint, stored as a directory
//! `<cache_dir>/<fingerprint>/` holding:
//! - `vectors.bin` — all embedding rows as contiguous little-endian f32
//! - `meta.json` — model name, dimensionality, and the chunk payloads
//!
//! Every file is written to a per-process temp name and renamed into
//! place, and `meta.json` is written last: an entry without it does not
//! exist yet. Concurrent builds of one fingerprint therefore race
//! benignly (embedding is deterministic, last writer wins). Entries are
//! never evicted; a changed file set simply gets a new fingerprint.
//!
//! Retrieval is brute-force cosine similarity over all rows, which is
//! exact and fast enough at the chunk counts a PDF set produces.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::EmbeddingProvider;
use crate::models::Chunk;

const META_FILE: &str = "meta.json";
const VECTORS_FILE: &str = "vectors.bin";

/// Vector index failure. Cache I/O failures abort the query; there is no
/// silent fallback to an in-memory index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode index metadata: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("corrupt index entry {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("index was built with embedding model '{found}' but the configured model is '{expected}'; delete the cache entry to rebuild")]
    ModelMismatch { expected: String, found: String },
    #[error("embedding dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// An embedded chunk set. `vectors[i]` embeds `chunks[i]`.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    pub model: String,
    pub dims: usize,
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct IndexMeta {
    model: String,
    dims: usize,
    chunks: Vec<Chunk>,
}

/// Fingerprint-keyed store of persisted vector indexes.
///
/// Owns the cache directory and the embedding provider; the provider that
/// builds an index is the one that must embed queries against it.
pub struct VectorStore {
    cache_dir: PathBuf,
    provider: Box<dyn EmbeddingProvider>,
}

impl VectorStore {
    pub fn new(cache_dir: PathBuf, provider: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            cache_dir,
            provider,
        }
    }

    /// Return the cached index for `fingerprint`, or embed `chunks`,
    /// persist the result, and return it.
    ///
    /// A cache hit never re-embeds. Building with zero chunks yields a
    /// valid empty index.
    pub async fn get_or_build(
        &self,
        chunks: Vec<Chunk>,
        fingerprint: &str,
    ) -> Result<VectorIndex, IndexError> {
        let dir = self.cache_dir.join(fingerprint);

        if dir.join(META_FILE).is_file() {
            log::debug!("vector cache hit for {}", fingerprint);
            return self.load(&dir);
        }

        log::debug!(
            "vector cache miss for {}, embedding {} chunk(s)",
            fingerprint,
            chunks.len()
        );
        let index = self.build(chunks).await?;
        self.persist(&index, &dir)?;
        Ok(index)
    }

    /// Return the `k` chunks most similar to `text`, best first.
    ///
    /// Scores are cosine similarities; equal scores keep chunk insertion
    /// order (the sort is stable). Querying an empty index returns an
    /// empty list without calling the embedding provider.
    pub async fn query(
        &self,
        index: &VectorIndex,
        text: &str,
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>, IndexError> {
        if index.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if index.model != self.provider.model_name() {
            return Err(IndexError::ModelMismatch {
                expected: self.provider.model_name().to_string(),
                found: index.model.clone(),
            });
        }

        let embedded = self
            .provider
            .embed(&[text.to_string()])
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?;
        let query_vec = embedded
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::Embedding("empty embedding response".to_string()))?;
        if query_vec.len() != index.dims {
            return Err(IndexError::DimensionMismatch {
                expected: index.dims,
                found: query_vec.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = index
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(&query_vec, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| (index.chunks[i].clone(), score))
            .collect())
    }

    async fn build(&self, chunks: Vec<Chunk>) -> Result<VectorIndex, IndexError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.provider
                .embed(&texts)
                .await
                .map_err(|e| IndexError::Embedding(e.to_string()))?
        };

        if vectors.len() != chunks.len() {
            return Err(IndexError::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != self.provider.dims() {
                return Err(IndexError::DimensionMismatch {
                    expected: self.provider.dims(),
                    found: vector.len(),
                });
            }
        }

        Ok(VectorIndex {
            model: self.provider.model_name().to_string(),
            dims: self.provider.dims(),
            chunks,
            vectors,
        })
    }

    fn load(&self, dir: &Path) -> Result<VectorIndex, IndexError> {
        let meta_path = dir.join(META_FILE);
        let meta_bytes = fs::read(&meta_path)?;
        let meta: IndexMeta =
            serde_json::from_slice(&meta_bytes).map_err(|e| IndexError::Corrupt {
                path: meta_path.clone(),
                message: e.to_string(),
            })?;

        if meta.model != self.provider.model_name() {
            return Err(IndexError::ModelMismatch {
                expected: self.provider.model_name().to_string(),
                found: meta.model,
            });
        }
        if meta.dims == 0 && !meta.chunks.is_empty() {
            return Err(IndexError::Corrupt {
                path: meta_path,
                message: "zero dimensions with non-empty chunk list".to_string(),
            });
        }

        let vectors_path = dir.join(VECTORS_FILE);
        let blob = fs::read(&vectors_path)?;
        let flat = blob_to_vec(&blob);

        let expected = meta.dims * meta.chunks.len();
        if flat.len() != expected {
            return Err(IndexError::Corrupt {
                path: vectors_path,
                message: format!(
                    "expected {} values ({} chunks × {} dims), found {}",
                    expected,
                    meta.chunks.len(),
                    meta.dims,
                    flat.len()
                ),
            });
        }

        let vectors: Vec<Vec<f32>> = if meta.chunks.is_empty() {
            Vec::new()
        } else {
            flat.chunks_exact(meta.dims).map(|row| row.to_vec()).collect()
        };

        Ok(VectorIndex {
            model: meta.model,
            dims: meta.dims,
            chunks: meta.chunks,
            vectors,
        })
    }

    fn persist(&self, index: &VectorIndex, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir)?;

        let mut blob = Vec::with_capacity(index.vectors.len() * index.dims * 4);
        for row in &index.vectors {
            blob.extend_from_slice(&vec_to_blob(row));
        }
        write_atomic(dir, VECTORS_FILE, &blob)?;

        let meta = IndexMeta {
            model: index.model.clone(),
            dims: index.dims,
            chunks: index.chunks.clone(),
        };
        let json = serde_json::to_vec_pretty(&meta)?;
        // meta.json last: its presence is what commits the entry.
        write_atomic(dir, META_FILE, &json)?;

        log::info!(
            "persisted vector index at {} ({} chunks, {} dims)",
            dir.display(),
            index.chunks.len(),
            index.dims
        );
        Ok(())
    }
}

/// Write `bytes` to `<dir>/<name>` via a per-process temp file and rename,
/// so readers only ever observe whole files.
fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = dir.join(format!("{}.tmp.{}", name, std::process::id()));
    fs::write(&tmp, bytes)?;
    fs::rename(tmp, dir.join(name))?;
    Ok(())
}

/// Encode a float vector as little-endian f32 bytes.
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing
/// `vec.len() × 4` bytes.
///
/// # Example
///
/// ```rust
/// use docqa::store::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a float vector.
///
/// Reverses [`vec_to_blob`]. Trailing bytes that do not fill a whole f32
/// are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
