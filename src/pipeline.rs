//! Retrieval-augmented answer pipeline.
//!
//! [`RagPipeline::answer`] runs the whole flow for one question: load the
//! PDFs, chunk them, fetch or build the vector index keyed by the files'
//! fingerprint, retrieve the most similar chunks, render the prompt, and
//! hand it to the generation backend. Retrieval and prompt assembly stay
//! local; only the final prompt leaves the process.

use std::path::PathBuf;

use anyhow::Result;

use crate::chunk::chunk_pages;
use crate::config::Config;
use crate::embedding::create_provider;
use crate::fingerprint::fingerprint_files;
use crate::generate::{Generator, OllamaGenerator};
use crate::loader::load_pdfs;
use crate::models::{RagAnswer, SourceRef};
use crate::prompt::{build_prompt, truncate_chars, AnswerStyle};
use crate::store::VectorStore;

/// Answer text when retrieval finds nothing to ground an answer on.
pub const NO_DOCUMENTS_MESSAGE: &str = "No relevant documents found in the uploaded PDFs.";

pub struct RagPipeline {
    config: Config,
    store: VectorStore,
    generator: Box<dyn Generator>,
}

impl RagPipeline {
    /// Wire up a pipeline from configuration: embedding provider, vector
    /// store, and generation backend.
    pub fn new(config: Config) -> Result<Self> {
        let provider = create_provider(&config.embedding)?;
        let store = VectorStore::new(config.storage.cache_dir.clone(), provider);
        let generator = Box::new(OllamaGenerator::new(
            &config.generation,
            config.retrieval.request_budget,
        ));
        Ok(Self {
            config,
            store,
            generator,
        })
    }

    /// Wire up a pipeline around an existing store and generator.
    pub fn with_backend(
        config: Config,
        store: VectorStore,
        generator: Box<dyn Generator>,
    ) -> Self {
        Self {
            config,
            store,
            generator,
        }
    }

    /// Answer `question` from the given PDF files.
    ///
    /// When retrieval comes back empty the fixed no-documents answer is
    /// returned and the generation backend is never contacted. Otherwise
    /// only the first `context_chunk_count` hits feed the prompt, while
    /// every retrieved chunk is reported in `sources`, best match first.
    pub async fn answer(
        &self,
        files: &[PathBuf],
        question: &str,
        style: AnswerStyle,
    ) -> Result<RagAnswer> {
        let pages = load_pdfs(files)?;
        let chunks = chunk_pages(
            &pages,
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        );
        let fingerprint = fingerprint_files(files)?;
        let index = self.store.get_or_build(chunks, &fingerprint).await?;

        let hits = self
            .store
            .query(&index, question, self.config.retrieval.top_k)
            .await?;
        if hits.is_empty() {
            log::debug!("retrieval returned no chunks, skipping generation");
            return Ok(RagAnswer {
                answer: NO_DOCUMENTS_MESSAGE.to_string(),
                sources: Vec::new(),
            });
        }
        log::debug!(
            "retrieved {} chunk(s), best score {:.4}",
            hits.len(),
            hits[0].1
        );

        let context_count = self.config.retrieval.context_chunk_count.min(hits.len());
        let context = hits[..context_count]
            .iter()
            .map(|(chunk, _)| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let context = truncate_chars(&context, self.config.retrieval.context_budget);

        let prompt = build_prompt(style, &context, question);
        let answer = self.generator.generate(&prompt).await;

        let sources = hits
            .iter()
            .map(|(chunk, _)| SourceRef {
                path: chunk.path.clone(),
                page: chunk.page,
            })
            .collect();
        Ok(RagAnswer { answer, sources })
    }

    /// Load, chunk, and embed the given files without asking a question.
    ///
    /// Returns the fingerprint and the number of chunks in the index. A
    /// later `answer` call over the same bytes reuses the cached vectors.
    pub async fn build_index(&self, files: &[PathBuf]) -> Result<(String, usize)> {
        let pages = load_pdfs(files)?;
        let chunks = chunk_pages(
            &pages,
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        );
        let fingerprint = fingerprint_files(files)?;
        let index = self.store.get_or_build(chunks, &fingerprint).await?;
        Ok((fingerprint, index.chunks.len()))
    }
}
