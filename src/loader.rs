//! PDF ingestion: per-page text extraction.
//!
//! Files are read whole and handed to `pdf-extract`, one text record per
//! page. Corrupt or unreadable input fails loudly with the offending path;
//! nothing is guessed on bad input and the vector cache is never touched.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::PageText;

/// Ingestion failure. Aborts the operation for the whole file set.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to extract text from {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("no extractable text in {path}")]
    NoText { path: PathBuf },
}

/// Extract page-level text from each file, in the given order.
///
/// Emits one record per non-blank page, tagged with the source path and a
/// 1-based page number. A file whose pages all extract to whitespace is an
/// error: there is nothing to index, and treating it as empty would
/// silently produce an index that can never answer anything.
pub fn load_pdfs(paths: &[PathBuf]) -> Result<Vec<PageText>, LoadError> {
    let mut pages = Vec::new();

    for path in paths {
        let bytes = std::fs::read(path).map_err(|e| LoadError::Read {
            path: path.clone(),
            source: e,
        })?;

        let page_texts =
            pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| LoadError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let before = pages.len();
        for (i, text) in page_texts.into_iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            pages.push(PageText {
                path: path.display().to_string(),
                page: (i + 1) as u32,
                text,
            });
        }

        if pages.len() == before {
            return Err(LoadError::NoText { path: path.clone() });
        }

        log::debug!("loaded {} page(s) from {}", pages.len() - before, path.display());
    }

    Ok(pages)
}
