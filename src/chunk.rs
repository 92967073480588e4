//! Fixed-size sliding-window text chunker.
//!
//! Splits page text into [`Chunk`]s of at most `chunk_size` characters,
//! with consecutive chunks from one page sharing exactly `chunk_overlap`
//! characters so that sentences straddling a boundary stay retrievable.
//! Splitting is character-based, not semantic; that is the configured
//! behavior. Counts are `char`s, never bytes, so multi-byte text cannot
//! be split mid code point.

use crate::models::{Chunk, PageText};

/// Split every page into overlapping chunks, preserving page order.
///
/// `chunk_overlap` must be less than `chunk_size` (enforced by config
/// validation). The final chunk of a page may be shorter than
/// `chunk_size`; whitespace-only pages produce no chunks.
pub fn chunk_pages(pages: &[PageText], chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        chunk_page(page, chunk_size, chunk_overlap, &mut chunks);
    }
    chunks
}

fn chunk_page(page: &PageText, chunk_size: usize, chunk_overlap: usize, out: &mut Vec<Chunk>) {
    if page.text.trim().is_empty() {
        return;
    }

    let chars: Vec<char> = page.text.chars().collect();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        out.push(Chunk {
            text: chars[start..end].iter().collect(),
            path: page.path.clone(),
            page: page.page,
        });
        if end == chars.len() {
            break;
        }
        start = end - chunk_overlap;
    }
}
