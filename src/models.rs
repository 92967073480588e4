//! Core data models used throughout docqa.
//!
//! These types represent the pages, chunks, and answers that flow through
//! the ingestion and retrieval pipeline, plus the persisted history record.

use serde::{Deserialize, Serialize};

/// One page of text extracted from a PDF. Page numbers are 1-based.
#[derive(Debug, Clone)]
pub struct PageText {
    pub path: String,
    pub page: u32,
    pub text: String,
}

/// A bounded segment of one page's text, ready for embedding.
///
/// Carries its source path and page number so answers can cite where
/// retrieved text came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub path: String,
    pub page: u32,
}

/// A source attribution: the file and page a retrieved chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub path: String,
    pub page: u32,
}

/// The orchestrator's result: answer text plus source attributions for
/// every retrieved chunk, in retrieval order.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// One persisted question/answer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// RFC 3339 timestamp of when the question was answered.
    pub timestamp: String,
    pub question: String,
    pub answer: String,
    pub answer_style: String,
    pub sources: Vec<SourceRef>,
}
