//! # docqa
//!
//! Ask questions about your PDFs from the command line.
//!
//! docqa runs a local retrieval-augmented generation pipeline: PDF pages
//! are chunked and embedded into a vector index cached on disk, the
//! chunks most similar to a question are retrieved, and a style-tuned
//! prompt built from the best match is sent to a local Ollama backend.
//! Answers always cite the file and page they came from.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌─────────────┐
//! │   PDFs   │──▶│   Loader     │──▶│   Chunker    │
//! │          │   │  per page   │   │ char window │
//! └──────────┘   └─────────────┘   └──────┬──────┘
//!                                         │
//!                   ┌─────────────────────┤
//!                   ▼                     ▼
//!             ┌──────────┐         ┌──────────┐
//!             │  Vector  │◀───────▶│ Embedding │
//!             │  cache   │         │ provider │
//!             └────┬─────┘         └──────────┘
//!                  │ top-k
//!                  ▼
//!             ┌──────────┐         ┌──────────┐
//!             │  Prompt  │────────▶│  Ollama   │
//!             │ builder  │         │ backend  │
//!             └──────────┘         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docqa ask notes.pdf --question "What is the main argument?"
//! docqa ask papers/ -q "Summarize the methodology" --style "bullet points"
//! docqa index papers/          # embed without asking anything
//! docqa history --limit 5      # revisit past answers
//! docqa styles                 # list answer styles
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`loader`] | Per-page PDF text extraction |
//! | [`fingerprint`] | Content fingerprint over file sets |
//! | [`chunk`] | Character-window text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Persisted vector index and similarity search |
//! | [`prompt`] | Answer styles and prompt rendering |
//! | [`generate`] | Generation backend client |
//! | [`pipeline`] | End-to-end question answering |
//! | [`history`] | Question/answer history persistence |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod fingerprint;
pub mod generate;
pub mod history;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod store;
