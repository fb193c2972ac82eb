//! # Workplace-Safety Assistant Core
//!
//! ## Overview
//! This library implements the document search and AI-request orchestration
//! core of a workplace-safety legal reference assistant: multi-factor
//! relevance ranking over a law corpus with fuzzy matching of technical rule
//! abbreviations, and a client-side orchestrator that rate-limits, queues
//! and caches calls to an external text generation backend.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `abbrev`: Normalization and fuzzy comparison of technical rule codes
//! - `scoring`: Multi-factor relevance scoring of documents against queries
//! - `search`: Corpus-wide search, grouping, suggestions and relevance checks
//! - `taxonomy`: Priority-tiered workplace-safety keyword taxonomy
//! - `cache`: Content-addressed, versioned, TTL-based response cache
//! - `orchestrator`: Rate gate, concurrency ceiling and retry policy
//! - `pipeline`: Cached, rate-gated generation requests end to end
//! - `generator`: Text generation backend trait and HTTP implementation
//! - `document`: Corpus data model and document store
//! - `storage`: Persistent key-value storage for rate state and cache
//! - `config`: Configuration management and scoring weights
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Law documents (JSON), search queries, generation prompts
//! - **Output**: Ranked search results, cached generation responses
//! - **Guarantees**: Deterministic ranking, FIFO request dispatch, bounded
//!   request rate even across process restarts
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use whs_assist_core::{Config, DeepSearchEngine, JsonDocumentStore, DocumentStore, SearchOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let store = JsonDocumentStore::new("./corpus");
//!     let documents = store.list_documents("de").await?;
//!     let engine = DeepSearchEngine::new(&config);
//!     let results = engine.search("ASR A3.5", &documents, SearchOptions::default());
//!     println!("Found {} results", results.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod abbrev;
pub mod cache;
pub mod config;
pub mod document;
pub mod errors;
pub mod generator;
pub mod orchestrator;
pub mod pipeline;
pub mod scoring;
pub mod search;
pub mod storage;
pub mod taxonomy;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use cache::ResponseCache;
pub use config::Config;
pub use document::{Chapter, DocumentStore, JsonDocumentStore, LawDocument, Section};
pub use errors::{AssistError, Result};
pub use generator::{HttpTextGenerator, TextGenerator};
pub use orchestrator::{OrchestratorStatus, RequestOrchestrator};
pub use pipeline::GenerationPipeline;
pub use scoring::{MatchDetails, RelevanceScorer, ScoreOptions};
pub use search::{DeepSearchEngine, ResultGroup, SearchOptions, SearchResult, Suggestion};
pub use storage::{KvStore, MemoryKvStore, SledKvStore};
pub use taxonomy::{RelevanceCheck, RelevanceTier, Taxonomy};
