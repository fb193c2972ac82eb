//! # Document Model Module
//!
//! ## Purpose
//! Typed model of the workplace-safety law corpus and the read-only store that
//! serves it. Documents are owned by the store; the search core only reads them.
//!
//! ## Input/Output Specification
//! - **Input**: JSON corpus files, one per jurisdiction
//! - **Output**: Immutable `LawDocument` values for the search engine
//! - **Tolerance**: Every optional field has a typed default so sparse corpus
//!   entries deserialize without errors
//!
//! ## Key Features
//! - Optional-field struct model with explicit serde defaults
//! - Per-tier relevance hint annotations for topical boosting
//! - Async `DocumentStore` trait with a JSON-file implementation

use crate::errors::{AssistError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One law document in the corpus.
///
/// Fields beyond `id` and `title` are optional in the corpus JSON; missing
/// values deserialize to empty defaults and simply contribute no score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LawDocument {
    /// Unique document identifier
    pub id: String,
    /// Technical rule abbreviation, e.g. "ASR A3.5" or "ArbSchG"
    pub abbreviation: String,
    /// Document title
    pub title: String,
    /// Localized title, when the corpus carries one
    pub title_localized: String,
    /// Short summary or subcategory description
    pub summary: String,
    /// Full document text
    pub full_text: String,
    /// Ordered chapters
    pub chapters: Vec<Chapter>,
    /// Corpus category, e.g. "Arbeitsstätten"
    pub category: String,
    /// Precomputed topical relevance annotations
    pub relevance_hints: Option<RelevanceHints>,
    /// Whether the full text came from an external source document (scanned
    /// or supplementary material) and should get the direct full-text scan
    pub source_document: bool,
}

/// Ordered chapter within a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    /// Chapter title
    pub title: String,
    /// Ordered sections
    pub sections: Vec<Section>,
}

/// Section within a chapter. Read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    /// Section identifier
    pub id: String,
    /// Section number, e.g. "4.2"
    pub number: String,
    /// Section title
    pub title: String,
    /// Section body text
    pub text: String,
}

/// Precomputed counts of topical tags per relevance tier
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceHints {
    /// Number of critical-tier topical tags
    pub critical: usize,
    /// Number of high-tier topical tags
    pub high: usize,
    /// Number of medium-tier topical tags
    pub medium: usize,
    /// Number of low-tier topical tags
    pub low: usize,
}

impl RelevanceHints {
    /// Highest tier with a nonzero tag count, if any
    pub fn top_tier(&self) -> Option<crate::taxonomy::RelevanceTier> {
        use crate::taxonomy::RelevanceTier;
        if self.critical > 0 {
            Some(RelevanceTier::Critical)
        } else if self.high > 0 {
            Some(RelevanceTier::High)
        } else if self.medium > 0 {
            Some(RelevanceTier::Medium)
        } else if self.low > 0 {
            Some(RelevanceTier::Low)
        } else {
            None
        }
    }
}

impl LawDocument {
    /// Assemble the complete searchable text of the document: abbreviation,
    /// titles, summary, full text and every chapter/section title and body.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![
            &self.abbreviation,
            &self.title,
            &self.title_localized,
            &self.summary,
            &self.full_text,
        ];
        for chapter in &self.chapters {
            parts.push(&chapter.title);
            for section in &chapter.sections {
                parts.push(&section.title);
                parts.push(&section.text);
            }
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n")
    }
}

/// Read-only source of law documents, assumed fully loaded into memory
/// before search runs.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List all documents for a jurisdiction
    async fn list_documents(&self, jurisdiction: &str) -> Result<Vec<LawDocument>>;
}

/// Document store backed by one JSON file per jurisdiction
pub struct JsonDocumentStore {
    root: PathBuf,
}

impl JsonDocumentStore {
    /// Create a store reading `{root}/{jurisdiction}.json`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn list_documents(&self, jurisdiction: &str) -> Result<Vec<LawDocument>> {
        let path = self.root.join(format!("{}.json", jurisdiction));
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AssistError::Storage {
                details: format!("Failed to read corpus file {:?}: {}", path, e),
            })?;

        let documents: Vec<LawDocument> =
            serde_json::from_str(&content).map_err(|e| AssistError::Serialization {
                message: format!("Invalid corpus file {:?}: {}", path, e),
            })?;

        tracing::info!(
            "Loaded {} documents for jurisdiction '{}'",
            documents.len(),
            jurisdiction
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_document_deserializes() {
        let doc: LawDocument =
            serde_json::from_str(r#"{"id": "asr-a3.5", "title": "Raumtemperatur"}"#).unwrap();
        assert_eq!(doc.id, "asr-a3.5");
        assert!(doc.abbreviation.is_empty());
        assert!(doc.chapters.is_empty());
        assert!(doc.relevance_hints.is_none());
        assert!(!doc.source_document);
    }

    #[test]
    fn test_searchable_text_includes_sections() {
        let doc = LawDocument {
            id: "d1".into(),
            abbreviation: "ASR A3.5".into(),
            title: "Room temperature".into(),
            chapters: vec![Chapter {
                title: "Scope".into(),
                sections: vec![Section {
                    id: "s1".into(),
                    number: "1.1".into(),
                    title: "Application".into(),
                    text: "Applies to workrooms.".into(),
                }],
            }],
            ..Default::default()
        };
        let text = doc.searchable_text();
        assert!(text.contains("ASR A3.5"));
        assert!(text.contains("Scope"));
        assert!(text.contains("Application"));
        assert!(text.contains("workrooms"));
    }

    #[test]
    fn test_top_tier_ordering() {
        use crate::taxonomy::RelevanceTier;
        let hints = RelevanceHints {
            critical: 0,
            high: 2,
            medium: 1,
            low: 0,
        };
        assert_eq!(hints.top_tier(), Some(RelevanceTier::High));
        assert_eq!(RelevanceHints::default().top_tier(), None);
    }
}
