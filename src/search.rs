//! # Deep Search Engine Module
//!
//! ## Purpose
//! Corpus-wide document search: applies the relevance scorer across a
//! document collection, augments externally sourced documents with a direct
//! full-text scan, ranks and truncates results, and groups them by category.
//!
//! ## Input/Output Specification
//! - **Input**: Free-text query, in-memory document collection, search options
//! - **Output**: Ranked search results, category groups, suggestions,
//!   topical relevance checks
//! - **Ordering**: Stable sort by score descending; ties keep corpus order
//!
//! ## Key Features
//! - Parallel corpus scoring with preserved input order
//! - Bounded full-text bonus for source documents
//! - Category grouping with severity summarization
//! - Suggestion lookup against the curated taxonomy

use crate::config::{Config, ScoringConfig, SearchConfig};
use crate::document::LawDocument;
use crate::scoring::{MatchDetails, RelevanceScorer, ScoreOptions};
use crate::taxonomy::{RelevanceCheck, RelevanceTier, Taxonomy};
use crate::utils::Timer;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Default bucket for documents without a category
const DEFAULT_CATEGORY: &str = "Allgemein";

/// Options for one search invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Run the direct full-text scan over externally sourced documents
    pub include_full_text: bool,
    /// Apply the taxonomy/hint topical boost
    pub boost_topical: bool,
    /// Maximum number of results; engine default when absent
    pub limit: Option<usize>,
}

/// One scored document. Created per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// The matched document
    pub document: LawDocument,
    /// Relevance score, always > 0 for returned results
    pub score: f32,
    /// Structured match evidence
    pub details: MatchDetails,
}

/// Results bucketed by corpus category
#[derive(Debug, Clone, Serialize)]
pub struct ResultGroup {
    /// Category name (or the default bucket)
    pub category: String,
    /// Number of results in the bucket
    pub count: usize,
    /// Results in input order (score descending for sorted input)
    pub results: Vec<SearchResult>,
    /// Sum of the bucket's scores
    pub total_score: f32,
    /// Highest severity tier seen among the bucket's document hints
    pub top_relevance: Option<RelevanceTier>,
}

/// How strongly a suggestion matched the partial input
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SuggestionRelevance {
    /// Matched only the category description
    Low,
    /// Matched a category keyword
    Medium,
    /// Matched the category name itself
    High,
}

/// One suggestion for a partial input
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    /// Suggested category
    pub category: String,
    /// Category description
    pub description: String,
    /// Match strength
    pub relevance: SuggestionRelevance,
}

/// Main search engine over an in-memory corpus
pub struct DeepSearchEngine {
    config: SearchConfig,
    scorer: RelevanceScorer,
    taxonomy: Arc<Taxonomy>,
}

impl DeepSearchEngine {
    /// Create an engine from the full configuration
    pub fn new(config: &Config) -> Self {
        Self::with_weights(config.search.clone(), config.scoring.clone())
    }

    /// Create an engine with explicit search settings and scoring weights
    pub fn with_weights(config: SearchConfig, weights: ScoringConfig) -> Self {
        let taxonomy = Arc::new(Taxonomy::default());
        let scorer = RelevanceScorer::new(weights, taxonomy.clone());
        Self {
            config,
            scorer,
            taxonomy,
        }
    }

    /// Search the document collection.
    ///
    /// Queries shorter than the configured minimum return no results. Every
    /// document is scored; results with zero score are dropped, the rest are
    /// stable-sorted by score descending and truncated to the limit.
    pub fn search(
        &self,
        query: &str,
        documents: &[LawDocument],
        options: SearchOptions,
    ) -> Vec<SearchResult> {
        let query = query.trim();
        if query.chars().count() < self.config.min_query_length {
            tracing::debug!("Query '{}' below minimum length, returning empty", query);
            return Vec::new();
        }
        let query_lc = query.to_lowercase();
        let timer = Timer::new(format!("search '{}'", query));

        let score_options = ScoreOptions {
            boost_topical: options.boost_topical,
        };

        let mut results: Vec<SearchResult> = documents
            .par_iter()
            .map(|document| {
                let (mut score, mut details) = self.scorer.score(document, query, score_options);

                if options.include_full_text && document.source_document {
                    let bonus =
                        self.score_source_text(document, &query_lc, &mut details);
                    score += bonus;
                }

                SearchResult {
                    document: document.clone(),
                    score,
                    details,
                }
            })
            .collect();

        results.retain(|r| r.score > 0.0);
        // Stable sort: ties preserve corpus order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(options.limit.unwrap_or(self.config.default_limit));

        tracing::debug!(
            "Query '{}' matched {} of {} documents",
            query,
            results.len(),
            documents.len()
        );
        timer.stop();
        results
    }

    /// Direct substring scan over the fully assembled text of an externally
    /// sourced document, with a bounded occurrence bonus.
    fn score_source_text(
        &self,
        document: &LawDocument,
        query_lc: &str,
        details: &mut MatchDetails,
    ) -> f32 {
        let text = document.searchable_text().to_lowercase();
        let occurrences = text.match_indices(query_lc).count();
        if occurrences == 0 {
            return 0.0;
        }

        let weights = self.scorer.weights();
        let counted = occurrences.min(weights.source_occurrence_cap);
        details.content_match = true;
        details.source_match = true;
        details.match_count += counted;
        weights.source_occurrence * counted as f32
    }

    /// Group results by category, accumulating counts, total scores and the
    /// highest severity tier seen among each bucket's documents. Groups are
    /// sorted by total score descending.
    pub fn group_by_category(&self, results: Vec<SearchResult>) -> Vec<ResultGroup> {
        let mut groups: Vec<ResultGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for result in results {
            let category = if result.document.category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                result.document.category.clone()
            };

            let idx = *index.entry(category.clone()).or_insert_with(|| {
                groups.push(ResultGroup {
                    category,
                    count: 0,
                    results: Vec::new(),
                    total_score: 0.0,
                    top_relevance: None,
                });
                groups.len() - 1
            });

            let group = &mut groups[idx];
            group.count += 1;
            group.total_score += result.score;
            let doc_tier = result
                .document
                .relevance_hints
                .as_ref()
                .and_then(|h| h.top_tier());
            group.top_relevance = group.top_relevance.max(doc_tier);
            group.results.push(result);
        }

        groups.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        groups
    }

    /// Suggest categories for a partial input.
    ///
    /// Category-name hits rank above keyword hits, which rank above
    /// description hits. Short or empty input returns the default top
    /// entries unranked.
    pub fn suggest(&self, partial: &str) -> Vec<Suggestion> {
        let input = partial.trim().to_lowercase();
        if input.chars().count() < self.config.min_query_length {
            return self
                .taxonomy
                .entries()
                .iter()
                .take(self.config.default_suggestions)
                .map(|entry| Suggestion {
                    category: entry.category.to_string(),
                    description: entry.description.to_string(),
                    relevance: SuggestionRelevance::Low,
                })
                .collect();
        }

        let mut suggestions: Vec<Suggestion> = self
            .taxonomy
            .entries()
            .iter()
            .filter_map(|entry| {
                let relevance = if entry.category.to_lowercase().contains(&input) {
                    SuggestionRelevance::High
                } else if entry
                    .keywords
                    .iter()
                    .any(|kw| kw.contains(&input) || input.contains(kw))
                {
                    SuggestionRelevance::Medium
                } else if entry.description.to_lowercase().contains(&input) {
                    SuggestionRelevance::Low
                } else {
                    return None;
                };
                Some(Suggestion {
                    category: entry.category.to_string(),
                    description: entry.description.to_string(),
                    relevance,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| b.relevance.cmp(&a.relevance));
        suggestions.truncate(self.config.max_suggestions);
        suggestions
    }

    /// Lightweight topical relevance check for contextual hints.
    ///
    /// Independent of ranking; callers use it to surface whether a query
    /// touches the safety taxonomy at all.
    pub fn check_relevance(&self, query: &str) -> RelevanceCheck {
        self.taxonomy.check(query)
    }
}
