//! # Relevance Scoring Module
//!
//! ## Purpose
//! Multi-factor relevance scoring of one law document against one free-text
//! query. Pure and stateless: the same document and query always produce the
//! same score, and no field access can fail.
//!
//! ## Input/Output Specification
//! - **Input**: One `LawDocument`, one query, scoring options
//! - **Output**: Non-negative score plus structured match evidence
//! - **Model**: Additive weights from `ScoringConfig`, capped where unbounded
//!   input could otherwise dominate
//!
//! ## Key Features
//! - Abbreviation matching contributes the largest single weight
//! - Full-text occurrence bonus capped so repetition cannot dominate
//! - Chapter/section scanning never short-circuits; every matching section
//!   adds evidence, with the combined contribution capped
//! - Optional topical boost from taxonomy tiers and precomputed hints

use crate::abbrev;
use crate::config::ScoringConfig;
use crate::document::LawDocument;
use crate::taxonomy::{RelevanceTier, Taxonomy};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Structured evidence of how a document matched a query
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchDetails {
    /// Query hit the title (whole or per-word)
    pub title_match: bool,
    /// Query hit the abbreviation in some form
    pub abbreviation_match: bool,
    /// Query hit the full text or a section body
    pub content_match: bool,
    /// Query hit the assembled text of an externally sourced document
    pub source_match: bool,
    /// Number of individual match events contributing evidence
    pub match_count: usize,
    /// Additional weight from the topical boost pass
    pub topical_bonus: f32,
    /// Keywords and query words that produced matches
    pub matched_keywords: BTreeSet<String>,
}

/// Options controlling a single scoring pass
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreOptions {
    /// Apply the taxonomy/hint topical boost
    pub boost_topical: bool,
}

/// Stateless relevance scorer
pub struct RelevanceScorer {
    weights: ScoringConfig,
    taxonomy: Arc<Taxonomy>,
}

impl RelevanceScorer {
    /// Create a scorer with the given weights and taxonomy
    pub fn new(weights: ScoringConfig, taxonomy: Arc<Taxonomy>) -> Self {
        Self { weights, taxonomy }
    }

    /// The weights this scorer was built with
    pub fn weights(&self) -> &ScoringConfig {
        &self.weights
    }

    /// Score one document against one query.
    ///
    /// Queries shorter than the engine minimum are the caller's concern; the
    /// scorer evaluates whatever it is handed. Missing document fields are
    /// empty strings and contribute nothing.
    pub fn score(
        &self,
        document: &LawDocument,
        query: &str,
        options: ScoreOptions,
    ) -> (f32, MatchDetails) {
        let query_lc = query.trim().to_lowercase();
        let mut details = MatchDetails::default();
        if query_lc.is_empty() {
            return (0.0, details);
        }

        let words: Vec<&str> = query_lc
            .split_whitespace()
            .filter(|w| w.chars().count() >= 2)
            .collect();

        let mut score = 0.0f32;
        score += self.score_abbreviation(document, &query_lc, &mut details);
        score += self.score_title(document, &query_lc, &words, &mut details);
        score += self.score_summary(document, &query_lc, &mut details);
        score += self.score_full_text(document, &query_lc, &words, &mut details);
        score += self.score_structure(document, &query_lc, &mut details);

        if options.boost_topical {
            score += self.score_topical(document, &query_lc, &mut details);
        }

        (score, details)
    }

    fn score_abbreviation(
        &self,
        document: &LawDocument,
        query: &str,
        details: &mut MatchDetails,
    ) -> f32 {
        let m = abbrev::matches(&document.abbreviation, query);
        if !m.is_match() {
            return 0.0;
        }

        details.abbreviation_match = true;
        details.match_count += 1;
        details
            .matched_keywords
            .insert(document.abbreviation.to_lowercase());

        if m.is_exact {
            self.weights.abbrev_exact
        } else if m.fuzzy_equivalent {
            self.weights.abbrev_fuzzy_exact
        } else if m.is_partial {
            self.weights.abbrev_partial
        } else {
            self.weights.abbrev_fuzzy_partial
        }
    }

    fn score_title(
        &self,
        document: &LawDocument,
        query: &str,
        words: &[&str],
        details: &mut MatchDetails,
    ) -> f32 {
        // The two title fields are checked separately; a query must not
        // match across the boundary between them.
        let title = document.title.to_lowercase();
        let localized = document.title_localized.to_lowercase();
        let mut score = 0.0;

        if title.contains(query) || localized.contains(query) {
            score += self.weights.title_substring;
            details.title_match = true;
            details.match_count += 1;
        }

        // Independent per-word weight: a two-word query matching both words
        // scores higher than matching one.
        for word in words {
            if title.contains(word) || localized.contains(word) {
                score += self.weights.title_word;
                details.title_match = true;
                details.match_count += 1;
                details.matched_keywords.insert((*word).to_string());
            }
        }

        score
    }

    fn score_summary(
        &self,
        document: &LawDocument,
        query: &str,
        details: &mut MatchDetails,
    ) -> f32 {
        let haystack = format!(
            "{} {}",
            document.summary.to_lowercase(),
            document.category.to_lowercase()
        );
        if haystack.contains(query) {
            details.match_count += 1;
            self.weights.summary_match
        } else {
            0.0
        }
    }

    fn score_full_text(
        &self,
        document: &LawDocument,
        query: &str,
        words: &[&str],
        details: &mut MatchDetails,
    ) -> f32 {
        if document.full_text.is_empty() {
            return 0.0;
        }
        let text = document.full_text.to_lowercase();
        let mut score = 0.0;

        let occurrences = text.match_indices(query).count();
        if occurrences > 0 {
            // Capped: a document repeating the term hundreds of times must
            // not dominate purely on repetition.
            let counted = occurrences.min(self.weights.content_occurrence_cap);
            score += self.weights.content_occurrence * counted as f32;
            details.content_match = true;
            details.match_count += counted;
        }

        for word in words {
            if text.contains(word) {
                score += self.weights.content_word_bonus;
                details.matched_keywords.insert((*word).to_string());
            }
        }

        score
    }

    fn score_structure(
        &self,
        document: &LawDocument,
        query: &str,
        details: &mut MatchDetails,
    ) -> f32 {
        let mut structure_score = 0.0f32;

        // Scan every chapter and section; multiple matching sections each add
        // evidence. The combined contribution is capped so huge documents
        // cannot grow without bound.
        for chapter in &document.chapters {
            if chapter.title.to_lowercase().contains(query) {
                structure_score += self.weights.chapter_title;
                details.match_count += 1;
            }
            for section in &chapter.sections {
                if section.title.to_lowercase().contains(query) {
                    structure_score += self.weights.section_title;
                    details.match_count += 1;
                }
                if section.text.to_lowercase().contains(query) {
                    structure_score += self.weights.section_body;
                    details.content_match = true;
                    details.match_count += 1;
                }
            }
        }

        structure_score.min(self.weights.structure_cap)
    }

    fn score_topical(
        &self,
        document: &LawDocument,
        query: &str,
        details: &mut MatchDetails,
    ) -> f32 {
        let Some((tier, matched)) = self.taxonomy.tier_of(query) else {
            return 0.0;
        };

        let mut bonus = match tier {
            RelevanceTier::Critical => self.weights.taxonomy_critical,
            RelevanceTier::High => self.weights.taxonomy_high,
            RelevanceTier::Medium => self.weights.taxonomy_medium,
            RelevanceTier::Low => self.weights.taxonomy_low,
        };
        details.matched_keywords.extend(matched);

        if let Some(hints) = &document.relevance_hints {
            bonus += match hints.top_tier() {
                Some(RelevanceTier::Critical) => self.weights.hint_critical,
                Some(RelevanceTier::High) => self.weights.hint_high,
                Some(RelevanceTier::Medium) => self.weights.hint_medium,
                Some(RelevanceTier::Low) => self.weights.hint_low,
                None => 0.0,
            };
        }

        details.topical_bonus = bonus;
        bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chapter, RelevanceHints, Section};

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(ScoringConfig::default(), Arc::new(Taxonomy::default()))
    }

    fn doc_with_abbrev(abbrev: &str) -> LawDocument {
        LawDocument {
            id: abbrev.to_lowercase().replace(' ', "-"),
            abbreviation: abbrev.to_string(),
            title: "Technische Regel".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_score_never_negative() {
        let scorer = scorer();
        let doc = LawDocument::default();
        let (score, _) = scorer.score(&doc, "anything at all", ScoreOptions::default());
        assert!(score >= 0.0);
    }

    #[test]
    fn test_empty_document_tolerated() {
        let scorer = scorer();
        let (score, details) = scorer.score(
            &LawDocument::default(),
            "raumtemperatur",
            ScoreOptions {
                boost_topical: true,
            },
        );
        assert!(score >= 0.0);
        assert!(!details.abbreviation_match);
    }

    #[test]
    fn test_abbreviation_hierarchy() {
        // Exact > partial > none, other fields held constant.
        let scorer = scorer();
        let exact = doc_with_abbrev("ASR A3.5");
        let partial = doc_with_abbrev("ASR A3.5/1,2");
        let none = doc_with_abbrev("TRGS 519");

        let (s_exact, d_exact) = scorer.score(&exact, "ASR A3.5", ScoreOptions::default());
        let (s_partial, d_partial) = scorer.score(&partial, "ASR A3.5", ScoreOptions::default());
        let (s_none, d_none) = scorer.score(&none, "ASR A3.5", ScoreOptions::default());

        assert!(d_exact.abbreviation_match);
        assert!(d_partial.abbreviation_match);
        assert!(!d_none.abbreviation_match);
        assert!(s_exact > s_partial);
        assert!(s_partial > s_none);
    }

    #[test]
    fn test_fuzzy_ranks_between_exact_and_unrelated() {
        let scorer = scorer();
        let exact = doc_with_abbrev("ASR 3.5");
        let fuzzy = doc_with_abbrev("ASR A3.5");
        let unrelated = doc_with_abbrev("DGUV 112-198");

        let (s_exact, _) = scorer.score(&exact, "ASR 3.5", ScoreOptions::default());
        let (s_fuzzy, d_fuzzy) = scorer.score(&fuzzy, "ASR 3.5", ScoreOptions::default());
        let (s_unrelated, _) = scorer.score(&unrelated, "ASR 3.5", ScoreOptions::default());

        assert!(d_fuzzy.abbreviation_match);
        assert!(s_exact > s_fuzzy);
        assert!(s_fuzzy > s_unrelated);
    }

    #[test]
    fn test_content_bonus_capped() {
        let scorer = scorer();
        let cap = scorer.weights().content_occurrence_cap;

        let few = LawDocument {
            full_text: "lärm ".repeat(3),
            ..Default::default()
        };
        let at_cap = LawDocument {
            full_text: "lärm ".repeat(cap),
            ..Default::default()
        };
        let far_past_cap = LawDocument {
            full_text: "lärm ".repeat(cap * 30),
            ..Default::default()
        };

        let (s_few, _) = scorer.score(&few, "lärm", ScoreOptions::default());
        let (s_at_cap, _) = scorer.score(&at_cap, "lärm", ScoreOptions::default());
        let (s_past, _) = scorer.score(&far_past_cap, "lärm", ScoreOptions::default());

        // Monotone up to the cap, constant past it.
        assert!(s_few < s_at_cap);
        assert_eq!(s_at_cap, s_past);
    }

    #[test]
    fn test_two_word_query_beats_one_word_in_title() {
        let scorer = scorer();
        let both = LawDocument {
            title: "Beleuchtung und Raumtemperatur".to_string(),
            ..Default::default()
        };
        let one = LawDocument {
            title: "Beleuchtung von Fluren".to_string(),
            ..Default::default()
        };
        let (s_both, _) = scorer.score(&both, "beleuchtung raumtemperatur", ScoreOptions::default());
        let (s_one, _) = scorer.score(&one, "beleuchtung raumtemperatur", ScoreOptions::default());
        assert!(s_both > s_one);
    }

    #[test]
    fn test_single_char_umlaut_word_ignored() {
        // "ä" is one character (two bytes) and must be dropped by the word
        // filter like any other single-character word.
        let scorer = scorer();
        let doc = LawDocument {
            title: "Bäder und Duschräume".to_string(),
            ..Default::default()
        };
        let (score, details) = scorer.score(&doc, "ä qqq", ScoreOptions::default());
        assert_eq!(score, 0.0);
        assert!(!details.title_match);
    }

    #[test]
    fn test_no_substring_match_across_title_boundary() {
        let scorer = scorer();
        let split = LawDocument {
            title: "Lärm".to_string(),
            title_localized: "Vibration".to_string(),
            ..Default::default()
        };
        let joined = LawDocument {
            title: "Lärm Vibration".to_string(),
            ..Default::default()
        };

        let (s_split, _) = scorer.score(&split, "lärm vibration", ScoreOptions::default());
        let (s_joined, _) = scorer.score(&joined, "lärm vibration", ScoreOptions::default());

        // Both words hit in both documents, but only the single-field title
        // contains the whole query as a substring.
        let weights = scorer.weights();
        assert_eq!(s_split + weights.title_substring, s_joined);
    }

    #[test]
    fn test_multiple_sections_each_add_evidence() {
        let scorer = scorer();
        let section = |title: &str| Section {
            id: String::new(),
            number: String::new(),
            title: title.to_string(),
            text: String::new(),
        };
        let one_hit = LawDocument {
            chapters: vec![Chapter {
                title: String::new(),
                sections: vec![section("Lüftung"), section("Sonstiges")],
            }],
            ..Default::default()
        };
        let two_hits = LawDocument {
            chapters: vec![Chapter {
                title: String::new(),
                sections: vec![section("Lüftung"), section("Freie Lüftung")],
            }],
            ..Default::default()
        };
        let (s_one, _) = scorer.score(&one_hit, "lüftung", ScoreOptions::default());
        let (s_two, d_two) = scorer.score(&two_hits, "lüftung", ScoreOptions::default());
        assert!(s_two > s_one);
        assert!(d_two.match_count >= 2);
    }

    #[test]
    fn test_structure_contribution_capped() {
        let scorer = scorer();
        let sections: Vec<Section> = (0..500)
            .map(|i| Section {
                id: format!("s{}", i),
                number: String::new(),
                title: "Lärm am Arbeitsplatz".to_string(),
                text: "Lärm ist zu vermeiden.".to_string(),
            })
            .collect();
        let huge = LawDocument {
            chapters: vec![Chapter {
                title: String::new(),
                sections,
            }],
            ..Default::default()
        };
        let (score, _) = scorer.score(&huge, "lärm", ScoreOptions::default());
        // Structure part bounded by its cap; word bonuses do not apply to sections.
        assert!(score <= scorer.weights().structure_cap + 1.0);
    }

    #[test]
    fn test_topical_boost_adds_weight() {
        let scorer = scorer();
        let doc = LawDocument {
            title: "Gefahrstoffverordnung".to_string(),
            relevance_hints: Some(RelevanceHints {
                critical: 3,
                ..Default::default()
            }),
            ..Default::default()
        };
        let (plain, _) = scorer.score(&doc, "asbest sanierung", ScoreOptions::default());
        let (boosted, details) = scorer.score(
            &doc,
            "asbest sanierung",
            ScoreOptions {
                boost_topical: true,
            },
        );
        assert!(boosted > plain);
        assert!(details.topical_bonus > 0.0);
        assert!(details.matched_keywords.contains("asbest"));
    }
}
