//! # Topical Taxonomy Module
//!
//! ## Purpose
//! Curated workplace-safety keyword taxonomy organized into priority tiers,
//! used for topical score boosting, the lightweight relevance classifier and
//! search suggestions.
//!
//! ## Input/Output Specification
//! - **Input**: Free-text queries and partial inputs
//! - **Output**: Relevance tier hits with matched keywords, suggestion entries
//! - **Cost bound**: Tier scanning stops at the first tier with a hit
//!
//! ## Key Features
//! - Ordered relevance tiers (critical > high > medium > low)
//! - Bilingual keyword lists matching the corpus (German statute vocabulary
//!   alongside English terms)
//! - Suggestion categories with descriptions and keyword lists

use serde::{Deserialize, Serialize};

/// Topical relevance tier. Ordering follows severity: `Critical` is greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelevanceTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RelevanceTier {
    /// Stable lowercase label for logging and API payloads
    pub fn label(&self) -> &'static str {
        match self {
            RelevanceTier::Critical => "critical",
            RelevanceTier::High => "high",
            RelevanceTier::Medium => "medium",
            RelevanceTier::Low => "low",
        }
    }
}

/// Result of the lightweight topical relevance check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceCheck {
    /// Whether the query touched the taxonomy at all
    pub is_relevant: bool,
    /// Highest tier hit, if any
    pub level: Option<RelevanceTier>,
    /// Keywords of that tier found in the query
    pub matched_keywords: Vec<String>,
}

/// One curated suggestion category
#[derive(Debug, Clone)]
pub struct TaxonomyEntry {
    /// Category name
    pub category: &'static str,
    /// Short description of what the category covers
    pub description: &'static str,
    /// Keywords associated with the category
    pub keywords: &'static [&'static str],
}

/// Priority-tiered keyword taxonomy with suggestion categories
pub struct Taxonomy {
    tiers: Vec<(RelevanceTier, &'static [&'static str])>,
    entries: Vec<TaxonomyEntry>,
}

const CRITICAL_KEYWORDS: &[&str] = &[
    "gefährdungsbeurteilung",
    "risk assessment",
    "asbest",
    "asbestos",
    "absturz",
    "fall protection",
    "explosionsschutz",
    "explosion",
    "gefahrstoffe",
    "hazardous substances",
    "confined space",
    "carcinogen",
];

const HIGH_KEYWORDS: &[&str] = &[
    "lärm",
    "noise",
    "psa",
    "ppe",
    "brandschutz",
    "fire protection",
    "maschinensicherheit",
    "machine safety",
    "elektrische",
    "electrical",
    "erste hilfe",
    "first aid",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "beleuchtung",
    "lighting",
    "raumtemperatur",
    "temperature",
    "lüftung",
    "ventilation",
    "ergonomie",
    "ergonomics",
    "bildschirmarbeit",
    "screen work",
];

const LOW_KEYWORDS: &[&str] = &[
    "pausen",
    "break",
    "unterweisung",
    "instruction",
    "kennzeichnung",
    "signage",
    "documentation",
];

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            tiers: vec![
                (RelevanceTier::Critical, CRITICAL_KEYWORDS),
                (RelevanceTier::High, HIGH_KEYWORDS),
                (RelevanceTier::Medium, MEDIUM_KEYWORDS),
                (RelevanceTier::Low, LOW_KEYWORDS),
            ],
            entries: vec![
                TaxonomyEntry {
                    category: "Arbeitsstätten",
                    description: "Workplace design, room climate, lighting and traffic routes",
                    keywords: &[
                        "asr",
                        "raumtemperatur",
                        "temperature",
                        "beleuchtung",
                        "lighting",
                        "lüftung",
                        "ventilation",
                    ],
                },
                TaxonomyEntry {
                    category: "Gefahrstoffe",
                    description: "Hazardous substances handling, storage and exposure limits",
                    keywords: &["trgs", "gefahrstoffe", "asbest", "asbestos", "exposure"],
                },
                TaxonomyEntry {
                    category: "Arbeitsschutzorganisation",
                    description: "Risk assessment, instruction and safety organization duties",
                    keywords: &[
                        "arbschg",
                        "gefährdungsbeurteilung",
                        "risk assessment",
                        "unterweisung",
                    ],
                },
                TaxonomyEntry {
                    category: "Betriebssicherheit",
                    description: "Work equipment, machine safety and recurring inspections",
                    keywords: &["trbs", "betrsichv", "maschinensicherheit", "inspection"],
                },
                TaxonomyEntry {
                    category: "Persönliche Schutzausrüstung",
                    description: "Selection and use of personal protective equipment",
                    keywords: &["psa", "ppe", "gehörschutz", "helmet"],
                },
                TaxonomyEntry {
                    category: "Brandschutz und Notfall",
                    description: "Fire protection, escape routes and emergency planning",
                    keywords: &[
                        "brandschutz",
                        "fire",
                        "fluchtwege",
                        "escape route",
                        "erste hilfe",
                        "first aid",
                    ],
                },
            ],
        }
    }
}

impl Taxonomy {
    /// Find the highest tier whose keywords appear in the query.
    ///
    /// Tiers are scanned in priority order and scanning stops at the first
    /// tier with a hit, so cost stays bounded on long queries.
    pub fn tier_of(&self, query: &str) -> Option<(RelevanceTier, Vec<String>)> {
        let query = query.to_lowercase();
        for (tier, keywords) in &self.tiers {
            let matched: Vec<String> = keywords
                .iter()
                .filter(|kw| query.contains(*kw))
                .map(|kw| kw.to_string())
                .collect();
            if !matched.is_empty() {
                return Some((*tier, matched));
            }
        }
        None
    }

    /// Lightweight topical classifier over the tiered keywords
    pub fn check(&self, query: &str) -> RelevanceCheck {
        match self.tier_of(query) {
            Some((tier, matched_keywords)) => RelevanceCheck {
                is_relevant: true,
                level: Some(tier),
                matched_keywords,
            },
            None => RelevanceCheck {
                is_relevant: false,
                level: None,
                matched_keywords: Vec::new(),
            },
        }
    }

    /// Curated suggestion categories
    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(RelevanceTier::Critical > RelevanceTier::High);
        assert!(RelevanceTier::High > RelevanceTier::Medium);
        assert!(RelevanceTier::Medium > RelevanceTier::Low);
    }

    #[test]
    fn test_first_tier_wins() {
        let taxonomy = Taxonomy::default();
        // Query touching both a critical and a medium keyword reports critical only.
        let (tier, matched) = taxonomy
            .tier_of("Asbest bei schlechter Beleuchtung entfernen")
            .unwrap();
        assert_eq!(tier, RelevanceTier::Critical);
        assert!(matched.contains(&"asbest".to_string()));
        assert!(!matched.contains(&"beleuchtung".to_string()));
    }

    #[test]
    fn test_check_miss() {
        let taxonomy = Taxonomy::default();
        let check = taxonomy.check("completely unrelated topic");
        assert!(!check.is_relevant);
        assert!(check.level.is_none());
        assert!(check.matched_keywords.is_empty());
    }

    #[test]
    fn test_check_case_insensitive() {
        let taxonomy = Taxonomy::default();
        let check = taxonomy.check("LÄRM am Arbeitsplatz");
        assert!(check.is_relevant);
        assert_eq!(check.level, Some(RelevanceTier::High));
    }
}
