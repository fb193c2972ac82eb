//! # Abbreviation Matching Module
//!
//! ## Purpose
//! Normalization and fuzzy comparison of technical rule codes so that
//! equivalent renderings of the same rule compare equal. German technical
//! rules are cited inconsistently in practice: "ASR A3.5", "ASR 3.5",
//! "asr-a3.5" and "ASR_A3_5" all name the same workplace rule.
//!
//! ## Input/Output Specification
//! - **Input**: A candidate abbreviation and a free-text query fragment
//! - **Output**: Exact / partial / fuzzy match classification
//! - **Failure mode**: Empty input yields all-false, never errors
//!
//! ## Key Features
//! - Separator collapsing (`-`, `_`, `.` become single spaces)
//! - Canonicalization of letter-prefixed rule numbers ("A3.5" vs "3.5")
//! - Cheap literal checks run before the normalized comparison

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Classification of an abbreviation comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbbrevMatch {
    /// Literal case-insensitive equality
    pub is_exact: bool,
    /// Literal case-insensitive substring containment, either direction
    pub is_partial: bool,
    /// Equality or containment that only appears after normalization
    pub is_fuzzy: bool,
    /// Fuzzy match where the normalized forms are fully equal, not just
    /// contained; rated above non-fuzzy partial matches by the scorer
    pub fuzzy_equivalent: bool,
}

impl AbbrevMatch {
    /// Whether any form of match was found
    pub fn is_match(&self) -> bool {
        self.is_exact || self.is_partial || self.is_fuzzy
    }
}

fn letter_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Rule-number tokens where a leading letter prefixes a bare number,
    // e.g. "a3" in "asr a3 5" after separator collapsing.
    RE.get_or_init(|| Regex::new(r"^[a-zäöü](\d+)$").expect("static regex"))
}

/// Normalize an abbreviation for fuzzy comparison: Unicode NFC, lowercase,
/// separators collapsed to single spaces, letter-prefixed rule numbers
/// reduced to the bare number.
pub fn normalize(input: &str) -> String {
    let lowered: String = input.nfc().collect::<String>().to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| match c {
            '-' | '_' | '.' => ' ',
            other => other,
        })
        .collect();

    let re = letter_prefix_regex();
    spaced
        .split_whitespace()
        .map(|token| match re.captures(token) {
            Some(caps) => caps[1].to_string(),
            None => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compare a candidate abbreviation against a query fragment.
///
/// The literal checks run first since they are cheaper and catch most real
/// inputs; the normalized comparison only classifies what they missed.
pub fn matches(candidate: &str, query: &str) -> AbbrevMatch {
    let candidate = candidate.trim();
    let query = query.trim();
    if candidate.is_empty() || query.is_empty() {
        return AbbrevMatch::default();
    }

    let lc_candidate = candidate.to_lowercase();
    let lc_query = query.to_lowercase();

    let is_exact = lc_candidate == lc_query;
    let is_partial =
        !is_exact && (lc_candidate.contains(&lc_query) || lc_query.contains(&lc_candidate));

    let mut is_fuzzy = false;
    let mut fuzzy_equivalent = false;
    if !is_exact && !is_partial {
        let norm_candidate = normalize(candidate);
        let norm_query = normalize(query);
        if !norm_candidate.is_empty() && !norm_query.is_empty() {
            fuzzy_equivalent = norm_candidate == norm_query;
            is_fuzzy = fuzzy_equivalent
                || norm_candidate.contains(&norm_query)
                || norm_query.contains(&norm_candidate);
        }
    }

    AbbrevMatch {
        is_exact,
        is_partial,
        is_fuzzy,
        fuzzy_equivalent,
    }
}
