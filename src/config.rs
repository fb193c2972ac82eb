//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the search and orchestration core, supporting
//! TOML files and environment variable overrides with validation and type-safe
//! access to all settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation
//!
//! ## Key Features
//! - Heuristic scoring weights exposed as configuration so they can be tuned
//!   and tested independently of the scoring control flow
//! - Rate gate, concurrency ceiling and retry policy as explicit settings
//! - Intelligent defaults for every section
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables
//! 2. Configuration files
//! 3. Default values

use crate::errors::{AssistError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relevance scoring weights
    pub scoring: ScoringConfig,
    /// Search engine behavior
    pub search: SearchConfig,
    /// Response cache settings
    pub cache: CacheConfig,
    /// Request orchestration settings
    pub orchestrator: OrchestratorConfig,
    /// Generation backend settings
    pub generator: GeneratorConfig,
    /// Key-value storage settings
    pub storage: StorageConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Relevance scoring weights.
///
/// These are heuristic constants, not derived from data. They live in
/// configuration so ranking behavior can be tuned without touching the
/// scoring algorithm itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Exact abbreviation equality (largest single weight in the model)
    pub abbrev_exact: f32,
    /// Abbreviations equivalent after normalization but not literally equal
    pub abbrev_fuzzy_exact: f32,
    /// Literal substring containment between abbreviation and query
    pub abbrev_partial: f32,
    /// Substring containment that only appears after normalization
    pub abbrev_fuzzy_partial: f32,
    /// Whole query appearing as a substring of the title
    pub title_substring: f32,
    /// Each individual query word found in the title
    pub title_word: f32,
    /// Query appearing in the summary or category text
    pub summary_match: f32,
    /// Per-occurrence weight for query hits in the full text
    pub content_occurrence: f32,
    /// Occurrence count beyond which repetition adds nothing
    pub content_occurrence_cap: usize,
    /// Each query word present anywhere in the full text
    pub content_word_bonus: f32,
    /// Query hit in a chapter title
    pub chapter_title: f32,
    /// Query hit in a section title
    pub section_title: f32,
    /// Query hit in a section body
    pub section_body: f32,
    /// Ceiling on the combined chapter/section contribution
    pub structure_cap: f32,
    /// Taxonomy tier bonus when the query matches a critical-tier keyword
    pub taxonomy_critical: f32,
    /// Taxonomy tier bonus for a high-tier keyword
    pub taxonomy_high: f32,
    /// Taxonomy tier bonus for a medium-tier keyword
    pub taxonomy_medium: f32,
    /// Taxonomy tier bonus for a low-tier keyword
    pub taxonomy_low: f32,
    /// Extra weight when the document carries critical relevance hints
    pub hint_critical: f32,
    /// Extra weight for high-tier relevance hints
    pub hint_high: f32,
    /// Extra weight for medium-tier relevance hints
    pub hint_medium: f32,
    /// Extra weight for low-tier relevance hints
    pub hint_low: f32,
    /// Per-occurrence weight for the source-document full-text scan
    pub source_occurrence: f32,
    /// Occurrence cap for the source-document full-text scan
    pub source_occurrence_cap: usize,
}

/// Search engine behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum query length; shorter queries return no results
    pub min_query_length: usize,
    /// Default maximum number of results
    pub default_limit: usize,
    /// Maximum number of suggestions returned for a partial input
    pub max_suggestions: usize,
    /// Number of default suggestions shown for empty/short input
    pub default_suggestions: usize,
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time to live for cache entries (hours)
    pub ttl_hours: u64,
    /// Cache format version; bumping orphans all existing entries
    pub version: u32,
}

/// Request orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Minimum spacing between request starts (seconds), unless unlocked
    pub min_interval_seconds: u64,
    /// Maximum number of requests in flight at once
    pub max_concurrent: usize,
    /// Retry attempts for transient generation failures
    pub retry_attempts: u32,
    /// Initial backoff delay, doubled on each retry (milliseconds)
    pub retry_initial_delay_ms: u64,
}

/// Generation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Generation API endpoint
    pub endpoint: String,
    /// API key for authentication (optional)
    pub api_key: Option<String>,
    /// Model identifier passed to the backend
    pub model: String,
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Key-value storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path
    pub db_path: PathBuf,
    /// Compress large stored values
    pub enable_compression: bool,
    /// Values at or above this size are compressed (bytes)
    pub compression_threshold_bytes: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| AssistError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| AssistError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(db_path) = std::env::var("WHS_ASSIST_DB_PATH") {
            self.storage.db_path = PathBuf::from(db_path);
        }
        if let Ok(endpoint) = std::env::var("WHS_ASSIST_GENERATOR_ENDPOINT") {
            self.generator.endpoint = endpoint;
        }
        if let Ok(api_key) = std::env::var("WHS_ASSIST_API_KEY") {
            self.generator.api_key = Some(api_key);
        }
        if let Ok(interval) = std::env::var("WHS_ASSIST_MIN_INTERVAL_SECONDS") {
            self.orchestrator.min_interval_seconds =
                interval.parse().map_err(|_| AssistError::Config {
                    message: "Invalid number in WHS_ASSIST_MIN_INTERVAL_SECONDS".to_string(),
                })?;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.search.min_query_length == 0 {
            return Err(AssistError::Config {
                message: "search.min_query_length must be at least 1".to_string(),
            });
        }
        if self.search.default_limit == 0 {
            return Err(AssistError::Config {
                message: "search.default_limit must be greater than zero".to_string(),
            });
        }
        if self.orchestrator.max_concurrent == 0 {
            return Err(AssistError::Config {
                message: "orchestrator.max_concurrent must be greater than zero".to_string(),
            });
        }
        if self.orchestrator.retry_initial_delay_ms == 0 {
            return Err(AssistError::Config {
                message: "orchestrator.retry_initial_delay_ms must be greater than zero"
                    .to_string(),
            });
        }
        if self.scoring.content_occurrence_cap == 0 {
            return Err(AssistError::Config {
                message: "scoring.content_occurrence_cap must be greater than zero".to_string(),
            });
        }
        if self.cache.ttl_hours == 0 {
            return Err(AssistError::Config {
                message: "cache.ttl_hours must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AssistError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            generator: GeneratorConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            abbrev_exact: 120.0,
            abbrev_fuzzy_exact: 100.0,
            abbrev_partial: 60.0,
            abbrev_fuzzy_partial: 40.0,
            title_substring: 50.0,
            title_word: 15.0,
            summary_match: 25.0,
            content_occurrence: 2.0,
            content_occurrence_cap: 10,
            content_word_bonus: 3.0,
            chapter_title: 10.0,
            section_title: 8.0,
            section_body: 4.0,
            structure_cap: 60.0,
            taxonomy_critical: 30.0,
            taxonomy_high: 20.0,
            taxonomy_medium: 10.0,
            taxonomy_low: 5.0,
            hint_critical: 15.0,
            hint_high: 10.0,
            hint_medium: 5.0,
            hint_low: 2.0,
            source_occurrence: 3.0,
            source_occurrence_cap: 15,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_length: 2,
            default_limit: 50,
            max_suggestions: 8,
            default_suggestions: 5,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 18,
            version: 3,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            min_interval_seconds: 10,
            max_concurrent: 5,
            retry_attempts: 3,
            retry_initial_delay_ms: 1000,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/generate".to_string(),
            api_key: None,
            model: "whs-assist-default".to_string(),
            request_timeout_seconds: 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/whs_assist.db"),
            enable_compression: true,
            compression_threshold_bytes: 4096,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_abbreviation_weights_ordered() {
        // Exact must outrank fuzzy equivalence, which outranks the partial variants.
        let scoring = ScoringConfig::default();
        assert!(scoring.abbrev_exact > scoring.abbrev_fuzzy_exact);
        assert!(scoring.abbrev_fuzzy_exact > scoring.abbrev_partial);
        assert!(scoring.abbrev_partial > scoring.abbrev_fuzzy_partial);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.orchestrator.max_concurrent,
            config.orchestrator.max_concurrent
        );
        assert_eq!(parsed.cache.ttl_hours, config.cache.ttl_hours);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.orchestrator.max_concurrent = 0;
        assert!(config.validate().is_err());
    }
}
