//! # Workplace-Safety Search Driver
//!
//! ## Purpose
//! Operational command-line driver for the search and orchestration core:
//! corpus search, category suggestions, topical relevance checks, rate state
//! inspection and cache maintenance.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, corpus directory, command line arguments
//! - **Output**: Ranked results and diagnostics on stdout, logs on stderr
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Load the corpus for the requested jurisdictions
//! 4. Dispatch the subcommand against the library

use clap::{Parser, Subcommand};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use whs_assist_core::{
    cache::ResponseCache,
    config::Config,
    document::{DocumentStore, JsonDocumentStore},
    errors::{AssistError, Result},
    generator::HttpTextGenerator,
    orchestrator::RequestOrchestrator,
    pipeline::GenerationPipeline,
    search::{DeepSearchEngine, SearchOptions},
    storage::SledKvStore,
    utils::TextUtils,
};

#[derive(Parser)]
#[command(
    name = "whs-search",
    version,
    about = "Workplace-safety law search and request orchestration driver"
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Corpus directory containing one JSON file per jurisdiction
    #[arg(long, default_value = "./corpus")]
    corpus: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the law corpus
    Search {
        /// Free-text query
        query: String,
        /// Jurisdictions to load (repeatable)
        #[arg(long, default_value = "de")]
        jurisdiction: Vec<String>,
        /// Scan the assembled full text of source documents
        #[arg(long)]
        full_text: bool,
        /// Apply the topical relevance boost
        #[arg(long)]
        boost: bool,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Group results by category
        #[arg(long)]
        grouped: bool,
    },
    /// Suggest categories for a partial input
    Suggest {
        /// Partial input
        input: String,
    },
    /// Check the topical relevance of a query
    Relevance {
        /// Query to classify
        query: String,
    },
    /// Run a generation request through the cache and rate gate
    Generate {
        /// Prompt text
        prompt: String,
        /// System prompt
        #[arg(long, default_value = "")]
        system: String,
        /// Request identifiers for the cache key (repeatable)
        #[arg(long, default_value = "de")]
        id: Vec<String>,
    },
    /// Show the orchestrator rate state
    Status,
    /// Suspend the request spacing rule
    Unlock,
    /// Restore the request spacing rule
    Lock,
    /// Remove every cached generation response
    CacheClear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    init_logging(&config)?;

    match cli.command {
        Command::Search {
            query,
            jurisdiction,
            full_text,
            boost,
            limit,
            grouped,
        } => {
            let store = JsonDocumentStore::new(&cli.corpus);
            let batches = try_join_all(
                jurisdiction
                    .iter()
                    .map(|jurisdiction| store.list_documents(jurisdiction)),
            )
            .await?;
            let documents: Vec<_> = batches.into_iter().flatten().collect();
            info!("Corpus loaded: {} documents", documents.len());

            let engine = DeepSearchEngine::new(&config);
            let results = engine.search(
                &query,
                &documents,
                SearchOptions {
                    include_full_text: full_text,
                    boost_topical: boost,
                    limit,
                },
            );

            if grouped {
                for group in engine.group_by_category(results) {
                    let severity = group
                        .top_relevance
                        .map(|tier| tier.label())
                        .unwrap_or("none");
                    println!(
                        "{} ({} results, total {:.1}, severity {})",
                        group.category, group.count, group.total_score, severity
                    );
                    for result in &group.results {
                        print_result(result);
                    }
                }
            } else {
                for result in &results {
                    print_result(result);
                }
            }
        }
        Command::Suggest { input } => {
            let engine = DeepSearchEngine::new(&config);
            for suggestion in engine.suggest(&input) {
                println!(
                    "{:?}\t{}\t{}",
                    suggestion.relevance, suggestion.category, suggestion.description
                );
            }
        }
        Command::Relevance { query } => {
            let engine = DeepSearchEngine::new(&config);
            let check = engine.check_relevance(&query);
            println!("{}", serde_json::to_string_pretty(&check)?);
        }
        Command::Generate { prompt, system, id } => {
            let store = Arc::new(SledKvStore::open(config.storage.clone())?);
            let cache = ResponseCache::new(store.clone(), config.cache.clone());
            let orchestrator = Arc::new(RequestOrchestrator::new(
                config.orchestrator.clone(),
                store.clone(),
            ));
            let generator = Arc::new(HttpTextGenerator::new(config.generator.clone())?);
            let pipeline = GenerationPipeline::new(cache, orchestrator, generator);

            let identifiers: Vec<&str> = id.iter().map(String::as_str).collect();
            let response = pipeline.respond(&identifiers, &prompt, &system).await?;
            store.flush()?;
            println!("{}", response);
        }
        Command::Status => {
            let store = Arc::new(SledKvStore::open(config.storage.clone())?);
            let orchestrator = RequestOrchestrator::new(config.orchestrator.clone(), store);
            println!("{}", serde_json::to_string_pretty(&orchestrator.status())?);
        }
        Command::Unlock => {
            let store = Arc::new(SledKvStore::open(config.storage.clone())?);
            let orchestrator = RequestOrchestrator::new(config.orchestrator.clone(), store.clone());
            orchestrator.unlock();
            store.flush()?;
            println!("Request spacing suspended");
        }
        Command::Lock => {
            let store = Arc::new(SledKvStore::open(config.storage.clone())?);
            let orchestrator = RequestOrchestrator::new(config.orchestrator.clone(), store.clone());
            orchestrator.lock();
            store.flush()?;
            println!("Request spacing restored");
        }
        Command::CacheClear => {
            let store = Arc::new(SledKvStore::open(config.storage.clone())?);
            let cache = ResponseCache::new(store.clone(), config.cache.clone());
            let removed = cache.invalidate_all();
            store.flush()?;
            println!("Removed {} cache entries", removed);
        }
    }

    Ok(())
}

fn print_result(result: &whs_assist_core::search::SearchResult) {
    println!(
        "{:8.1}  {:<18}  {}",
        result.score,
        result.document.abbreviation,
        TextUtils::truncate(&result.document.title, 80)
    );
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.logging.level).map_err(|_| AssistError::Config {
        message: format!("Invalid log level: {}", config.logging.level),
    })?;

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .json()
                    .with_filter(filter),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_filter(filter),
            )
            .init();
    }

    Ok(())
}
