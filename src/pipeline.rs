//! # Generation Pipeline Module
//!
//! ## Purpose
//! Composes the response cache, the request orchestrator and the generation
//! backend into the single operation callers actually want: a cached,
//! rate-gated generation request. The cache is consulted before the
//! orchestrator is involved, so hits cost neither a rate-gate slot nor a
//! network call.
//!
//! ## Input/Output Specification
//! - **Input**: Request identifiers, prompt and system prompt
//! - **Output**: Generated (or cached) response text
//! - **Flow**: cache lookup → rate gate → generation with retry → cache write
//!
//! ## Key Features
//! - Cache hits bypass the orchestrator entirely
//! - Generation failures are never cached

use crate::cache::ResponseCache;
use crate::errors::Result;
use crate::generator::TextGenerator;
use crate::orchestrator::RequestOrchestrator;
use std::sync::Arc;

/// Cached, rate-gated front of the generation backend
pub struct GenerationPipeline {
    cache: ResponseCache,
    orchestrator: Arc<RequestOrchestrator>,
    generator: Arc<dyn TextGenerator>,
}

impl GenerationPipeline {
    /// Compose a pipeline from its three stages
    pub fn new(
        cache: ResponseCache,
        orchestrator: Arc<RequestOrchestrator>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            cache,
            orchestrator,
            generator,
        }
    }

    /// Produce a response for the request, serving from cache when possible.
    ///
    /// On a miss the request passes through the orchestrator's rate gate,
    /// concurrency ceiling and retry loop; the settled response is written
    /// back to the cache before it is returned. Errors propagate to the
    /// caller and leave no cache entry behind.
    pub async fn respond(
        &self,
        identifiers: &[&str],
        prompt: &str,
        system_prompt: &str,
    ) -> Result<String> {
        let key = self.cache.make_key(identifiers, prompt);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Serving cached response for '{}'", key);
            return Ok(cached);
        }

        let generator = self.generator.clone();
        let prompt = prompt.to_string();
        let system_prompt = system_prompt.to_string();
        let response = self
            .orchestrator
            .execute(|| {
                let generator = generator.clone();
                let prompt = prompt.clone();
                let system_prompt = system_prompt.clone();
                async move { generator.generate(&prompt, &system_prompt).await }
            })
            .await?;

        self.cache.set(&key, &response);
        Ok(response)
    }
}
