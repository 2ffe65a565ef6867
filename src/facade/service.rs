use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::prompts;
use crate::drivers::{GenerationProvider, ModelConfig};
use crate::registry::{ModelRegistry, ModelSet};
use crate::resilience::retry::{Retried, RetryOrchestrator, RetryPolicy};
use crate::types::{ErrorKind, Generation, GenerationRequest, MediaPart, Part, RequestType};
use crate::{Error, Result};

/// Diagnostic view of the service configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub models: ModelRegistry,
    pub api_key_configured: bool,
    pub retry_config: RetryPolicy,
}

/// Typed generation operations on top of a provider, a registry and a retry
/// policy. Cheap to clone; holds no per-request state.
#[derive(Debug, Clone)]
pub struct GenerationService {
    provider: Arc<dyn GenerationProvider>,
    registry: Arc<ModelRegistry>,
    orchestrator: RetryOrchestrator,
    api_key_configured: bool,
}

impl GenerationService {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        registry: ModelRegistry,
        policy: RetryPolicy,
        api_key_configured: bool,
    ) -> Self {
        Self {
            provider,
            registry: Arc::new(registry),
            orchestrator: RetryOrchestrator::new(policy),
            api_key_configured,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.orchestrator.policy()
    }

    /// Dispatch on the request type the way the ask endpoint does.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        match request.request_type {
            RequestType::Vision => match &request.media {
                Some(media) => self.generate_from_image(&request.prompt, media).await,
                None => Err(Error::validation("Image data required for image analysis")),
            },
            RequestType::Code => self.generate_code(&request.prompt).await,
            RequestType::Search => self.generate_search_answer(&request.prompt).await,
            RequestType::Text => self.generate_text(&request.prompt, RequestType::Text).await,
        }
    }

    /// Walk the model set for `request_type` under the retry policy.
    ///
    /// A missing model or an empty answer moves on to the next identifier
    /// immediately. Any other failure goes back to the orchestrator, which
    /// backs off and resumes at the same model.
    pub async fn generate_text(&self, prompt: &str, request_type: RequestType) -> Result<Generation> {
        let models = self.registry.model_set(request_type);
        let parts = [Part::text(prompt)];
        let cursor = AtomicUsize::new(0);

        debug!(
            request_type = %request_type,
            models = models.models().len(),
            prompt_len = prompt.len(),
            "generating text"
        );

        let (models, parts, cursor) = (&models, &parts[..], &cursor);
        let out = self
            .orchestrator
            .execute_with_fallback(
                move || self.sweep(models, cursor, parts),
                move || self.fallback_probe(),
            )
            .await?;
        Ok(Self::finish(out))
    }

    /// One vision-model call under the retry policy; no model iteration.
    pub async fn generate_from_image(&self, prompt: &str, media: &MediaPart) -> Result<Generation> {
        let model = self.registry.primary_for(RequestType::Vision);
        let config = ModelConfig::vision(model);
        let parts = [Part::text(prompt), Part::from(media.clone())];

        info!(
            model,
            media_type = %media.media_type,
            bytes = media.data.len(),
            "generating from image"
        );

        let (config, parts) = (&config, &parts[..]);
        let out = self
            .orchestrator
            .execute_with_fallback(
                move || async move {
                    let text = self.provider.generate(config, parts).await?;
                    Ok::<_, Error>((config.model.clone(), non_empty(&config.model, text)?))
                },
                move || self.fallback_probe(),
            )
            .await?;
        Ok(Self::finish(out))
    }

    pub async fn generate_code(&self, prompt: &str) -> Result<Generation> {
        self.generate_text(&prompts::code_prompt(prompt), RequestType::Code)
            .await
    }

    pub async fn generate_search_answer(&self, query: &str) -> Result<Generation> {
        self.generate_text(&prompts::search_prompt(query), RequestType::Search)
            .await
    }

    /// True iff the probe answer contains the acknowledgement token. Errors
    /// count as unhealthy and are only logged.
    pub async fn health_check(&self) -> bool {
        match self
            .generate_text(prompts::HEALTH_PROBE_PROMPT, RequestType::Text)
            .await
        {
            Ok(generation) => {
                let healthy = prompts::contains_ack(&generation.text);
                if !healthy {
                    warn!(model = %generation.model, "health probe answered without acknowledgement");
                }
                healthy
            }
            Err(e) => {
                error!(error = %e, "health check failed");
                false
            }
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            models: (*self.registry).clone(),
            api_key_configured: self.api_key_configured,
            retry_config: self.orchestrator.policy().clone(),
        }
    }

    /// Try models from `cursor` onwards. Returns `(model, text)`.
    async fn sweep(&self, models: &ModelSet, cursor: &AtomicUsize, parts: &[Part]) -> Result<(String, String)> {
        let start = cursor.load(Ordering::Relaxed);
        let mut last_error = None;

        for (index, model) in models.iter().enumerate().skip(start) {
            cursor.store(index, Ordering::Relaxed);
            let config = ModelConfig::text(model);

            let result = match self.provider.generate(&config, parts).await {
                Ok(text) => non_empty(model, text),
                Err(e) => Err(e),
            };

            match result {
                Ok(text) => {
                    info!(model, response_len = text.len(), "generation succeeded");
                    return Ok((model.to_string(), text));
                }
                Err(e) => match e.kind() {
                    ErrorKind::ModelUnavailable | ErrorKind::EmptyResponse => {
                        warn!(model, error_kind = ?e.kind(), error = %e, "model failed, trying next");
                        last_error = Some(e);
                    }
                    _ => return Err(e),
                },
            }
        }

        // Everything from `start` failed without a transient error.
        Err(last_error.unwrap_or_else(|| Error::EmptyResponse {
            model: models.fallback().to_string(),
        }))
    }

    async fn fallback_probe(&self) -> Result<(String, String)> {
        let model = self.registry.fallback_model();
        let config = ModelConfig::probe(model);
        let text = self
            .provider
            .generate(&config, &[Part::text(prompts::FALLBACK_PROBE_PROMPT)])
            .await?;
        Ok((model.to_string(), non_empty(model, text)?))
    }

    fn finish(out: Retried<(String, String)>) -> Generation {
        let (model, text) = out.value;
        Generation {
            text,
            model,
            attempts: out.attempts,
            degraded: out.via_fallback,
        }
    }
}

fn non_empty(model: &str, text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(Error::EmptyResponse {
            model: model.to_string(),
        })
    } else {
        Ok(text)
    }
}
