//! 生成门面：在模型注册表与重试编排之上提供类型化的生成操作。
//!
//! # Generation Facade
//!
//! [`GenerationService`] is the one entry point the HTTP layer uses for model
//! calls. It is constructed explicitly with its provider, registry and retry
//! policy; there is no process-wide instance.
//!
//! | Operation | Model selection | Prompt |
//! |-----------|-----------------|--------|
//! | [`generate_text`](GenerationService::generate_text) | full model set for the type | caller's |
//! | [`generate_from_image`](GenerationService::generate_from_image) | vision model only | caller's + image |
//! | [`generate_code`](GenerationService::generate_code) | code model set | [`prompts::code_prompt`] |
//! | [`generate_search_answer`](GenerationService::generate_search_answer) | text model set | [`prompts::search_prompt`] |
//! | [`health_check`](GenerationService::health_check) | text model set | [`prompts::HEALTH_PROBE_PROMPT`] |
//!
//! ## Degraded results
//!
//! When every attempt ends on a missing model, the fallback model is asked
//! [`prompts::FALLBACK_PROBE_PROMPT`] instead of the caller's prompt. Such a
//! result is returned with [`Generation::degraded`](crate::types::Generation)
//! set; its text does not answer the request.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use whyred_backend::drivers::GeminiProvider;
//! use whyred_backend::facade::GenerationService;
//! use whyred_backend::registry::ModelRegistry;
//! use whyred_backend::resilience::RetryPolicy;
//! use whyred_backend::RequestType;
//!
//! # async fn demo() -> whyred_backend::Result<()> {
//! let provider = Arc::new(GeminiProvider::new("api-key")?);
//! let service = GenerationService::new(provider, ModelRegistry::default(), RetryPolicy::default(), true);
//! let answer = service.generate_text("Why is the sky blue?", RequestType::Text).await?;
//! println!("{} (via {})", answer.text, answer.model);
//! # Ok(())
//! # }
//! ```

pub mod prompts;
mod service;

pub use service::{GenerationService, ModelInfo};
