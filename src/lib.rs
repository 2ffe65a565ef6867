//! # whyred-backend
//!
//! Whyred AI 助手的 HTTP 后端：带重试与模型回退的 Gemini 生成、网页搜索问答与聊天历史。
//!
//! HTTP backend for the Whyred AI assistant. Prompts are forwarded to the
//! Gemini generation API, the Google Custom Search API and an identity
//! service; the one piece of real engineering is the model-selection and
//! retry wrapper around the generation calls.
//!
//! ## Core
//!
//! - **Model Registry**: request type → ordered [`registry::ModelSet`]
//!   (primary, global alternates, fallback last)
//! - **Retry Orchestrator**: bounded attempts, exponential backoff with
//!   jitter, and one fallback probe when the loop ends on a missing model
//! - **Generation Facade**: [`GenerationService`] with text, image, code,
//!   search-answer, health-check and model-info operations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use whyred_backend::drivers::GeminiProvider;
//! use whyred_backend::registry::ModelRegistry;
//! use whyred_backend::resilience::RetryPolicy;
//! use whyred_backend::{GenerationService, RequestType};
//!
//! #[tokio::main]
//! async fn main() -> whyred_backend::Result<()> {
//!     let provider = Arc::new(GeminiProvider::new(std::env::var("GEMINI_API_KEY").unwrap_or_default())?);
//!     let service = GenerationService::new(provider, ModelRegistry::default(), RetryPolicy::default(), true);
//!
//!     let code = service.generate_code("a binary search over a sorted slice").await?;
//!     println!("{}", code.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`registry`] | Model identifiers per request type |
//! | [`resilience`] | Retry orchestration and per-client rate limiting |
//! | [`facade`] | Typed generation operations and prompt templates |
//! | [`drivers`] | Upstream generation provider trait and the Gemini driver |
//! | [`search`] | Google Custom Search client |
//! | [`auth`] | Bearer token verification |
//! | [`store`] | Chat history and user profile persistence |
//! | [`server`] | axum routes, middleware and server startup |
//! | [`config`] | Environment-driven configuration |
//! | [`types`] | Requests, content parts and generation results |

pub mod auth;
pub mod config;
pub mod drivers;
pub mod error_code;
pub mod facade;
pub mod registry;
pub mod resilience;
pub mod search;
pub mod server;
pub mod store;
pub mod transport;
pub mod types;

pub use facade::{GenerationService, ModelInfo};
pub use registry::{ModelRegistry, ModelSet};
pub use resilience::{RetryOrchestrator, RetryPolicy};
pub use types::{ErrorKind, Generation, GenerationOutcome, GenerationRequest, MediaPart, Part, RequestType};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
