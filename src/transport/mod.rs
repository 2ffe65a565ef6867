//! HTTP transport shared by the upstream clients (Gemini, search, identity).

pub mod http;

pub use http::{HttpClientConfig, TransportError, API_KEY_HEADER};
