//! 类型系统模块：定义生成请求、媒体片段与生成结果等核心数据类型。
//!
//! # Types Module
//!
//! Request-scoped data passed between the HTTP layer, the generation facade
//! and the upstream provider. Nothing here is persisted by the core.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestType`] | Logical request type selecting a model set |
//! | [`GenerationRequest`] | Prompt plus optional media payload |
//! | [`Part`] | One content part sent upstream (text or inline media) |
//! | [`Generation`] | Successful result with the model that served it |
//! | [`GenerationOutcome`] | Serializable success/failure envelope |
//! | [`ErrorKind`] | Coarse failure kind driving retry decisions |

pub mod outcome;
pub mod request;

pub use outcome::{ErrorKind, Generation, GenerationOutcome};
pub use request::{GenerationRequest, MediaPart, Part, RequestType};
