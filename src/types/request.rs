//! Generation request types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical request type; selects the model set in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    #[default]
    Text,
    Vision,
    Code,
    Search,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Vision => "vision",
            Self::Code => "code",
            Self::Search => "search",
        }
    }

    /// Lenient parse used at the API boundary. `"image"` is the client-facing
    /// name for vision requests; anything unrecognised is a text request.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "vision" | "image" => Self::Vision,
            "code" => Self::Code,
            "search" => Self::Search,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary media attached to a request (decoded image bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl MediaPart {
    pub fn new(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            data,
            media_type: media_type.into(),
        }
    }
}

/// A generation request as handed over by the caller.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub request_type: RequestType,
    pub media: Option<MediaPart>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            request_type: RequestType::Text,
            media: None,
        }
    }

    pub fn with_type(mut self, request_type: RequestType) -> Self {
        self.request_type = request_type;
        self
    }

    pub fn with_media(mut self, media: MediaPart) -> Self {
        self.media = Some(media);
        self
    }
}

/// Content part sent to the upstream provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData { media_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(s) => Some(s),
            Part::InlineData { .. } => None,
        }
    }
}

impl From<MediaPart> for Part {
    fn from(media: MediaPart) -> Self {
        Part::InlineData {
            media_type: media.media_type,
            data: media.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_lenient() {
        assert_eq!(RequestType::parse("image"), RequestType::Vision);
        assert_eq!(RequestType::parse(" CODE "), RequestType::Code);
        assert_eq!(RequestType::parse("search"), RequestType::Search);
        assert_eq!(RequestType::parse("poetry"), RequestType::Text);
    }
}
