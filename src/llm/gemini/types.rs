//! Gemini `generateContent` payload types.
//!
//! Every level of the response may be missing; a partially populated reply
//! still decodes and the extractor degrades per candidate.

use serde::{Deserialize, Deserializer, Serialize};

/// Request content container.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

/// Untagged union of text and inline media request parts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 inline payload used for image inputs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// Top-level `generateContent` response envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Option<Candidate>>>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    #[serde(default)]
    pub candidates_token_count: Option<u64>,
    #[serde(default)]
    pub total_token_count: Option<u64>,
}

/// What a response part carries, decided once when decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum PartKind {
    /// User-visible text.
    Text(String),
    /// Internal reasoning text, never shown to callers.
    Thought(String),
    /// No text at all (function calls, media, ...).
    Other,
}

/// A decoded response part.
///
/// `unsupported_fields` lists every non-null field besides `text` and
/// `thought`, in the order the provider sent them, so callers can report
/// content they dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePart {
    pub kind: PartKind,
    pub unsupported_fields: Vec<String>,
}

impl ResponsePart {
    pub fn from_fields(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        let thought = fields
            .get("thought")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        let kind = match fields.get("text").and_then(serde_json::Value::as_str) {
            Some(text) if thought => PartKind::Thought(text.to_string()),
            Some(text) => PartKind::Text(text.to_string()),
            None => PartKind::Other,
        };

        let unsupported_fields = fields
            .into_iter()
            .filter(|(name, value)| !value.is_null() && name != "text" && name != "thought")
            .map(|(name, _)| name)
            .collect();

        Self {
            kind,
            unsupported_fields,
        }
    }
}

impl<'de> Deserialize<'de> for ResponsePart {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields: serde_json::Map<String, serde_json::Value> =
            serde_json::Map::deserialize(deserializer)?;
        Ok(Self::from_fields(fields))
    }
}
