//! Chat messages to Gemini prompt parts.

use super::types::{InlineData, Part};
use crate::llm::message::{ChatMessage, ContentPart, MessageContent, Role};
use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

const SYSTEM_PREFIX: &str = "Your general instruction: ";

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(?P<mime_type>image/.+?);base64,(?P<data>.+)")
        .expect("data URL pattern is valid")
});

/// Decoded inline image.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One translated prompt element.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    Image(Blob),
}

impl From<PromptPart> for Part {
    fn from(part: PromptPart) -> Self {
        use base64::Engine as _;
        match part {
            PromptPart::Text(text) => Part::Text { text },
            PromptPart::Image(blob) => Part::InlineData {
                inline_data: InlineData {
                    mime_type: blob.mime_type,
                    data: base64::engine::general_purpose::STANDARD.encode(&blob.data),
                },
            },
        }
    }
}

/// Flatten messages into prompt parts, in message then part order.
///
/// System messages become a single prefixed instruction. Part types other
/// than text and image are skipped.
pub fn translate(messages: &[ChatMessage]) -> Result<Vec<PromptPart>> {
    let mut prompt = Vec::new();

    for message in messages {
        match (message.role, &message.content) {
            (Role::System, content) => {
                prompt.push(PromptPart::Text(format!(
                    "{}{}",
                    SYSTEM_PREFIX,
                    system_text(content)
                )));
            }
            (_, MessageContent::Text(text)) => prompt.push(PromptPart::Text(text.clone())),
            (_, MessageContent::Parts(parts)) => {
                for part in parts {
                    match part {
                        ContentPart::Text { text } => prompt.push(PromptPart::Text(text.clone())),
                        ContentPart::ImageUrl { image_url } => {
                            prompt.push(PromptPart::Image(decode_data_url(&image_url.url)?))
                        }
                        ContentPart::Unsupported => {}
                    }
                }
            }
        }
    }

    Ok(prompt)
}

fn system_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Decode `data:image/<kind>;base64,<payload>` into its MIME type and bytes.
///
/// The payload must be canonical standard base64. Embedded whitespace or other
/// non-alphabet characters are rejected as `InvalidFormat`, never skipped.
pub fn decode_data_url(url: &str) -> Result<Blob> {
    let Some(captures) = DATA_URL.captures(url) else {
        tracing::error!("Could not parse the data URL");
        return Err(Error::InvalidFormat(
            "Could not parse the data URL: expected data:image/<type>;base64,<payload>"
                .to_string(),
        ));
    };

    use base64::Engine as _;
    let data = base64::engine::general_purpose::STANDARD
        .decode(&captures["data"])
        .map_err(|e| Error::InvalidFormat(format!("Invalid base64 image payload: {}", e)))?;

    Ok(Blob {
        mime_type: captures["mime_type"].to_string(),
        data,
    })
}
