//! Provider-neutral chat messages as sent by agents.

use serde::{Deserialize, Serialize};

/// Leading bytes of the image formats Gemini accepts inline.
const IMAGE_SIGNATURES: &[(&[u8], &str)] = &[
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"\x89PNG", "image/png"),
    (b"GIF8", "image/gif"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: ImageUrl,
    },
    /// Any part type this adapter does not translate.
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }

    /// Wrap raw image bytes (a screenshot, a file) as a data-URL image part.
    ///
    /// Unrecognized data is labelled `image/png`.
    pub fn image_from_bytes(bytes: &[u8]) -> Self {
        let mime_type = sniff_image_type(bytes).unwrap_or_else(|| {
            tracing::warn!(
                "Unrecognized image data ({} bytes), sending it as image/png",
                bytes.len()
            );
            "image/png"
        });
        Self::image_url(encode_data_url(mime_type, bytes))
    }
}

fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    // RIFF container with the WEBP form type at offset 8
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    IMAGE_SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, mime_type)| *mime_type)
}

/// Plain string (system messages) or ordered parts (everything else).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }

    pub fn assistant(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Parts(parts),
        }
    }

    /// Whitespace-separated word count of the message's text.
    ///
    /// Images contribute nothing. Used as a rough token estimate.
    pub fn word_count(&self) -> usize {
        match &self.content {
            MessageContent::Text(text) => text.split_whitespace().count(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.split_whitespace().count(),
                    _ => 0,
                })
                .sum(),
        }
    }
}

/// One bare message or an ordered conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Messages {
    Many(Vec<ChatMessage>),
    One(ChatMessage),
}

impl Messages {
    pub fn as_slice(&self) -> &[ChatMessage] {
        match self {
            Messages::One(message) => std::slice::from_ref(message),
            Messages::Many(messages) => messages,
        }
    }
}

impl From<ChatMessage> for Messages {
    fn from(message: ChatMessage) -> Self {
        Messages::One(message)
    }
}

impl From<Vec<ChatMessage>> for Messages {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Messages::Many(messages)
    }
}

/// Encode bytes as `data:<mime>;base64,<payload>`.
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    use base64::Engine as _;
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
