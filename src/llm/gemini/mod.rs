//! Gemini `generateContent` adapter.
//!
//! Messages are translated into prompt parts, sent as one user turn, and the
//! reply is reduced to one optional text per candidate.

pub mod client;
pub mod extract;
pub mod service;
pub mod translate;
pub mod types;

pub use client::GeminiHttpClient;
pub use extract::extract_candidate_texts;
pub use service::{GeminiService, GenerationDefaults};
pub use translate::{decode_data_url, translate, Blob, PromptPart};
