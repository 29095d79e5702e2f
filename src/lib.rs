//! Gemini chat adapter - translates role-tagged chat messages into Gemini
//! `generateContent` requests and normalizes the reply.
//!
//! The adapter returns one optional text per candidate plus a rough,
//! word-count based cost estimate.

pub mod config;
pub mod error;
pub mod llm;

pub use config::Config;
pub use error::{Error, Result};
