//! LLM Integration
//!
//! Chat completion client plus the structured-extraction helpers built on
//! top of it. The `InterviewBackend` trait is the seam the session controller
//! and quiz/scorer code talk through, so tests can script the model.

pub mod extract;
pub mod groq;

use crate::error::VoxResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use groq::GroqClient;

/// Message role in a chat conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the running conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Seam between the session/quiz/scorer code and the hosted model
#[async_trait]
pub trait InterviewBackend: Send + Sync {
    /// Stream a reply to the running conversation under the given system
    /// prompt. The returned channel yields incremental text chunks; an `Err`
    /// item means the stream failed mid-way and terminates it, as distinct
    /// from the channel closing at normal stream end. A retry requires a
    /// fresh call.
    async fn stream_reply(
        &self,
        history: &[ChatMessage],
        system_prompt: &str,
    ) -> VoxResult<mpsc::Receiver<VoxResult<String>>>;

    /// Single-shot completion over explicit messages (used for scoring,
    /// quiz generation and résumé extraction).
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> VoxResult<String>;
}
