//! Scripted chat backend for testing
//!
//! Queues stream replies and completions ahead of time and records the
//! system prompts it was called with. Replies can be scripted to fail
//! before the stream opens or partway through it.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use voxprep::error::{VoxError, VoxResult};
use voxprep::llm::{ChatMessage, InterviewBackend};

enum ScriptedReply {
    /// Full reply streamed in small chunks
    Reply(String),
    /// stream_reply itself errors before any chunk
    CallError(String),
    /// Partial text streamed, then a mid-stream error item
    Interrupted { text: String, error: String },
}

#[derive(Default)]
pub struct MockBackend {
    stream_replies: Mutex<VecDeque<ScriptedReply>>,
    completions: Mutex<VecDeque<Result<String, String>>>,
    /// System prompts seen by stream_reply, in call order
    pub stream_prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, text: &str) {
        self.stream_replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Reply(text.to_string()));
    }

    pub fn push_reply_error(&self, message: &str) {
        self.stream_replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::CallError(message.to_string()));
    }

    pub fn push_reply_interrupted(&self, text: &str, error: &str) {
        self.stream_replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Interrupted {
                text: text.to_string(),
                error: error.to_string(),
            });
    }

    pub fn push_completion(&self, text: &str) {
        self.completions
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    pub fn push_completion_error(&self, message: &str) {
        self.completions
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn prompts_seen(&self) -> Vec<String> {
        self.stream_prompts.lock().unwrap().clone()
    }
}

async fn send_chunked(tx: &mpsc::Sender<VoxResult<String>>, text: &str) {
    // Deliver in small chunks to exercise streaming paths
    let chars: Vec<char> = text.chars().collect();
    for piece in chars.chunks(7) {
        let chunk: String = piece.iter().collect();
        if tx.send(Ok(chunk)).await.is_err() {
            return;
        }
    }
}

#[async_trait]
impl InterviewBackend for MockBackend {
    async fn stream_reply(
        &self,
        _history: &[ChatMessage],
        system_prompt: &str,
    ) -> VoxResult<mpsc::Receiver<VoxResult<String>>> {
        self.stream_prompts
            .lock()
            .unwrap()
            .push(system_prompt.to_string());

        let scripted = self
            .stream_replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| VoxError::Api("no scripted reply queued".into()))?;

        let (tx, rx) = mpsc::channel(8);
        match scripted {
            ScriptedReply::CallError(message) => return Err(VoxError::Api(message)),
            ScriptedReply::Reply(text) => {
                tokio::spawn(async move {
                    send_chunked(&tx, &text).await;
                });
            }
            ScriptedReply::Interrupted { text, error } => {
                tokio::spawn(async move {
                    send_chunked(&tx, &text).await;
                    let _ = tx.send(Err(VoxError::Api(error))).await;
                });
            }
        }
        Ok(rx)
    }

    async fn complete(&self, _messages: &[ChatMessage], _temperature: f32) -> VoxResult<String> {
        let scripted = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| VoxError::Api("no scripted completion queued".into()))?;
        scripted.map_err(VoxError::Api)
    }
}
