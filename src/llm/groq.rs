//! Groq chat completion client (OpenAI-compatible wire format)

use super::{ChatMessage, InterviewBackend, Role};
use crate::config::Config;
use crate::error::{VoxError, VoxResult};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::{debug, warn};

const MAX_REPLY_TOKENS: u32 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

impl GroqClient {
    pub fn new(config: &Config) -> VoxResult<Self> {
        if config.groq_api_key.is_empty() {
            return Err(VoxError::Config(
                "Groq API key missing; set GROQ_API_KEY or the groq_api_key config field".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: config.groq_api_url.trim_end_matches('/').to_string(),
            api_key: config.groq_api_key.clone(),
            model: config.chat_model.clone(),
            temperature: config.chat_temperature,
        })
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        stream: bool,
    ) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": MAX_REPLY_TOKENS,
            "stream": stream,
        })
    }

    async fn send_completion(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> VoxResult<String> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages, temperature, false))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxError::Api(format!("chat completion {status}: {body}")));
        }

        let body: CompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VoxError::Api("chat completion returned no content".into()))
    }
}

#[async_trait]
impl InterviewBackend for GroqClient {
    async fn stream_reply(
        &self,
        history: &[ChatMessage],
        system_prompt: &str,
    ) -> VoxResult<mpsc::Receiver<VoxResult<String>>> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(
            history
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned(),
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&messages, self.temperature, true))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxError::Api(format!("chat stream {status}: {body}")));
        }

        let (tx, rx) = mpsc::channel::<VoxResult<String>>(32);

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut line_buf = String::new();

            'outer: while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        // Surface the failure so the caller can tell a broken
                        // stream from a finished one
                        warn!("chat stream interrupted: {e}");
                        let _ = tx
                            .send(Err(VoxError::Api(format!("chat stream interrupted: {e}"))))
                            .await;
                        break;
                    }
                };
                line_buf.push_str(&String::from_utf8_lossy(&chunk));

                // SSE frames are newline-delimited; keep the trailing partial
                while let Some(pos) = line_buf.find('\n') {
                    let line = line_buf[..pos].trim().to_string();
                    line_buf.drain(..=pos);

                    match parse_sse_line(&line) {
                        SseLine::Chunk(text) => {
                            if tx.send(Ok(text)).await.is_err() {
                                break 'outer; // receiver gone, stop reading
                            }
                        }
                        SseLine::Done => break 'outer,
                        SseLine::Skip => {}
                    }
                }
            }
            // tx drops here; the receiver sees end of stream
        });

        Ok(rx)
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> VoxResult<String> {
        // One retry for transient failures; malformed output is the caller's
        // problem, not a reason to re-request
        let strategy = FixedInterval::from_millis(500).take(1);
        Retry::spawn(strategy, || async {
            self.send_completion(messages, temperature).await
        })
        .await
    }
}

/// Parsed form of one SSE line
#[derive(Debug, PartialEq)]
enum SseLine {
    Chunk(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(payload) = line.strip_prefix("data: ") else {
        return SseLine::Skip;
    };

    if payload.trim() == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => {
            let text = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .unwrap_or_default();
            if text.is_empty() {
                SseLine::Skip
            } else {
                SseLine::Chunk(text)
            }
        }
        Err(e) => {
            debug!("skipping unparseable stream line: {e}");
            SseLine::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_uses_configured_temperature() {
        let mut config = Config::default();
        config.groq_api_key = "test-key".to_string();
        config.chat_temperature = 0.25;

        let client = GroqClient::new(&config).unwrap();
        assert_eq!(client.temperature, 0.25);

        let body = client.request_body(&[], client.temperature, true);
        assert_eq!(body["temperature"], 0.25);
    }

    #[test]
    fn test_parse_sse_chunk() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(line), SseLine::Chunk("Hel".to_string()));
    }

    #[test]
    fn test_parse_sse_done() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
    }

    #[test]
    fn test_parse_sse_skips_noise() {
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(parse_sse_line(": keepalive"), SseLine::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{}}]}"#),
            SseLine::Skip
        );
    }
}
