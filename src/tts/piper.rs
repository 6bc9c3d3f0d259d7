//! Piper TTS backend calling a local binary
//!
//! Voice models are fetched on demand from the rhasspy voice collection.
//! Initialization is shared: concurrent callers await the same in-flight
//! download instead of polling.

use super::TtsEngine;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

const VOICE_BASE_URL: &str = "https://huggingface.co/rhasspy/piper-voices/resolve/v1.0.0";

pub struct PiperEngine {
    voice: String,
    model_path: PathBuf,
    init: OnceCell<()>,
    active_sink: Arc<Mutex<Option<rodio::Sink>>>,
}

impl std::fmt::Debug for PiperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiperEngine")
            .field("voice", &self.voice)
            .field("model_path", &self.model_path)
            .field("init", &self.init)
            .finish_non_exhaustive()
    }
}

impl PiperEngine {
    pub fn new(config: &Config) -> Result<Self> {
        let data_dir = dirs::data_dir().unwrap_or_default().join("voxprep/voices");
        let model_path = data_dir.join(format!("{}.onnx", config.piper_voice));

        if !model_path.exists() {
            warn!("⚠️ Piper model not found at {}", model_path.display());
        }

        Ok(Self {
            voice: config.piper_voice.clone(),
            model_path,
            init: OnceCell::new(),
            active_sink: Arc::new(Mutex::new(None)),
        })
    }

    /// Download the voice model if missing, reporting percent progress.
    /// Concurrent callers share one pending download.
    pub async fn ensure_voice(&self, on_progress: impl Fn(u8) + Send + Sync) -> Result<()> {
        self.init
            .get_or_try_init(|| async {
                if self.model_path.exists() {
                    debug!("Piper voice already cached: {}", self.model_path.display());
                    return Ok(());
                }
                self.download_voice(&on_progress).await
            })
            .await?;
        Ok(())
    }

    async fn download_voice(&self, on_progress: &(impl Fn(u8) + Send + Sync)) -> Result<()> {
        let (model_url, config_url) = voice_urls(&self.voice)?;

        if let Some(parent) = self.model_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("⬇️ Downloading Piper voice '{}'", self.voice);

        // Voice config is small; fetch it first
        let config_json = reqwest::get(&config_url)
            .await
            .context("Failed to request voice config")?
            .error_for_status()
            .context("Voice config request rejected")?
            .text()
            .await?;
        std::fs::write(self.model_path.with_extension("onnx.json"), config_json)?;

        let response = reqwest::get(&model_url)
            .await
            .context("Failed to request voice model")?
            .error_for_status()
            .context("Voice model request rejected")?;

        let total_size = response.content_length().unwrap_or(0);
        let temp_path = self.model_path.with_extension("onnx.part");
        let mut file = std::fs::File::create(&temp_path)
            .with_context(|| format!("Cannot create {}", temp_path.display()))?;

        let mut downloaded: u64 = 0;
        let mut last_percent: u8 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error while downloading voice model")?;
            file.write_all(&chunk)
                .context("Failed to write voice model data")?;

            downloaded += chunk.len() as u64;
            if total_size > 0 {
                let percent = ((downloaded * 100) / total_size).min(100) as u8;
                if percent != last_percent {
                    last_percent = percent;
                    on_progress(percent);
                }
            }
        }

        std::fs::rename(&temp_path, &self.model_path).with_context(|| {
            format!(
                "Failed to rename {} -> {}",
                temp_path.display(),
                self.model_path.display()
            )
        })?;

        info!("✅ Piper voice ready at {}", self.model_path.display());
        Ok(())
    }
}

#[async_trait]
impl TtsEngine for PiperEngine {
    async fn speak(&self, text: &str) -> Result<()> {
        debug!("📢 Piper speaking: '{}'", text);

        if !self.model_path.exists() {
            return Err(anyhow::anyhow!(
                "Piper model file missing: {}",
                self.model_path.display()
            ));
        }

        // Clone values for move into blocking task
        let model_path = self.model_path.clone();
        let text_owned = text.to_string();
        let active_sink = self.active_sink.clone();

        // Subprocess + playback are blocking; run off the async threads
        tokio::task::spawn_blocking(move || -> Result<()> {
            let wav_path = std::env::temp_dir().join(format!(
                "vp_speech_{}.wav",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map_err(|e| anyhow::anyhow!("Time error: {}", e))?
                    .as_millis()
            ));

            let mut child = Command::new("piper-tts")
                .arg("-m")
                .arg(&model_path)
                .arg("-f")
                .arg(&wav_path)
                .stdin(Stdio::piped())
                .spawn()
                .map_err(|e| {
                    error!("❌ Failed to spawn piper-tts: {}", e);
                    anyhow::anyhow!("Failed to spawn piper-tts: {}", e)
                })?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text_owned.as_bytes())?;
                stdin.flush()?;
            }

            let status = child.wait()?;
            if !status.success() {
                return Err(anyhow::anyhow!("Piper failed with status {}", status));
            }

            if !wav_path.exists() {
                return Err(anyhow::anyhow!("Piper output file not created"));
            }

            let (_stream, stream_handle) = rodio::OutputStream::try_default()
                .map_err(|e| anyhow::anyhow!("No audio output device: {}", e))?;
            let file = std::fs::File::open(&wav_path)?;
            let source = rodio::Decoder::new(std::io::BufReader::new(file))
                .map_err(|e| anyhow::anyhow!("Cannot decode synthesized WAV: {}", e))?;
            let sink = rodio::Sink::try_new(&stream_handle)
                .map_err(|e| anyhow::anyhow!("Cannot open playback sink: {}", e))?;

            sink.append(source);
            // Expose the sink so cancel() can stop playback mid-sentence;
            // stop() empties the queue, which ends the wait loop below
            *active_sink.lock().unwrap() = Some(sink);

            loop {
                let done = match active_sink.lock().unwrap().as_ref() {
                    Some(sink) => sink.empty(),
                    None => true,
                };
                if done {
                    break;
                }
                std::thread::sleep(std::time::Duration::from_millis(30));
            }
            active_sink.lock().unwrap().take();

            let _ = std::fs::remove_file(&wav_path);
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))??;

        Ok(())
    }

    fn cancel(&self) {
        if let Ok(guard) = self.active_sink.lock() {
            if let Some(sink) = guard.as_ref() {
                sink.stop();
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.model_path.exists()
    }

    fn name(&self) -> &str {
        "piper"
    }
}

/// Resolve download URLs from a voice id like `en_US-hfc_female-medium`
fn voice_urls(voice: &str) -> Result<(String, String)> {
    let mut parts = voice.splitn(3, '-');
    let lang = parts.next().unwrap_or_default();
    let name = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("Invalid voice id: {voice}"))?;
    let quality = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("Invalid voice id: {voice}"))?;

    let short_lang = lang
        .split('_')
        .next()
        .ok_or_else(|| anyhow::anyhow!("Invalid voice language: {voice}"))?;

    let model = format!("{VOICE_BASE_URL}/{short_lang}/{lang}/{name}/{quality}/{voice}.onnx");
    let config = format!("{model}.json");
    Ok((model, config))
}
