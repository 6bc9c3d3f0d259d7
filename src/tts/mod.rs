//! TTS (Text-to-Speech) Module
//!
//! A layered dispatcher over multiple synthesis backends: the high-quality
//! Piper engine is tried first and the always-available system engine catches
//! everything else. `speak` resolves exactly once per call, after audible
//! playback ends, on success and failure paths alike.

use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub mod piper;
pub mod system;

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync + std::fmt::Debug {
    /// Speak the given text; resolves after playback completes
    async fn speak(&self, text: &str) -> Result<()>;

    /// Stop any in-flight playback
    fn cancel(&self);

    /// Whether the engine is initialized and usable right now
    fn is_ready(&self) -> bool {
        true
    }

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Layered dispatcher: primary engine with transparent fallback
#[derive(Debug)]
pub struct TtsDispatcher {
    primary: Option<Arc<dyn TtsEngine>>,
    fallback: Arc<dyn TtsEngine>,
}

impl TtsDispatcher {
    pub fn new(primary: Option<Arc<dyn TtsEngine>>, fallback: Arc<dyn TtsEngine>) -> Self {
        Self { primary, fallback }
    }

    /// Speak text, falling back on primary failure. Always resolves: fallback
    /// errors are logged and swallowed so a reply can never hang the session.
    /// Callers serialize invocations; overlapping calls are not deduplicated.
    pub async fn speak(&self, text: &str) -> Result<()> {
        let clean = sanitize(text);
        if clean.is_empty() {
            return Ok(());
        }

        if let Some(primary) = &self.primary {
            if primary.is_ready() {
                match primary.speak(&clean).await {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        warn!("{} TTS failed, falling back: {}", primary.name(), e);
                    }
                }
            }
        }

        if let Err(e) = self.fallback.speak(&clean).await {
            warn!("{} TTS failed: {}", self.fallback.name(), e);
        }
        Ok(())
    }

    /// Cancel in-flight playback on every tier
    pub fn cancel(&self) {
        if let Some(primary) = &self.primary {
            primary.cancel();
        }
        self.fallback.cancel();
    }
}

/// Strip markdown emphasis markers before synthesis
pub fn sanitize(text: &str) -> String {
    text.replace(['*', '#', '`'], "").trim().to_string()
}

/// Build the configured dispatcher: Piper primary when available, system
/// fallback always present.
pub async fn create_dispatcher(config: &Config) -> Result<TtsDispatcher> {
    info!("🛠️ Creating TTS dispatcher (primary: {})", config.tts_engine);

    let fallback: Arc<dyn TtsEngine> = Arc::new(system::SystemEngine::new(
        config.preferred_system_voice.clone(),
        config.locale.clone(),
    ));

    let primary: Option<Arc<dyn TtsEngine>> = match config.tts_engine.as_str() {
        "piper" => {
            let engine = piper::PiperEngine::new(config)?;
            if config.piper_auto_download {
                if let Err(e) = engine
                    .ensure_voice(|percent| info!("⬇️ Voice model download: {percent}%"))
                    .await
                {
                    warn!("Piper voice unavailable, using system TTS only: {e}");
                }
            }
            Some(Arc::new(engine) as Arc<dyn TtsEngine>)
        }
        "system" => None,
        other => {
            warn!("Unknown TTS engine '{other}', using system TTS only");
            None
        }
    };

    Ok(TtsDispatcher::new(primary, fallback))
}
