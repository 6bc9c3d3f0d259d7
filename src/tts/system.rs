//! System fallback TTS engine
//!
//! Shells out to speech-dispatcher (`spd-say`) or `espeak-ng`. Always
//! available on desktop Linux, lower quality than Piper. `spd-say -w` blocks
//! until playback finishes, which the dispatcher contract requires.

use super::TtsEngine;
use anyhow::Result;
use async_trait::async_trait;
use std::process::Command;
use tracing::debug;

#[derive(Debug)]
pub struct SystemEngine {
    preferred_voice: String,
    locale: String,
}

impl SystemEngine {
    pub fn new(preferred_voice: String, locale: String) -> Self {
        Self {
            preferred_voice,
            locale,
        }
    }

    /// Voice selection order: explicit preference, then the operating locale,
    /// else whatever the synthesizer defaults to.
    fn spd_args(&self, text: &str) -> Vec<String> {
        let mut args = vec!["-w".to_string()];
        if !self.preferred_voice.is_empty() {
            args.push("-y".to_string());
            args.push(self.preferred_voice.clone());
        } else if !self.locale.is_empty() {
            args.push("-l".to_string());
            let lang = self.locale.split('-').next().unwrap_or("en").to_string();
            args.push(lang);
        }
        args.push(text.to_string());
        args
    }
}

#[async_trait]
impl TtsEngine for SystemEngine {
    async fn speak(&self, text: &str) -> Result<()> {
        debug!("System speaking: {}", text);

        let args = self.spd_args(text);
        let text_owned = text.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            // -w waits for end of speech so the promise resolves after playback
            if let Ok(status) = Command::new("spd-say").args(&args).status() {
                if status.success() {
                    return Ok(());
                }
            }

            if let Ok(status) = Command::new("espeak-ng").arg(&text_owned).status() {
                if status.success() {
                    return Ok(());
                }
            }

            Err(anyhow::anyhow!(
                "No system TTS command found (tried spd-say, espeak-ng)"
            ))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    fn cancel(&self) {
        // spd-say -C cancels all queued speech-dispatcher messages
        let _ = Command::new("spd-say").arg("-C").status();
    }

    fn name(&self) -> &str {
        "system"
    }
}
