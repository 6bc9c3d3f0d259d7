//! Vosk recognition backend

use crate::config::Config;
use anyhow::{Context, Result};
use tracing::{debug, info};
use vosk::{Model, Recognizer};

const SAMPLE_RATE: f32 = 16000.0;

/// Vosk-based ASR engine
pub struct VoskAsr {
    recognizer: Recognizer,
    paused: bool,
}

impl VoskAsr {
    /// Create a new Vosk ASR instance for the configured locale model
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = std::path::PathBuf::from(&config.vosk_model_path);

        if !model_path.exists() {
            return Err(anyhow::anyhow!(
                "Vosk model not found at {} (download a model for locale {})",
                model_path.display(),
                config.locale
            ));
        }

        info!("Loading Vosk model from: {}", model_path.display());

        let model_str = model_path.to_str().ok_or_else(|| {
            anyhow::anyhow!(
                "Vosk model path is not valid UTF-8: {}",
                model_path.display()
            )
        })?;

        let model = Model::new(model_str).context("Failed to load Vosk model")?;
        let recognizer =
            Recognizer::new(&model, SAMPLE_RATE).context("Failed to create Vosk recognizer")?;

        Ok(Self {
            recognizer,
            paused: false,
        })
    }
}

impl super::AsrEngine for VoskAsr {
    fn process(&mut self, samples: &[i16]) -> Result<Option<super::AsrEvent>> {
        // Discard audio when paused
        if self.paused {
            return Ok(None);
        }

        let state = self.recognizer.accept_waveform(samples);

        match state {
            vosk::DecodingState::Finalized => {
                let result = self.recognizer.final_result();
                if let Some(single) = result.single() {
                    if let Some(text) = extract_text(single.text) {
                        // Average word confidence
                        let avg_confidence = if single.result.is_empty() {
                            1.0f32
                        } else {
                            let sum: f32 = single.result.iter().map(|w| w.conf).sum();
                            sum / single.result.len() as f32
                        };

                        if avg_confidence < super::MIN_CONFIDENCE {
                            info!(
                                "🔇 Rejecting low-confidence ASR ({:.2}): '{}'",
                                avg_confidence, text
                            );
                            return Ok(None);
                        }

                        return Ok(Some(super::AsrEvent::Final(super::AsrResult {
                            text,
                            confidence: avg_confidence,
                        })));
                    }
                }
            }
            vosk::DecodingState::Running => {
                let partial = self.recognizer.partial_result().partial.to_string();
                if !partial.trim().is_empty() {
                    return Ok(Some(super::AsrEvent::Partial(partial)));
                }
            }
            vosk::DecodingState::Failed => {
                debug!("Decoding failed for this chunk");
            }
        }

        Ok(None)
    }

    fn reset(&mut self) {
        self.recognizer.reset();
    }

    fn pause(&mut self) {
        self.paused = true;
        self.recognizer.reset(); // Clear any partial recognition
        debug!("🔇 ASR paused");
    }

    fn resume(&mut self) {
        self.paused = false;
        self.recognizer.reset();
        debug!("🔊 ASR resumed");
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Extract text from Vosk result, filtering empty results
fn extract_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text() {
        assert_eq!(extract_text(""), None);
        assert_eq!(extract_text("  "), None);
        assert_eq!(extract_text("hello"), Some("hello".to_string()));
        assert_eq!(extract_text("  hello  "), Some("hello".to_string()));
    }
}
