//! ASR (Automatic Speech Recognition) Module
//!
//! Recognition backends emit interim and final events; the capture layer
//! turns them into complete utterances via silence detection.

pub mod vosk;

use crate::config::Config;
use anyhow::Result;

pub use vosk::VoskAsr;

/// Final recognition result with confidence score
#[derive(Debug, Clone)]
pub struct AsrResult {
    pub text: String,
    pub confidence: f32,
}

/// Recognition event: a still-changing interim segment or a finalized one
#[derive(Debug, Clone)]
pub enum AsrEvent {
    Partial(String),
    Final(AsrResult),
}

/// Minimum confidence threshold (below this, final results are discarded)
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Trait for ASR engines
pub trait AsrEngine: Send {
    /// Process audio samples and return a recognition event when available.
    /// Final results below MIN_CONFIDENCE are filtered out internally.
    fn process(&mut self, samples: &[i16]) -> Result<Option<AsrEvent>>;

    /// Reset the recognizer state
    fn reset(&mut self);

    /// Pause recognition (discard incoming audio)
    fn pause(&mut self) {}

    /// Resume recognition after pause
    fn resume(&mut self) {}

    /// Check if currently paused
    fn is_paused(&self) -> bool {
        false
    }
}

/// Factory to create the configured ASR engine
pub fn create_engine(config: &Config) -> Result<Box<dyn AsrEngine>> {
    match config.asr_engine.as_str() {
        "vosk" => Ok(Box::new(vosk::VoskAsr::new(config)?)),
        other => Err(anyhow::anyhow!(
            "Unknown ASR engine '{other}' (only 'vosk' is supported)"
        )),
    }
}
