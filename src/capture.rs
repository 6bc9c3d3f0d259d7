//! Utterance assembly with silence-based turn detection
//!
//! Recognition backends finalize segments whenever they detect a short pause,
//! which is far too eager for an interview answer. The buffer therefore
//! accumulates finalized segments plus the latest interim segment and only
//! completes the utterance after a full silence window with no recognition
//! events. Time is passed in explicitly so tests can drive the clock.

use crate::asr::AsrEvent;
use std::time::{Duration, Instant};

/// Accumulates recognition events into one complete utterance
#[derive(Debug)]
pub struct UtteranceBuffer {
    final_text: String,
    interim: String,
    deadline: Option<Instant>,
    window: Duration,
    min_chars: usize,
}

impl UtteranceBuffer {
    pub fn new(window: Duration, min_chars: usize) -> Self {
        Self {
            final_text: String::new(),
            interim: String::new(),
            deadline: None,
            window,
            min_chars,
        }
    }

    /// Feed a recognition event, re-arming the silence deadline
    pub fn on_event(&mut self, event: &AsrEvent, now: Instant) {
        match event {
            AsrEvent::Partial(text) => {
                self.interim = text.clone();
            }
            AsrEvent::Final(result) => {
                self.final_text.push_str(&result.text);
                self.final_text.push(' ');
                self.interim.clear();
            }
        }
        if !self.final_text.is_empty() || !self.interim.is_empty() {
            self.deadline = Some(now + self.window);
        }
    }

    /// The instant at which silence completes the utterance, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// If the silence window has elapsed and the accumulated text is long
    /// enough, take the utterance. Returns None while the system is speaking
    /// so self-transcription never completes a turn.
    pub fn take_if_complete(&mut self, now: Instant, speaking: bool) -> Option<String> {
        let deadline = self.deadline?;
        if now < deadline || speaking {
            return None;
        }

        let text = self.combined();
        if text.len() > self.min_chars {
            self.reset();
            Some(text)
        } else {
            // Too short to be a real answer; keep listening
            self.reset();
            None
        }
    }

    /// Discard any partial utterance
    pub fn reset(&mut self) {
        self.final_text.clear();
        self.interim.clear();
        self.deadline = None;
    }

    fn combined(&self) -> String {
        format!("{}{}", self.final_text, self.interim)
            .trim()
            .to_string()
    }
}
