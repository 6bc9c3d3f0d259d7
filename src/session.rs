//! Interview session turn controller
//!
//! Drives the voice loop: capture an answer, stream the interviewer's reply,
//! narrate it sentence by sentence while the rest is still generating, then
//! hand the microphone back. A shared speaking flag keeps synthesized speech
//! from completing a user turn, and every exit path releases the capture
//! device and cancels playback before scoring runs.

use crate::asr::{self, AsrEngine};
use crate::audio::AudioCapture;
use crate::capture::UtteranceBuffer;
use crate::config::Config;
use crate::error::{VoxError, VoxResult};
use crate::llm::{ChatMessage, InterviewBackend};
use crate::prompts::{self, Persona};
use crate::scorer::{self, InterviewAnalysis};
use crate::store::{AppStore, InterviewResult};
use crate::tts::TtsDispatcher;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Emit a sentence early on ',' or ';' once this much text has accumulated
const SOFT_BREAK_CHARS: usize = 50;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Listening,
    Thinking,
    Speaking,
    Ending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Ai,
    User,
}

/// One line of the visible transcript. AI entries grow in place while the
/// reply streams.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptEntry {
    fn ai(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            text: text.into(),
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }
}

/// Result of one user turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Keep listening for the next answer
    Continue,
    /// The closing turn was delivered; the session is over
    Finished,
}

/// Splits streamed reply text into speakable sentences. Terminal punctuation
/// always ends a sentence; a comma or semicolon only does once enough text
/// has accumulated, so narration starts before the stream finishes without
/// chopping short clauses apart.
#[derive(Debug, Default)]
pub struct SentenceSplitter {
    buf: String,
}

impl SentenceSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a stream chunk, returning any sentences it completed
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        let mut out = Vec::new();
        for ch in chunk.chars() {
            self.buf.push(ch);
            let terminal = matches!(ch, '.' | '!' | '?');
            let soft = matches!(ch, ',' | ';') && self.buf.len() > SOFT_BREAK_CHARS;
            if terminal || soft {
                let sentence = self.buf.trim().to_string();
                self.buf.clear();
                if !sentence.is_empty() {
                    out.push(sentence);
                }
            }
        }
        out
    }

    /// Take whatever is left once the stream ends
    pub fn flush(&mut self) -> Option<String> {
        let rest = self.buf.trim().to_string();
        self.buf.clear();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

/// One running interview: conversation state, quota tracking and narration
pub struct InterviewSession {
    backend: Arc<dyn InterviewBackend>,
    tts: Arc<TtsDispatcher>,
    speaking: Arc<AtomicBool>,
    persona: Persona,
    role: String,
    company: String,
    total_questions: usize,
    questions_asked: usize,
    state: SessionState,
    history: Vec<ChatMessage>,
    transcript: Vec<TranscriptEntry>,
}

impl InterviewSession {
    pub fn new(
        backend: Arc<dyn InterviewBackend>,
        tts: Arc<TtsDispatcher>,
        persona: Persona,
        role: impl Into<String>,
        company: impl Into<String>,
        total_questions: usize,
    ) -> Self {
        Self {
            backend,
            tts,
            speaking: Arc::new(AtomicBool::new(false)),
            persona,
            role: role.into(),
            company: company.into(),
            total_questions,
            questions_asked: 0,
            state: SessionState::Idle,
            history: Vec::new(),
            transcript: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn questions_asked(&self) -> usize {
        self.questions_asked
    }

    /// Shared flag read by the capture loop: true while narration plays
    pub fn speaking_flag(&self) -> Arc<AtomicBool> {
        self.speaking.clone()
    }

    /// Deliver the scripted opener; it asks the first question, so the quota
    /// starts at one.
    pub async fn begin(&mut self, first_name: &str) -> VoxResult<()> {
        self.state = SessionState::Connecting;
        let text = prompts::intro(
            first_name,
            self.persona.label,
            &self.company,
            &self.role,
            self.total_questions,
        );

        self.transcript.push(TranscriptEntry::ai(text.clone()));
        self.history.push(ChatMessage::assistant(text.clone()));

        self.state = SessionState::Speaking;
        self.speaking.store(true, Ordering::SeqCst);
        let spoken = self.tts.speak(&text).await;
        self.speaking.store(false, Ordering::SeqCst);
        spoken.map_err(VoxError::Other)?;

        self.questions_asked = 1;
        self.state = SessionState::Listening;
        Ok(())
    }

    /// Process one completed user utterance: record it, stream the reply and
    /// narrate it. A failed reply is recovered with a spoken apology and the
    /// session returns to listening without consuming quota.
    pub async fn handle_user_turn(&mut self, utterance: &str) -> VoxResult<TurnOutcome> {
        self.transcript.push(TranscriptEntry::user(utterance));
        self.history.push(ChatMessage::user(utterance));
        self.state = SessionState::Thinking;

        let closing = self.questions_asked >= self.total_questions;
        let prompt = prompts::interviewer(
            self.persona.label,
            &self.company,
            &self.role,
            self.questions_asked,
            self.total_questions,
        );

        match self.deliver_reply(&prompt).await {
            Ok(_) => {
                if closing {
                    self.state = SessionState::Ending;
                    Ok(TurnOutcome::Finished)
                } else {
                    self.questions_asked += 1;
                    self.state = SessionState::Listening;
                    Ok(TurnOutcome::Continue)
                }
            }
            Err(e) => {
                warn!("Reply failed, recovering: {e}");
                self.speak_apology().await;
                self.state = SessionState::Listening;
                Ok(TurnOutcome::Continue)
            }
        }
    }

    /// Stream the model reply, narrating completed sentences while later ones
    /// are still generating. The transcript's AI entry is updated in place as
    /// chunks arrive.
    async fn deliver_reply(&mut self, system_prompt: &str) -> VoxResult<String> {
        let mut chunks = self.backend.stream_reply(&self.history, system_prompt).await?;

        self.state = SessionState::Speaking;
        self.speaking.store(true, Ordering::SeqCst);

        let (sentence_tx, mut sentence_rx) = mpsc::channel::<String>(16);
        let tts = self.tts.clone();
        let speaking = self.speaking.clone();
        let narrator = tokio::spawn(async move {
            while let Some(sentence) = sentence_rx.recv().await {
                if let Err(e) = tts.speak(&sentence).await {
                    warn!("Narration error: {e}");
                }
            }
            speaking.store(false, Ordering::SeqCst);
        });

        let mut splitter = SentenceSplitter::new();
        let mut full = String::new();
        let mut stream_err = None;
        self.transcript.push(TranscriptEntry::ai(""));

        while let Some(item) = chunks.recv().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => {
                    // A broken stream is a failed reply, not a short one
                    stream_err = Some(e);
                    break;
                }
            };
            full.push_str(&chunk);
            if let Some(entry) = self.transcript.last_mut() {
                entry.text = full.clone();
            }
            for sentence in splitter.push(&chunk) {
                if sentence_tx.send(sentence).await.is_err() {
                    break;
                }
            }
        }
        if stream_err.is_none() {
            if let Some(rest) = splitter.flush() {
                let _ = sentence_tx.send(rest).await;
            }
        }
        drop(sentence_tx);
        let _ = narrator.await;

        if let Some(e) = stream_err {
            // The truncated text must not stand as the interviewer's turn
            self.transcript.pop();
            self.speaking.store(false, Ordering::SeqCst);
            return Err(e);
        }

        if full.trim().is_empty() {
            self.transcript.pop();
            self.speaking.store(false, Ordering::SeqCst);
            return Err(VoxError::Api("model reply stream was empty".into()));
        }

        self.history.push(ChatMessage::assistant(full.clone()));
        Ok(full)
    }

    /// Spoken recovery line; shown in the transcript but kept out of the
    /// model history so the retry is clean
    async fn speak_apology(&mut self) {
        self.transcript.push(TranscriptEntry::ai(prompts::APOLOGY));
        self.speaking.store(true, Ordering::SeqCst);
        if let Err(e) = self.tts.speak(prompts::APOLOGY).await {
            warn!("Apology playback failed: {e}");
        }
        self.speaking.store(false, Ordering::SeqCst);
    }

    /// Tear down playback and, if the conversation got past the opener, score
    /// the transcript. Sessions with fewer than two entries are discarded
    /// without scoring. Scoring transport errors propagate so nothing gets
    /// persisted for them.
    pub async fn finish(&mut self) -> VoxResult<Option<InterviewResult>> {
        self.tts.cancel();
        self.speaking.store(false, Ordering::SeqCst);
        self.state = SessionState::Idle;

        if self.transcript.len() < 2 {
            info!("Session too short to score, discarding");
            return Ok(None);
        }

        let lines: Vec<String> = self
            .transcript
            .iter()
            .map(|entry| match entry.speaker {
                Speaker::Ai => format!("Interviewer: {}", entry.text),
                Speaker::User => format!("Candidate: {}", entry.text),
            })
            .collect();

        let analysis =
            scorer::analyze_interview(self.backend.as_ref(), &lines, &self.role, &self.company)
                .await?;

        Ok(Some(self.build_result(analysis, lines)))
    }

    fn build_result(&self, analysis: InterviewAnalysis, lines: Vec<String>) -> InterviewResult {
        let now = Utc::now();
        InterviewResult {
            id: now.timestamp_millis().to_string(),
            date: now.to_rfc3339(),
            role: self.role.clone(),
            company: self.company.clone(),
            overall_score: analysis.overall_score,
            categories: analysis.categories,
            feedback: analysis.feedback,
            transcription: lines,
        }
    }
}

/// Drop audio that piled up while a reply was generated and narrated. The
/// capture channel is unbounded, so the microphone keeps buffering through
/// the whole Thinking/Speaking phase; replaying that backlog would transcribe
/// the system's own narration as a user answer. Recognizer and utterance
/// state are cleared along with it.
pub fn discard_pending_audio(
    audio_rx: &mut mpsc::UnboundedReceiver<Vec<i16>>,
    engine: &mut dyn AsrEngine,
    buffer: &mut UtteranceBuffer,
) {
    let mut dropped = 0usize;
    while audio_rx.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!("Dropped {dropped} buffered audio chunks from narration window");
    }
    engine.reset();
    buffer.reset();
}

/// Run a full voice interview: microphone in, recognition, turn taking,
/// narration out, then scoring and persistence. Returns the stored result,
/// or None when the session was too short to score.
pub async fn run_interview(
    config: &Config,
    backend: Arc<dyn InterviewBackend>,
    tts: Arc<TtsDispatcher>,
    store: &AppStore,
    first_name: &str,
    role: &str,
    company: &str,
    persona_id: &str,
) -> VoxResult<Option<InterviewResult>> {
    let mut session = InterviewSession::new(
        backend,
        tts,
        prompts::persona(persona_id),
        role,
        company,
        config.question_count,
    );
    let speaking = session.speaking_flag();

    let mut engine: Box<dyn AsrEngine> = asr::create_engine(config).map_err(VoxError::Other)?;
    let (mut capture, mut audio_rx) = AudioCapture::start(None)?;
    let mut buffer = UtteranceBuffer::new(config.silence_window(), config.min_utterance_chars);

    info!("🎤 Interview started: {role} at {company}");
    session.begin(first_name).await?;
    // The opener was narrated with the mic already live
    discard_pending_audio(&mut audio_rx, engine.as_mut(), &mut buffer);

    let outcome: VoxResult<()> = async {
        loop {
            // Wake at the silence deadline even when no audio arrives
            let wait = buffer
                .deadline()
                .map(|d| d.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_millis(250));

            tokio::select! {
                chunk = audio_rx.recv() => {
                    let Some(samples) = chunk else {
                        return Err(VoxError::Audio("capture channel closed".into()));
                    };
                    // Discard our own narration instead of transcribing it
                    if speaking.load(Ordering::SeqCst) {
                        continue;
                    }
                    if let Some(event) = engine.process(&samples).map_err(VoxError::Other)? {
                        buffer.on_event(&event, Instant::now());
                    }
                }
                _ = tokio::time::sleep(wait) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, ending session");
                    return Ok(());
                }
            }

            let speaking_now = speaking.load(Ordering::SeqCst);
            if let Some(utterance) = buffer.take_if_complete(Instant::now(), speaking_now) {
                info!("🗣️ Answer captured ({} chars)", utterance.len());
                let outcome = session.handle_user_turn(&utterance).await?;
                // Everything the mic buffered during the reply is narration
                discard_pending_audio(&mut audio_rx, engine.as_mut(), &mut buffer);
                if outcome == TurnOutcome::Finished {
                    return Ok(());
                }
            }
        }
    }
    .await;

    // Device release happens before scoring on every path
    capture.stop();
    drop(audio_rx);
    outcome?;

    let result = session.finish().await?;
    if let Some(result) = &result {
        store.push_result(result.clone())?;
        store.set_last_target(role, company)?;
        info!("📊 Interview scored: {}/100", result.overall_score);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitter_terminal_punctuation() {
        let mut splitter = SentenceSplitter::new();
        let out = splitter.push("Great answer! Tell me more.");
        assert_eq!(out, vec!["Great answer!", "Tell me more."]);
        assert!(splitter.flush().is_none());
    }

    #[test]
    fn test_splitter_soft_break_needs_length() {
        let mut splitter = SentenceSplitter::new();
        // Short clause: the comma must not split
        assert!(splitter.push("Well, that").is_empty());
        assert_eq!(splitter.flush().as_deref(), Some("Well, that"));

        // Long clause: the comma splits once past the threshold
        let mut splitter = SentenceSplitter::new();
        let long = "That is a thorough and well structured answer about caching,";
        let out = splitter.push(long);
        assert_eq!(out.len(), 1);
        assert!(out[0].ends_with("caching,"));
    }

    #[test]
    fn test_splitter_across_chunks() {
        let mut splitter = SentenceSplitter::new();
        assert!(splitter.push("Tell me ab").is_empty());
        let out = splitter.push("out scaling. And then");
        assert_eq!(out, vec!["Tell me about scaling."]);
        assert_eq!(splitter.flush().as_deref(), Some("And then"));
    }

    #[test]
    fn test_splitter_flush_trims() {
        let mut splitter = SentenceSplitter::new();
        splitter.push("   ");
        assert!(splitter.flush().is_none());
    }
}
