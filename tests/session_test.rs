//! Turn controller behavior: question quota, streamed narration, recovery
//! and end-of-session scoring.

mod common;

use common::mock_backend::MockBackend;
use common::mock_tts::MockTts;
use std::sync::Arc;
use std::time::{Duration, Instant};
use voxprep::asr::{AsrEngine, AsrEvent, AsrResult};
use voxprep::capture::UtteranceBuffer;
use voxprep::prompts;
use voxprep::session::{self, InterviewSession, SessionState, Speaker, TurnOutcome};
use voxprep::tts::TtsDispatcher;

const TOTAL_QUESTIONS: usize = 5;

fn session_with(
    backend: Arc<MockBackend>,
    primary: Arc<MockTts>,
    fallback: Arc<MockTts>,
) -> InterviewSession {
    let dispatcher = Arc::new(TtsDispatcher::new(Some(primary), fallback));
    InterviewSession::new(
        backend,
        dispatcher,
        prompts::persona("robot"),
        "Backend Engineer",
        "Acme",
        TOTAL_QUESTIONS,
    )
}

#[tokio::test]
async fn test_question_quota_never_exceeded() {
    let backend = Arc::new(MockBackend::new());
    let tts = Arc::new(MockTts::new());
    let mut session = session_with(backend.clone(), tts.clone(), Arc::new(MockTts::new()));

    // Four mid-session questions plus one closing turn
    for n in 2..=TOTAL_QUESTIONS {
        backend.push_reply(&format!("Interesting. Question {n}: how would you scale it?"));
    }
    backend.push_reply("That was great. Thanks for your time today!");

    session.begin("Ada").await.unwrap();
    assert_eq!(session.questions_asked(), 1);
    assert_eq!(session.state(), SessionState::Listening);

    for turn in 1..TOTAL_QUESTIONS {
        let outcome = session.handle_user_turn("I would shard the data layer.").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Continue, "turn {turn} should continue");
        assert!(session.questions_asked() <= TOTAL_QUESTIONS);
    }
    assert_eq!(session.questions_asked(), TOTAL_QUESTIONS);

    // Answering the last question triggers the wrap-up turn
    let outcome = session.handle_user_turn("Thanks, that covers it.").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Finished);
    assert_eq!(session.state(), SessionState::Ending);
    assert_eq!(session.questions_asked(), TOTAL_QUESTIONS);

    // The final system prompt asked the model to wrap up, not to question
    let prompts_seen = backend.prompts_seen();
    assert!(prompts_seen.last().unwrap().contains("Wrap up gracefully"));
    assert!(prompts_seen[0].contains("next question immediately"));
}

#[tokio::test]
async fn test_reply_is_narrated_sentence_by_sentence() {
    let backend = Arc::new(MockBackend::new());
    let tts = Arc::new(MockTts::new());
    let mut session = session_with(backend.clone(), tts.clone(), Arc::new(MockTts::new()));

    backend.push_reply("Good answer! Now tell me about error handling.");
    session.begin("Ada").await.unwrap();
    session.handle_user_turn("I rewrote the ingest service.").await.unwrap();

    let spoken = tts.get_spoken();
    // Intro plus the two reply sentences as separate utterances
    assert!(spoken.iter().any(|s| s == "Good answer!"));
    assert!(spoken.iter().any(|s| s == "Now tell me about error handling."));

    // The transcript carries the full reply as one AI entry
    let last = session.transcript().last().unwrap();
    assert_eq!(last.speaker, Speaker::Ai);
    assert_eq!(last.text, "Good answer! Now tell me about error handling.");
}

#[tokio::test]
async fn test_failed_reply_recovers_with_apology() {
    let backend = Arc::new(MockBackend::new());
    let tts = Arc::new(MockTts::new());
    let mut session = session_with(backend.clone(), tts.clone(), Arc::new(MockTts::new()));

    backend.push_reply_error("stream broke");
    session.begin("Ada").await.unwrap();

    let outcome = session.handle_user_turn("Let me think about that.").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Continue);
    assert_eq!(session.state(), SessionState::Listening);

    // The apology was spoken and shown, and no quota was consumed
    assert!(tts.was_spoken(prompts::APOLOGY));
    let last = session.transcript().last().unwrap();
    assert_eq!(last.text, prompts::APOLOGY);
    assert_eq!(session.questions_asked(), 1);

    // Speaking flag is released so listening can complete turns again
    assert!(!session.speaking_flag().load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn test_interrupted_stream_takes_recovery_path() {
    let backend = Arc::new(MockBackend::new());
    let tts = Arc::new(MockTts::new());
    let mut session = session_with(backend.clone(), tts.clone(), Arc::new(MockTts::new()));

    backend.push_reply_interrupted("This answer starts well. But the", "connection reset");
    session.begin("Ada").await.unwrap();

    let outcome = session.handle_user_turn("I profiled the hot path.").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Continue);
    assert_eq!(session.state(), SessionState::Listening);

    // The truncated reply never stands as the interviewer's turn and no
    // quota is consumed; the apology takes its place
    assert!(!session
        .transcript()
        .iter()
        .any(|e| e.text.contains("starts well")));
    assert_eq!(session.transcript().last().unwrap().text, prompts::APOLOGY);
    assert_eq!(session.questions_asked(), 1);
    assert!(!session.speaking_flag().load(std::sync::atomic::Ordering::SeqCst));
}

/// Counts resets and recognizes everything it is fed
struct CountingAsr {
    resets: usize,
    processed: usize,
}

impl AsrEngine for CountingAsr {
    fn process(&mut self, _samples: &[i16]) -> anyhow::Result<Option<AsrEvent>> {
        self.processed += 1;
        Ok(Some(AsrEvent::Final(AsrResult {
            text: "tell me about a challenging project".to_string(),
            confidence: 0.9,
        })))
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

#[tokio::test]
async fn test_audio_buffered_during_narration_is_discarded() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Vec<i16>>();
    let mut engine = CountingAsr {
        resets: 0,
        processed: 0,
    };
    let mut buffer = UtteranceBuffer::new(Duration::from_millis(3500), 5);

    // Chunks the microphone queued up while the reply was being narrated,
    // plus recognizer state already armed from that narration
    for _ in 0..3 {
        tx.send(vec![0i16; 1024]).unwrap();
    }
    let t0 = Instant::now();
    buffer.on_event(
        &AsrEvent::Final(AsrResult {
            text: "tell me about a challenging project".to_string(),
            confidence: 0.9,
        }),
        t0,
    );

    session::discard_pending_audio(&mut rx, &mut engine, &mut buffer);

    // Nothing from the narration window survives: the backlog is gone
    // without being recognized, and the armed utterance is cleared
    assert!(rx.try_recv().is_err());
    assert_eq!(engine.processed, 0);
    assert_eq!(engine.resets, 1);
    assert!(buffer.deadline().is_none());
    assert!(buffer
        .take_if_complete(t0 + Duration::from_secs(10), false)
        .is_none());
}

#[tokio::test]
async fn test_turn_survives_total_tts_failure() {
    let backend = Arc::new(MockBackend::new());
    let primary = Arc::new(MockTts::failing());
    let fallback = Arc::new(MockTts::failing());
    let mut session = session_with(backend.clone(), primary, fallback);

    backend.push_reply("Noted. What about caching?");
    session.begin("Ada").await.unwrap();

    // Both engines fail on every sentence; the turn still settles
    let outcome = session.handle_user_turn("We used a write-through cache.").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Continue);
    assert!(!session.speaking_flag().load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn test_short_session_is_discarded_without_scoring() {
    let backend = Arc::new(MockBackend::new());
    let tts = Arc::new(MockTts::new());
    let mut session = session_with(backend.clone(), tts.clone(), Arc::new(MockTts::new()));

    session.begin("Ada").await.unwrap();
    // Only the opener exists; no answers were given. No completion is queued
    // on the backend, so any scoring attempt would have errored.
    let result = session.finish().await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_finish_scores_and_builds_result() {
    let backend = Arc::new(MockBackend::new());
    let tts = Arc::new(MockTts::new());
    let mut session = session_with(backend.clone(), tts.clone(), Arc::new(MockTts::new()));

    backend.push_reply("Nice. Question two: why Rust?");
    backend.push_completion(
        r#"{
            "overallScore": 82,
            "categories": [
                {"category": "Communication", "score": 85, "fullMark": 100},
                {"category": "Technical Knowledge", "score": 80, "fullMark": 100},
                {"category": "Problem Solving", "score": 84, "fullMark": 100},
                {"category": "Cultural Fit", "score": 78, "fullMark": 100},
                {"category": "Confidence", "score": 83, "fullMark": 100}
            ],
            "feedback": ["Clear structure", "Add more metrics"]
        }"#,
    );

    session.begin("Ada").await.unwrap();
    session.handle_user_turn("Because of the type system.").await.unwrap();

    let result = session.finish().await.unwrap().expect("scored result");
    assert_eq!(result.overall_score, 82);
    assert_eq!(result.role, "Backend Engineer");
    assert_eq!(result.company, "Acme");
    assert_eq!(result.categories.len(), 5);
    // Transcript lines carry speaker prefixes for the scorer and the record
    assert!(result.transcription.iter().any(|l| l.starts_with("Interviewer: ")));
    assert!(result.transcription.iter().any(|l| l.starts_with("Candidate: ")));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_finish_degrades_to_neutral_on_malformed_analysis() {
    let backend = Arc::new(MockBackend::new());
    let tts = Arc::new(MockTts::new());
    let mut session = session_with(backend.clone(), tts.clone(), Arc::new(MockTts::new()));

    backend.push_reply("Okay. Next question?");
    backend.push_completion("I cannot produce JSON today, sorry.");

    session.begin("Ada").await.unwrap();
    session.handle_user_turn("An answer of reasonable length.").await.unwrap();

    let result = session.finish().await.unwrap().expect("neutral result");
    assert_eq!(result.overall_score, 70);
    assert_eq!(result.categories.len(), 5);
}

#[tokio::test]
async fn test_finish_propagates_transport_errors() {
    let backend = Arc::new(MockBackend::new());
    let tts = Arc::new(MockTts::new());
    let mut session = session_with(backend.clone(), tts.clone(), Arc::new(MockTts::new()));

    backend.push_reply("Okay. Next question?");
    backend.push_completion_error("503 upstream");

    session.begin("Ada").await.unwrap();
    session.handle_user_turn("An answer of reasonable length.").await.unwrap();

    assert!(session.finish().await.is_err());
}
