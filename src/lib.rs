//! VoxPrep - Voice Interview Practice
//!
//! A spoken mock-interview trainer: it listens to your answers, streams an
//! AI interviewer's replies out loud, scores the session afterwards, and
//! rounds things out with topic quizzes, résumé import and a GitHub browser.

pub mod asr;
pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod github;
pub mod llm;
pub mod profile;
pub mod prompts;
pub mod quiz;
pub mod scorer;
pub mod session;
pub mod store;
pub mod tts;
