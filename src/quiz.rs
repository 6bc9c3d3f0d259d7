//! Topic quiz generation and grading
//!
//! Quizzes come back from the model as one JSON document and are validated
//! strictly before anything is shown: exactly five questions, four options
//! each, answer index in range. Passing at 60 percent marks the topic
//! completed so it cannot be retaken.

use crate::error::{VoxError, VoxResult};
use crate::llm::{extract, ChatMessage, InterviewBackend};
use crate::prompts;
use crate::store::AppStore;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const QUESTION_COUNT: usize = 5;
pub const OPTION_COUNT: usize = 4;
/// Fraction of correct answers needed to complete a topic
pub const PASS_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub topic: String,
    #[serde(rename = "conceptExplanation")]
    pub concept_explanation: String,
    #[serde(rename = "syntaxGuide", default)]
    pub syntax_guide: String,
    #[serde(rename = "quizQuestions")]
    pub quiz_questions: Vec<QuizQuestion>,
}

/// Outcome of grading a finished quiz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub correct: usize,
    pub total: usize,
    pub passed: bool,
}

impl Quiz {
    /// Reject any quiz that does not match the expected shape. Rendering an
    /// out-of-range answer index would otherwise panic at grading time.
    pub fn validate(&self) -> VoxResult<()> {
        if self.quiz_questions.len() != QUESTION_COUNT {
            return Err(VoxError::Validation(format!(
                "expected {QUESTION_COUNT} questions, got {}",
                self.quiz_questions.len()
            )));
        }
        if self.concept_explanation.trim().is_empty() {
            return Err(VoxError::Validation("missing concept explanation".into()));
        }
        for (i, q) in self.quiz_questions.iter().enumerate() {
            if q.question.trim().is_empty() {
                return Err(VoxError::Validation(format!("question {} is empty", i + 1)));
            }
            if q.options.len() != OPTION_COUNT {
                return Err(VoxError::Validation(format!(
                    "question {} has {} options, expected {OPTION_COUNT}",
                    i + 1,
                    q.options.len()
                )));
            }
            if q.options.iter().any(|o| o.trim().is_empty()) {
                return Err(VoxError::Validation(format!(
                    "question {} has an empty option",
                    i + 1
                )));
            }
            if q.correct_answer >= OPTION_COUNT {
                return Err(VoxError::Validation(format!(
                    "question {} answer index {} out of range",
                    i + 1,
                    q.correct_answer
                )));
            }
        }
        Ok(())
    }
}

/// Number of correct answers needed to pass a quiz of `total` questions
pub fn pass_threshold(total: usize) -> usize {
    (total as f64 * PASS_RATIO).ceil() as usize
}

/// Grade a set of selected answer indices against the quiz
pub fn grade(quiz: &Quiz, answers: &[usize]) -> QuizOutcome {
    let correct = quiz
        .quiz_questions
        .iter()
        .zip(answers)
        .filter(|(q, &a)| q.correct_answer == a)
        .count();
    let total = quiz.quiz_questions.len();
    QuizOutcome {
        correct,
        total,
        passed: correct >= pass_threshold(total),
    }
}

/// Generate a validated quiz for a topic. Topics already completed are
/// refused so progress cannot be farmed by retaking them.
pub async fn generate_quiz(
    backend: &dyn InterviewBackend,
    store: &AppStore,
    topic: &str,
) -> VoxResult<Quiz> {
    if store.is_topic_completed(topic)? {
        return Err(VoxError::Validation(format!(
            "topic '{topic}' is already completed"
        )));
    }

    info!("📝 Generating quiz for '{topic}'");
    let messages = vec![ChatMessage::user(prompts::quiz(topic))];
    let content = backend.complete(&messages, 0.7).await?;

    let quiz: Quiz = extract::extract(&content)?;
    quiz.validate()?;
    Ok(quiz)
}

/// Record a passed quiz; failing outcomes leave the topic retakeable
pub fn record_outcome(store: &AppStore, topic: &str, outcome: &QuizOutcome) -> VoxResult<()> {
    if outcome.passed {
        store.mark_topic_completed(topic)?;
        info!("✅ Topic '{topic}' completed ({}/{})", outcome.correct, outcome.total);
    } else {
        info!("❌ Topic '{topic}' not passed ({}/{})", outcome.correct, outcome.total);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quiz() -> Quiz {
        Quiz {
            topic: "SQL Joins".to_string(),
            concept_explanation: "Joins combine rows from two tables.".to_string(),
            syntax_guide: "SELECT ... FROM a JOIN b ON ...".to_string(),
            quiz_questions: (0..QUESTION_COUNT)
                .map(|i| QuizQuestion {
                    question: format!("Question {}", i + 1),
                    options: vec![
                        "A".to_string(),
                        "B".to_string(),
                        "C".to_string(),
                        "D".to_string(),
                    ],
                    correct_answer: i % OPTION_COUNT,
                    explanation: "Because.".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(sample_quiz().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_counts() {
        let mut quiz = sample_quiz();
        quiz.quiz_questions.pop();
        assert!(matches!(quiz.validate(), Err(VoxError::Validation(_))));

        let mut quiz = sample_quiz();
        quiz.quiz_questions[2].options.pop();
        assert!(matches!(quiz.validate(), Err(VoxError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_answer() {
        let mut quiz = sample_quiz();
        quiz.quiz_questions[0].correct_answer = 4;
        assert!(matches!(quiz.validate(), Err(VoxError::Validation(_))));
    }

    #[test]
    fn test_grade_three_of_five_passes() {
        let quiz = sample_quiz();
        let keys: Vec<usize> = quiz.quiz_questions.iter().map(|q| q.correct_answer).collect();

        // Three right answers pass
        let mut answers = keys.clone();
        answers[3] = (keys[3] + 1) % OPTION_COUNT;
        answers[4] = (keys[4] + 1) % OPTION_COUNT;
        let outcome = grade(&quiz, &answers);
        assert_eq!(outcome.correct, 3);
        assert!(outcome.passed);

        // Two do not
        answers[2] = (keys[2] + 1) % OPTION_COUNT;
        let outcome = grade(&quiz, &answers);
        assert_eq!(outcome.correct, 2);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_quiz_deserializes_wire_format() {
        let json = r#"{
            "topic": "Rust lifetimes",
            "conceptExplanation": "Lifetimes tie borrows to scopes.",
            "syntaxGuide": "fn f<'a>(x: &'a str) -> &'a str",
            "quizQuestions": [
                {"question": "Q", "options": ["a","b","c","d"], "correctAnswer": 1, "explanation": "E"}
            ]
        }"#;
        let quiz: Quiz = serde_json::from_str(json).unwrap();
        assert_eq!(quiz.quiz_questions[0].correct_answer, 1);
    }
}
