//! Post-session transcript scoring

use crate::error::{VoxError, VoxResult};
use crate::llm::{extract, ChatMessage, InterviewBackend};
use crate::prompts;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One scored evaluation category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: u32,
    #[serde(rename = "fullMark")]
    pub full_mark: u32,
}

/// Structured evaluation of a finished interview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewAnalysis {
    #[serde(rename = "overallScore")]
    pub overall_score: u32,
    pub categories: Vec<CategoryScore>,
    pub feedback: Vec<String>,
}

pub const CATEGORY_NAMES: &[&str] = &[
    "Communication",
    "Technical Knowledge",
    "Problem Solving",
    "Cultural Fit",
    "Confidence",
];

impl InterviewAnalysis {
    /// Neutral fallback used when the model output cannot be parsed
    pub fn neutral_default() -> Self {
        Self {
            overall_score: 70,
            categories: CATEGORY_NAMES
                .iter()
                .map(|name| CategoryScore {
                    category: (*name).to_string(),
                    score: 70,
                    full_mark: 100,
                })
                .collect(),
            feedback: vec!["Interview completed. Analysis could not be generated.".to_string()],
        }
    }
}

/// Score a finished transcript. Malformed model output degrades to the
/// neutral default rather than failing the session; transport errors
/// propagate so the caller can decide to discard.
pub async fn analyze_interview(
    backend: &dyn InterviewBackend,
    transcript_lines: &[String],
    role: &str,
    company: &str,
) -> VoxResult<InterviewAnalysis> {
    let transcript = transcript_lines.join("\n");
    let messages = vec![
        ChatMessage::system(prompts::scorer_system()),
        ChatMessage::user(prompts::scorer_request(&transcript, role, company)),
    ];

    let content = backend.complete(&messages, 0.0).await?;

    match extract::extract::<InterviewAnalysis>(&content) {
        Ok(analysis) => Ok(analysis),
        Err(VoxError::MalformedResponse { reason, .. }) => {
            warn!("Analysis unparseable ({reason}), using neutral scores");
            Ok(InterviewAnalysis::neutral_default())
        }
        Err(e) => Err(e),
    }
}
