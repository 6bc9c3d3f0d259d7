//! Defensive JSON extraction from model output
//!
//! Models wrap JSON in code fences or conversational text despite the
//! response-format instruction. Strip fences, locate the outermost `{...}`
//! span, and only then parse; anything unparseable is a typed
//! `MalformedResponse` carrying the raw text.

use crate::error::{VoxError, VoxResult};
use serde::de::DeserializeOwned;

/// Locate the JSON object inside possibly-noisy model output
pub fn extract_json_str(content: &str) -> VoxResult<&str> {
    let cleaned = content.trim();

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');

    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&cleaned[start..=end]),
        _ => Err(VoxError::malformed(
            "no JSON object found in model output",
            content,
        )),
    }
}

/// Extract and deserialize a JSON object from model output
pub fn extract<T: DeserializeOwned>(content: &str) -> VoxResult<T> {
    // Code fences confuse the brace scan only when unbalanced; drop them first
    let defenced = content.replace("```json", "").replace("```", "");
    let json_str = extract_json_str(&defenced)?;

    serde_json::from_str(json_str)
        .map_err(|e| VoxError::malformed(format!("JSON parse failed: {e}"), content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Shape {
        name: String,
        score: u32,
    }

    #[test]
    fn test_plain_json() {
        let shape: Shape = extract(r#"{"name": "ada", "score": 91}"#).unwrap();
        assert_eq!(shape.name, "ada");
        assert_eq!(shape.score, 91);
    }

    #[test]
    fn test_fenced_json() {
        let content = "```json\n{\"name\": \"ada\", \"score\": 91}\n```";
        let shape: Shape = extract(content).unwrap();
        assert_eq!(shape.score, 91);
    }

    #[test]
    fn test_json_with_surrounding_prose() {
        let content = "Sure! Here is the result:\n{\"name\": \"ada\", \"score\": 91}\nHope that helps.";
        let shape: Shape = extract(content).unwrap();
        assert_eq!(shape.name, "ada");
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = extract::<Shape>("I could not produce JSON, sorry").unwrap_err();
        assert!(matches!(
            err,
            crate::error::VoxError::MalformedResponse { .. }
        ));
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = extract::<Shape>(r#"{"unexpected": true}"#).unwrap_err();
        assert!(matches!(
            err,
            crate::error::VoxError::MalformedResponse { .. }
        ));
    }
}
