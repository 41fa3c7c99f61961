// Lenient JSON extraction from model answers
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::Complete;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object in answer")]
    NoObject,

    #[error("answer did not match the expected shape: {0}")]
    Shape(String),

    #[error("answer is missing required text")]
    Incomplete,
}

/// Outermost `{...}` of the answer, ignoring Markdown code fences around it.
pub fn extract_json(raw: &str) -> Option<&str> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (```json)
        text = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        text = text.trim_end().trim_end_matches("```");
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn parse_content<T>(raw: &str) -> Result<T, ParseError>
where
    T: DeserializeOwned + Complete,
{
    let json = extract_json(raw).ok_or(ParseError::NoObject)?;
    let content: T = serde_json::from_str(json).map_err(|e| ParseError::Shape(e.to_string()))?;
    if !content.is_complete() {
        return Err(ParseError::Incomplete);
    }
    Ok(content)
}
