//! Two-stage parsing of free-form model output: locate a candidate JSON
//! object in the text, then deserialize it into a schema-checked payload.
//! Anything short of a fully valid payload is rejected as a whole.

use std::collections::HashSet;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::Tip;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("no JSON object found in response text")]
    NoJsonSpan,

    #[error("response JSON is malformed: {0}")]
    Json(#[source] serde_json::Error),

    #[error("response JSON does not match the schema: {0}")]
    Schema(String),
}

/// First balanced `{...}` span in `text`.
///
/// Braces inside string literals (including escaped quotes) are ignored.
/// Opening braces that are never closed are skipped. Single pass: each open
/// brace is pushed once and popped at most once.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let mut open: Vec<usize> = Vec::new();
    let mut first: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            // Quotes only matter inside a candidate object
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                let Some(start) = open.pop() else { continue };
                if first.is_none_or(|(s, _)| start < s) {
                    first = Some((start, i));
                }
                // Every earlier brace is closed, nothing can start before this span
                if open.is_empty() {
                    break;
                }
            }
            _ => {}
        }
    }

    first.map(|(start, end)| &text[start..=end])
}

/// Extract the span, check it is JSON, then check it against `T`.
fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<T, PayloadError> {
    let span = extract_json_span(text).ok_or(PayloadError::NoJsonSpan)?;
    let value: serde_json::Value = serde_json::from_str(span).map_err(PayloadError::Json)?;
    serde_json::from_value(value).map_err(|e| PayloadError::Schema(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct TipsPayload {
    tips: Vec<Tip>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailPayload {
    detailed_explanation: String,
    #[serde(default)]
    personalized_tips: Option<Vec<String>>,
}

/// Validated detail content from a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailContent {
    pub detailed_explanation: String,
    pub personalized_tips: Vec<String>,
}

/// Parse a `{"tips": [...]}` payload. Every tip must be complete; one bad
/// record rejects the whole response.
pub fn parse_tips(text: &str) -> Result<Vec<Tip>, PayloadError> {
    let payload: TipsPayload = parse_payload(text)?;

    if payload.tips.is_empty() {
        return Err(PayloadError::Schema("`tips` is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for (i, tip) in payload.tips.iter().enumerate() {
        check_tip(tip).map_err(|reason| PayloadError::Schema(format!("tips[{i}]: {reason}")))?;
        if !seen.insert(tip.id.as_str()) {
            return Err(PayloadError::Schema(format!(
                "tips[{i}]: duplicate id '{}'",
                tip.id
            )));
        }
    }

    Ok(payload.tips)
}

fn check_tip(tip: &Tip) -> Result<(), String> {
    if tip.id.trim().is_empty() {
        return Err("blank id".to_string());
    }
    if tip.title.trim().is_empty() {
        return Err("blank title".to_string());
    }
    if !tip.category.is_known() {
        return Err(format!("unknown category '{}'", tip.category));
    }
    if tip.steps.is_empty() {
        return Err("no steps".to_string());
    }
    if tip.benefits.is_empty() {
        return Err("no benefits".to_string());
    }
    Ok(())
}

/// Parse a `{"detailedExplanation": ..., "personalizedTips": [...]}` payload.
pub fn parse_detail(text: &str) -> Result<DetailContent, PayloadError> {
    let payload: DetailPayload = parse_payload(text)?;

    if payload.detailed_explanation.trim().is_empty() {
        return Err(PayloadError::Schema(
            "`detailedExplanation` is blank".to_string(),
        ));
    }

    Ok(DetailContent {
        detailed_explanation: payload.detailed_explanation,
        personalized_tips: payload.personalized_tips.unwrap_or_default(),
    })
}
