//! Defensive parsing of the scorer's free-text answer.
//!
//! The model is asked for `{"score": 0-100, "reason": "..."}` but may wrap it in
//! prose or fences, quote the number, or ignore the format entirely. Parsing
//! never fails: it degrades from JSON to a `score` field match, to any bare
//! number, to a zero score with an explanatory reason.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::strip_json_fences;
use crate::text::{collapse_whitespace, truncate_chars};

static SCORE_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"?score"?\s*[:=]\s*"?(\d{1,3}(?:\.\d+)?)"#).expect("valid score field regex")
});

static BARE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3})\b").expect("valid bare number regex"));

const FALLBACK_REASON_CHARS: usize = 200;

/// How a score was recovered from the model's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Json,
    ScoreField,
    BareNumber,
    Unparsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 0 – 100
    pub score: u8,
    pub reason: String,
    pub source: ScoreSource,
}

#[derive(Debug, Deserialize)]
struct RawScore {
    score: Value,
    #[serde(default)]
    reason: Option<String>,
}

/// Clamps any numeric reading into 0 – 100.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

pub fn parse_score_response(text: &str) -> ScoreResult {
    if let Some(result) = parse_json_object(text) {
        return result;
    }

    let reason = fallback_reason(text);

    if let Some(score) = SCORE_FIELD_RE
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok())
    {
        return ScoreResult {
            score: clamp_score(score),
            reason,
            source: ScoreSource::ScoreField,
        };
    }

    if let Some(score) = BARE_NUMBER_RE
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok())
    {
        return ScoreResult {
            score: clamp_score(score),
            reason,
            source: ScoreSource::BareNumber,
        };
    }

    ScoreResult {
        score: 0,
        reason: "Could not read a score from the AI response.".to_string(),
        source: ScoreSource::Unparsed,
    }
}

/// Parses the outermost `{...}` span, if any, as a score object.
fn parse_json_object(text: &str) -> Option<ScoreResult> {
    let text = strip_json_fences(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let raw: RawScore = serde_json::from_str(&text[start..=end]).ok()?;
    let score = match &raw.score {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    Some(ScoreResult {
        score: clamp_score(score),
        reason: raw
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "No reason given.".to_string()),
        source: ScoreSource::Json,
    })
}

fn fallback_reason(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let (cut, truncated) = truncate_chars(&collapsed, FALLBACK_REASON_CHARS);
    if truncated {
        format!("{cut}…")
    } else {
        cut.to_string()
    }
}
