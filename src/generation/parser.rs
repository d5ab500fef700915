//! Turns raw model output into validated questions.
//!
//! The model is asked for `{"title": ..., "questions": [...]}` but in practice
//! it also answers with a bare array, wraps the JSON in a markdown fence, or
//! encodes correct answers as indices. Everything loosely typed stays inside
//! this module; callers only ever see [`ParsedGenerationResult`].

use crate::error::{Error, Result};
use crate::models::question::{Difficulty, Question};
use serde_json::{Map, Value as JsonValue};

const REQUIRED_FIELDS: [&str; 3] = ["text", "is_closed", "difficulty"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGenerationResult {
    pub title: Option<String>,
    pub questions: Vec<Question>,
}

/// The two top-level shapes accepted from the model.
#[derive(Debug)]
enum Envelope {
    Bare(Vec<JsonValue>),
    Titled {
        title: Option<String>,
        questions: Vec<JsonValue>,
    },
}

impl Envelope {
    fn decode(value: JsonValue, raw: &str) -> Result<Self> {
        match value {
            JsonValue::Array(items) => Ok(Envelope::Bare(items)),
            JsonValue::Object(mut map) => {
                let questions = match map.remove("questions") {
                    Some(JsonValue::Array(items)) => items,
                    Some(other) => {
                        return Err(Error::malformed(
                            format!("\"questions\" must be an array, got {}", kind(&other)),
                            raw,
                        ))
                    }
                    None => {
                        return Err(Error::malformed(
                            "response object has no \"questions\" key",
                            raw,
                        ))
                    }
                };
                let title = match map.remove("title") {
                    Some(JsonValue::String(title)) => Some(title),
                    _ => None,
                };
                Ok(Envelope::Titled { title, questions })
            }
            other => Err(Error::malformed(
                format!("expected a JSON array or object, got {}", kind(&other)),
                raw,
            )),
        }
    }

    fn into_parts(self) -> (Option<String>, Vec<JsonValue>) {
        match self {
            Envelope::Bare(questions) => (None, questions),
            Envelope::Titled { title, questions } => (title, questions),
        }
    }
}

pub fn parse_generation_response(raw: &str) -> Result<ParsedGenerationResult> {
    let body = strip_wrapping(raw);
    let value: JsonValue = serde_json::from_str(body)
        .map_err(|e| Error::malformed(format!("invalid JSON: {}", e), body))?;

    let (title, items) = Envelope::decode(value, body)?.into_parts();
    let questions = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| decode_question(index, item, body))
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedGenerationResult { title, questions })
}

/// Removes a surrounding markdown fence and a leading `json` / `JSON:` marker.
fn strip_wrapping(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.trim_start_matches('`');
        body = match rest.split_once('\n') {
            Some((tag, tail)) if is_language_tag(tag) => tail,
            _ => rest,
        };
        body = body.trim_end();
        if let Some(inner) = body.strip_suffix("```") {
            body = inner.trim_end_matches('`');
        }
        body = body.trim();
    }
    strip_json_marker(body)
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn strip_json_marker(body: &str) -> &str {
    let bytes = body.as_bytes();
    if bytes.len() >= 4 && bytes[..4].eq_ignore_ascii_case(b"json") {
        let rest = &body[4..];
        let rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();
        if rest.starts_with('[') || rest.starts_with('{') {
            return rest;
        }
    }
    body
}

fn decode_question(index: usize, item: JsonValue, raw: &str) -> Result<Question> {
    let position = index + 1;
    let map = match item {
        JsonValue::Object(map) => map,
        other => {
            return Err(Error::malformed(
                format!("question #{} is {}, expected an object", position, kind(&other)),
                raw,
            ))
        }
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !map.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(Error::malformed(
            format!("question #{} is missing fields: {}", position, missing.join(", ")),
            raw,
        ));
    }

    let text = match &map["text"] {
        JsonValue::String(text) => text.clone(),
        other => {
            return Err(Error::malformed(
                format!("question #{}: \"text\" must be a string, got {}", position, kind(other)),
                raw,
            ))
        }
    };
    let is_closed = coerce_bool(&map["is_closed"]).ok_or_else(|| {
        Error::malformed(
            format!("question #{}: \"is_closed\" must be a boolean", position),
            raw,
        )
    })?;
    let difficulty = coerce_difficulty(&map["difficulty"]).ok_or_else(|| {
        Error::malformed(
            format!("question #{}: \"difficulty\" must be 1, 2 or 3", position),
            raw,
        )
    })?;

    let (choices, correct_choices) = if is_closed {
        closed_choices(&map)
    } else {
        (Vec::new(), Vec::new())
    };

    Question::new(text, is_closed, difficulty, choices, correct_choices).map_err(|e| match e {
        Error::InvalidQuestionShape(msg) => {
            Error::InvalidQuestionShape(format!("question #{}: {}", position, msg))
        }
        other => other,
    })
}

fn closed_choices(map: &Map<String, JsonValue>) -> (Vec<String>, Vec<String>) {
    let choices = map
        .get("choices")
        .and_then(coerce_to_list)
        .unwrap_or_default();
    let correct = match map.get("correct_choices") {
        Some(value) => resolve_correct_choices(value, &choices),
        None => Vec::new(),
    };
    (choices, correct)
}

/// A list made only of integers holds zero-based indices into `choices`;
/// indices that point nowhere are dropped. Anything else is taken as the
/// literal correct answers.
fn resolve_correct_choices(value: &JsonValue, choices: &[String]) -> Vec<String> {
    match value {
        JsonValue::Array(items) if items.iter().all(|i| i.is_i64() || i.is_u64()) => items
            .iter()
            .filter_map(JsonValue::as_u64)
            .filter_map(|idx| usize::try_from(idx).ok())
            .filter_map(|idx| choices.get(idx).cloned())
            .collect(),
        other => coerce_to_list(other).unwrap_or_default(),
    }
}

/// Canonicalises a choice list. `null` means "no list"; arrays are converted
/// element-wise to strings; a string holding a JSON array is decoded; any
/// other scalar becomes a one-element list.
pub fn coerce_to_list(value: &JsonValue) -> Option<Vec<String>> {
    match value {
        JsonValue::Null => None,
        JsonValue::Array(items) => Some(items.iter().map(value_to_string).collect()),
        JsonValue::String(s) => match serde_json::from_str::<JsonValue>(s) {
            Ok(JsonValue::Array(items)) => Some(items.iter().map(value_to_string).collect()),
            Ok(parsed) => Some(vec![value_to_string(&parsed)]),
            Err(_) => Some(vec![s.trim().trim_matches('"').trim_matches('\'').to_string()]),
        },
        other => Some(vec![value_to_string(other)]),
    }
}

fn value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => n.as_i64().map(|n| n != 0),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_difficulty(value: &JsonValue) -> Option<Difficulty> {
    let level = match value {
        JsonValue::Number(n) => match n.as_i64() {
            Some(level) => level,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 {
                    return None;
                }
                f as i64
            }
        },
        JsonValue::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i16::try_from(level).ok().and_then(|l| Difficulty::try_from(l).ok())
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
