// src/generation/parser.rs

//! Extraction and validation of question payloads from free-form model output.
//!
//! Model responses are untrusted: they may wrap the JSON in prose or code
//! fences, truncate it, or ignore the requested shape. Every failure here is
//! a typed [`ParseError`]; nothing in this module panics on input.

use serde_json::Value;

use crate::models::assessment::{AnswerOption, OPTIONS_PER_QUESTION, Question};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON array of question objects found in the response")]
    NoStructuredPayload,

    #[error("structured payload is not valid JSON: {0}")]
    MalformedPayload(String),

    #[error("structured payload contains no questions")]
    EmptyResult,

    #[error("question {index} is invalid: {reason}")]
    InvalidQuestion { index: usize, reason: &'static str },
}

/// Parses the model's raw answer into validated questions.
///
/// Returns every element of the first array-of-objects span, or the first
/// error. Partial results are never returned.
pub fn parse_questions(raw: &str) -> Result<Vec<Question>, ParseError> {
    let span = locate_payload(raw).ok_or(ParseError::NoStructuredPayload)?;

    let elements: Vec<Value> =
        serde_json::from_str(span).map_err(|e| ParseError::MalformedPayload(e.to_string()))?;

    if elements.is_empty() {
        return Err(ParseError::EmptyResult);
    }

    elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            question_from_value(element)
                .map_err(|reason| ParseError::InvalidQuestion { index, reason })
        })
        .collect()
}

/// Finds the first balanced `[...]` span whose first element is an object.
///
/// Bracket matching honours JSON string literals and escapes, so brackets
/// inside question text do not end the span early. The text is walked once,
/// one top-level bracket group at a time; spans closed inside a group are
/// candidates even when the group itself never balances. An object array
/// that never closes ends the search: every later `[` is nested inside it,
/// so a cut-off payload is reported as missing rather than matched on an
/// inner list. An empty `[]` is only returned when no object array exists.
pub fn locate_payload(raw: &str) -> Option<&str> {
    let mut empty = None;
    let mut from = 0;

    while let Some(offset) = raw[from..].find('[') {
        let mut group = scan_group(raw.as_bytes(), from + offset);

        let limit = match &group.end {
            GroupEnd::Unterminated(unclosed) => unclosed
                .iter()
                .copied()
                .find(|&start| opens_object(&raw[start + 1..]))
                .unwrap_or(raw.len()),
            _ => raw.len(),
        };

        group.arrays.sort_unstable();
        for (start, end) in group.arrays.into_iter().filter(|&(start, _)| start < limit) {
            let span = &raw[start..end];
            let inner = span[1..span.len() - 1].trim();

            if inner.starts_with('{') {
                return Some(span);
            }
            if inner.is_empty() && empty.is_none() {
                empty = Some(span);
            }
        }

        from = match group.end {
            GroupEnd::Closed(end) => end,
            GroupEnd::Mismatched(at) => at + 1,
            GroupEnd::Unterminated(_) => break,
        };
    }

    empty
}

fn opens_object(rest: &str) -> bool {
    rest.trim_start().starts_with('{')
}

struct Group {
    /// Balanced `[...]` spans closed inside the group, as `(start, end)`.
    arrays: Vec<(usize, usize)>,
    end: GroupEnd,
}

enum GroupEnd {
    /// Exclusive end of the balanced group.
    Closed(usize),
    /// Position of a closer that does not match the innermost opener.
    Mismatched(usize),
    /// Starts of the arrays still open when the input ran out, outermost first.
    Unterminated(Vec<usize>),
}

/// Walks the bracketed value opening at `start` until it balances, breaks,
/// or the input ends.
fn scan_group(bytes: &[u8], start: usize) -> Group {
    let mut open: Vec<(u8, usize)> = Vec::new();
    let mut arrays = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (pos, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' => open.push((b']', pos)),
            b'{' => open.push((b'}', pos)),
            b']' | b'}' => {
                let opened = match open.pop() {
                    Some((closer, opened)) if closer == byte => opened,
                    _ => {
                        return Group {
                            arrays,
                            end: GroupEnd::Mismatched(pos),
                        };
                    }
                };
                if byte == b']' {
                    arrays.push((opened, pos + 1));
                }
                if open.is_empty() {
                    return Group {
                        arrays,
                        end: GroupEnd::Closed(pos + 1),
                    };
                }
            }
            _ => {}
        }
    }

    let unclosed = open
        .into_iter()
        .filter(|&(closer, _)| closer == b']')
        .map(|(_, start)| start)
        .collect();

    Group {
        arrays,
        end: GroupEnd::Unterminated(unclosed),
    }
}

fn question_from_value(value: &Value) -> Result<Question, &'static str> {
    let object = value.as_object().ok_or("element is not an object")?;

    let question_text = non_empty_text(object.get("questionText"))
        .ok_or("questionText is missing or empty")?;

    let raw_options = object
        .get("options")
        .and_then(Value::as_array)
        .ok_or("options is missing or not an array")?;

    if raw_options.len() != OPTIONS_PER_QUESTION {
        return Err("a question must have exactly 4 options");
    }

    let options = raw_options
        .iter()
        .map(|option| {
            non_empty_text(option.get("text"))
                .map(|text| AnswerOption { text })
                .ok_or("option text is missing or empty")
        })
        .collect::<Result<Vec<_>, _>>()?;

    let correct_answer = object
        .get("correctAnswer")
        .and_then(Value::as_u64)
        .filter(|&index| index < OPTIONS_PER_QUESTION as u64)
        .ok_or("correctAnswer must be an integer between 0 and 3")?;

    Ok(Question {
        question_text,
        options,
        correct_answer: correct_answer as usize,
    })
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}
