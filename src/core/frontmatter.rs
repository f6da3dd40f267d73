//! Frontmatter extraction for vault source documents.
//!
//! A document may open with a metadata block delimited by `---` marker lines.
//! The interior is a flat `key: value` mapping; values are scalars or arrays
//! of scalars. Nested objects are not part of the dialect and are rejected.

use crate::core::error::ScriptoriumError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Marker line that opens and closes a frontmatter block.
pub const BOUNDARY_MARKER: &str = "---";

pub type Frontmatter = BTreeMap<String, Value>;

/// Split a leading frontmatter block from the document body.
///
/// Absent block yields an empty mapping and the full text as body. A block
/// that opens without closing, or with an unparseable interior, fails with
/// the offending 1-based line number.
pub fn extract(text: &str) -> Result<(Frontmatter, &str), ScriptoriumError> {
    let mut lines = LineCursor::new(text);

    let Some((first_line, _)) = lines.next() else {
        return Ok((Frontmatter::new(), text));
    };
    if first_line.trim_end() != BOUNDARY_MARKER {
        return Ok((Frontmatter::new(), text));
    }

    let mut map = Frontmatter::new();
    for (line, line_no) in lines.by_ref() {
        let trimmed = line.trim_end();
        if trimmed == BOUNDARY_MARKER {
            let body = &text[lines.offset()..];
            return Ok((map, body));
        }
        if trimmed.trim().is_empty() {
            continue;
        }
        let (key, raw_value) = trimmed.split_once(':').ok_or_else(|| {
            ScriptoriumError::FrontmatterParse {
                line: line_no,
                detail: format!("expected `key: value`, got `{}`", trimmed.trim()),
            }
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ScriptoriumError::FrontmatterParse {
                line: line_no,
                detail: "empty key".to_string(),
            });
        }
        if map.contains_key(key) {
            return Err(ScriptoriumError::FrontmatterParse {
                line: line_no,
                detail: format!("duplicate key `{}`", key),
            });
        }
        let value = parse_value(raw_value.trim(), line_no)?;
        map.insert(key.to_string(), value);
    }

    Err(ScriptoriumError::FrontmatterParse {
        line: 1,
        detail: "opening marker has no matching closing marker".to_string(),
    })
}

/// Parse a frontmatter value: scalar or flat array.
fn parse_value(raw: &str, line: usize) -> Result<Value, ScriptoriumError> {
    if raw.is_empty() {
        return Ok(Value::String(String::new()));
    }
    if raw.starts_with('{') {
        return Err(ScriptoriumError::FrontmatterParse {
            line,
            detail: "nested objects are not supported in frontmatter".to_string(),
        });
    }
    if raw.starts_with('[') {
        return parse_array(raw, line);
    }
    parse_scalar(raw, line)
}

fn parse_array(raw: &str, line: usize) -> Result<Value, ScriptoriumError> {
    // JSON syntax first (quoted strings, numbers), then bare comma-separated
    // words as a fallback for hand-authored lists.
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        if let Value::Array(items) = &value {
            if let Some(bad) = items.iter().find(|item| item.is_object() || item.is_array()) {
                return Err(ScriptoriumError::FrontmatterParse {
                    line,
                    detail: format!("array elements must be scalars, got `{}`", bad),
                });
            }
            return Ok(value);
        }
    }
    let Some(interior) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) else {
        return Err(ScriptoriumError::FrontmatterParse {
            line,
            detail: format!("unterminated array `{}`", raw),
        });
    };
    let mut items = Vec::new();
    for part in interior.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        items.push(parse_scalar(part, line)?);
    }
    Ok(Value::Array(items))
}

fn parse_scalar(raw: &str, line: usize) -> Result<Value, ScriptoriumError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => Err(ScriptoriumError::FrontmatterParse {
            line,
            detail: "null is not a supported frontmatter value".to_string(),
        }),
        Ok(value @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => Ok(value),
        // Bare words (unquoted strings) fall through JSON parsing.
        _ => Ok(Value::String(raw.to_string())),
    }
}

/// Line iterator that tracks the byte offset of the next unread line, so the
/// body slice can be taken directly from the source text.
struct LineCursor<'a> {
    text: &'a str,
    offset: usize,
    line_no: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        LineCursor {
            text,
            offset: 0,
            line_no: 0,
        }
    }

    fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = (&'a str, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.offset..];
        let (line, consumed) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], idx + 1),
            None => (rest, rest.len()),
        };
        self.offset += consumed;
        self.line_no += 1;
        Some((line, self.line_no))
    }
}
