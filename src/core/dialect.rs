//! Dialect parser: the central scanning algorithm of the compiler.
//!
//! Body text (frontmatter already stripped) is scanned for three things:
//!
//! - directive blocks: `!slide { ... }` with a JSON object payload,
//! - pause triggers: maximal runs of three or more literal periods,
//! - the spoken word count of the surrounding prose.
//!
//! Directive payloads are delimited by balanced braces. The scanner is an
//! explicit three-state machine (outside-string / in-string / escaped) so a
//! `{` or `}` inside a quoted string value never terminates the block early,
//! and an escaped quote never terminates the string.

use crate::core::error::ScriptoriumError;
use crate::core::record::Directive;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Marker token that opens a directive block.
pub const DIRECTIVE_MARKER: &str = "!slide";

/// Result of scanning one document body.
#[derive(Debug)]
pub struct DialectScan {
    /// Directives in source order. Identity is positional.
    pub directives: Vec<Directive>,
    /// Whitespace-delimited tokens in the prose, directive payloads excluded.
    pub word_count: u64,
    /// Maximal runs of three or more periods, one trigger per run.
    pub pause_count: u64,
    /// Blocks rejected in best-effort mode, with their structural errors.
    pub skipped: Vec<ScriptoriumError>,
}

fn pause_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.{3,}").expect("pause trigger regex"))
}

/// Scan a document body for directives, pause triggers, and word count.
///
/// In strict mode (the default for the pipeline) a single malformed block
/// fails the whole document. With `best_effort` set, structurally invalid
/// blocks are skipped and reported in `DialectScan::skipped`; an unterminated
/// block still fails the document since the scanner cannot resynchronize.
pub fn scan(body: &str, best_effort: bool) -> Result<DialectScan, ScriptoriumError> {
    let mut directives = Vec::new();
    let mut skipped = Vec::new();
    let mut prose = String::with_capacity(body.len());
    let mut cursor = 0usize;

    while let Some(found) = body[cursor..].find(DIRECTIVE_MARKER) {
        let marker_start = cursor + found;
        let after_marker = marker_start + DIRECTIVE_MARKER.len();

        // Whitespace between the marker and its opening brace is tolerated.
        let brace_start = after_marker
            + body[after_marker..]
                .char_indices()
                .find(|(_, c)| !c.is_whitespace())
                .map(|(idx, _)| idx)
                .unwrap_or(body.len() - after_marker);

        if body[brace_start..].chars().next() != Some('{') {
            // Bare marker with no payload: plain prose, not a directive.
            prose.push_str(&body[cursor..after_marker]);
            cursor = after_marker;
            continue;
        }

        prose.push_str(&body[cursor..marker_start]);

        let block_end = match scan_balanced_block(body, brace_start) {
            Some(end) => end,
            None => {
                return Err(ScriptoriumError::UnterminatedDirective {
                    line: line_of(body, marker_start),
                    offset: marker_start,
                });
            }
        };

        let payload = &body[brace_start..block_end];
        match parse_payload(payload, line_of(body, marker_start)) {
            Ok(directive) => directives.push(directive),
            Err(err) if best_effort => skipped.push(err),
            Err(err) => return Err(err),
        }
        cursor = block_end;
    }
    prose.push_str(&body[cursor..]);

    let word_count = prose.split_whitespace().count() as u64;
    let pause_count = pause_regex().find_iter(&prose).count() as u64;

    Ok(DialectScan {
        directives,
        word_count,
        pause_count,
        skipped,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InString,
    Escaped,
}

/// Find the end (exclusive byte offset) of a balanced-brace block starting at
/// `open`, which must point at `{`. Returns `None` when the block never
/// returns to depth zero outside a string.
fn scan_balanced_block(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i64;
    let mut state = ScanState::Outside;
    for (idx, c) in text[open..].char_indices() {
        match state {
            ScanState::Escaped => state = ScanState::InString,
            ScanState::InString => match c {
                '\\' => state = ScanState::Escaped,
                '"' => state = ScanState::Outside,
                _ => {}
            },
            ScanState::Outside => match c {
                '"' => state = ScanState::InString,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + idx + c.len_utf8());
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Validate a directive payload against the minimum required shape.
///
/// `layout` and `content` must be strings; every other field is preserved
/// verbatim as forward-compatible passthrough.
fn parse_payload(payload: &str, line: usize) -> Result<Directive, ScriptoriumError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| ScriptoriumError::DirectiveSchema {
            line,
            detail: format!("payload is not a valid JSON object: {}", e),
        })?;
    let Value::Object(mut fields) = value else {
        return Err(ScriptoriumError::DirectiveSchema {
            line,
            detail: "payload must be a JSON object".to_string(),
        });
    };

    let layout = take_string_field(&mut fields, "layout", line)?;
    let content = take_string_field(&mut fields, "content", line)?;

    Ok(Directive {
        layout,
        content,
        extra: fields,
    })
}

fn take_string_field(
    fields: &mut serde_json::Map<String, Value>,
    name: &str,
    line: usize,
) -> Result<String, ScriptoriumError> {
    match fields.remove(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ScriptoriumError::DirectiveSchema {
            line,
            detail: format!("field `{}` must be a string, got `{}`", name, other),
        }),
        None => Err(ScriptoriumError::DirectiveSchema {
            line,
            detail: format!("missing required field `{}`", name),
        }),
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}
