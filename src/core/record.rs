//! Canonical content records and the metadata assembler.
//!
//! A `ContentRecord` is the compiled form of one source document. It is
//! produced fresh on every compile and superseded wholesale on recompile;
//! partial field updates do not exist.

use crate::core::error::ScriptoriumError;
use crate::core::frontmatter::Frontmatter;
use crate::core::time;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title used when the frontmatter does not provide one.
pub const DEFAULT_TITLE: &str = "Untitled";

/// One embedded structured instruction block, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub layout: String,
    pub content: String,
    /// Forward-compatible passthrough: any additional payload fields are
    /// carried verbatim into the artifact.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The canonical artifact persisted as the sovereign pair of a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub title: String,
    pub source_path: String,
    pub word_count: u64,
    pub pause_count: u64,
    pub duration_seconds: f64,
    pub directives: Vec<Directive>,
    pub frontmatter: Frontmatter,
    pub compiled_at: String,
}

/// Merge parsed parts into a schema-validated `ContentRecord`.
///
/// All violations are collected into a single `SchemaValidation` error so a
/// caller sees everything wrong with a document at once. `compiled_at` is
/// stamped only on success.
pub fn assemble(
    id: &str,
    source_path: &str,
    frontmatter: Frontmatter,
    directives: Vec<Directive>,
    word_count: u64,
    pause_count: u64,
    duration_seconds: f64,
) -> Result<ContentRecord, ScriptoriumError> {
    let mut violations = Vec::new();

    if id.trim().is_empty() {
        violations.push("id: must not be empty".to_string());
    }
    if source_path.trim().is_empty() {
        violations.push("source_path: must not be empty".to_string());
    }
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        violations.push(format!(
            "duration_seconds: must be a non-negative number, got {}",
            duration_seconds
        ));
    }

    let title = match frontmatter.get("title") {
        None => DEFAULT_TITLE.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => {
            violations.push("frontmatter.title: must not be empty".to_string());
            String::new()
        }
        Some(other) => {
            violations.push(format!(
                "frontmatter.title: expected string, got `{}`",
                other
            ));
            String::new()
        }
    };

    for (key, value) in &frontmatter {
        if let Some(detail) = frontmatter_value_violation(key, value) {
            violations.push(detail);
        }
    }

    if !violations.is_empty() {
        return Err(ScriptoriumError::SchemaValidation(violations));
    }

    Ok(ContentRecord {
        id: id.to_string(),
        title,
        source_path: source_path.to_string(),
        word_count,
        pause_count,
        duration_seconds,
        directives,
        frontmatter,
        compiled_at: time::now_epoch_z(),
    })
}

/// Frontmatter values must be scalars or flat arrays of scalars. The parser
/// guarantees this for file-sourced maps; callers assembling records directly
/// get the same check.
fn frontmatter_value_violation(key: &str, value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => Some(format!("frontmatter.{}: nested objects are not allowed", key)),
        Value::Null => Some(format!("frontmatter.{}: null is not allowed", key)),
        Value::Array(items) => items
            .iter()
            .find(|item| item.is_object() || item.is_array() || item.is_null())
            .map(|item| {
                format!(
                    "frontmatter.{}: array elements must be scalars, got `{}`",
                    key, item
                )
            }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frontmatter(pairs: &[(&str, Value)]) -> Frontmatter {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn assembles_with_frontmatter_title() {
        let record = assemble(
            "lesson_001",
            "01_intro/lesson_001.md",
            frontmatter(&[("title", json!("First Lesson"))]),
            Vec::new(),
            10,
            1,
            6.0,
        )
        .expect("assemble");
        assert_eq!(record.title, "First Lesson");
        assert_eq!(record.word_count, 10);
        assert!(record.compiled_at.ends_with('Z'));
    }

    #[test]
    fn missing_title_defaults() {
        let record = assemble("x", "01_a/x.md", Frontmatter::new(), Vec::new(), 0, 0, 0.0)
            .expect("assemble");
        assert_eq!(record.title, DEFAULT_TITLE);
    }

    #[test]
    fn violations_are_collected_not_first_only() {
        let err = assemble(
            "",
            "",
            frontmatter(&[("title", json!(42)), ("meta", json!({"a": 1}))]),
            Vec::new(),
            0,
            0,
            f64::NAN,
        )
        .unwrap_err();
        match err {
            ScriptoriumError::SchemaValidation(violations) => {
                assert!(violations.len() >= 4, "got: {:?}", violations);
                assert!(violations.iter().any(|v| v.starts_with("id:")));
                assert!(violations.iter().any(|v| v.starts_with("duration_seconds:")));
                assert!(violations.iter().any(|v| v.contains("frontmatter.title")));
                assert!(violations.iter().any(|v| v.contains("frontmatter.meta")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn directive_passthrough_survives_serialization() {
        let mut extra = serde_json::Map::new();
        extra.insert("theme".to_string(), json!("dark"));
        let record = assemble(
            "x",
            "01_a/x.md",
            Frontmatter::new(),
            vec![Directive {
                layout: "Title".to_string(),
                content: "c".to_string(),
                extra,
            }],
            0,
            0,
            0.0,
        )
        .expect("assemble");
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["directives"][0]["theme"], "dark");
        assert_eq!(value["directives"][0]["layout"], "Title");
    }
}
