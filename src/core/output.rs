//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps batch result output bounded and readable while preserving signal.

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_line_bounds_length() {
        let line = compact_line("one\ntwo   three", 7);
        assert_eq!(line, "one two...");
    }

    #[test]
    fn short_input_passes_through_unmarked() {
        assert_eq!(compact_line("all fine", 20), "all fine");
    }
}
