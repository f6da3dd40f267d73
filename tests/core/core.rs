use scriptorium::core::config::CompileConfig;
use scriptorium::core::error::ScriptoriumError;
use scriptorium::core::pipeline::{self, CompileOptions};
use scriptorium::core::record::ContentRecord;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_doc(root: &Path, rel: &str, text: &str) -> std::path::PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(&path, text).expect("write doc");
    path
}

fn compile(root: &Path, path: &Path) -> Result<ContentRecord, ScriptoriumError> {
    pipeline::compile(
        path,
        &CompileConfig::new(root.to_path_buf()),
        &CompileOptions::default(),
    )
}

#[test]
fn representative_document_compiles_end_to_end() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let text = concat!(
        "---\n",
        "title: Anatomy of the Hand\n",
        "module: \"02_medicine\"\n",
        "tags: [bones, tendons]\n",
        "day: 4\n",
        "---\n",
        "The hand has twenty seven bones... Let us begin.\n",
        "!slide{\"layout\": \"Title\", \"content\": \"Anatomy of the Hand\"}\n",
        "Pay attention to the carpal tunnel..... It matters.\n",
        "!slide{\"layout\": \"Bullet Points\", \"content\": \"27 bones\", \"theme\": \"dark\"}\n",
    );
    let path = write_doc(root, "02_medicine/hand_anatomy.md", text);

    let record = compile(root, &path).expect("compile");
    assert_eq!(record.id, "hand_anatomy");
    assert_eq!(record.title, "Anatomy of the Hand");
    assert_eq!(record.source_path, "02_medicine/hand_anatomy.md");
    assert_eq!(record.frontmatter["day"], serde_json::json!(4));
    assert_eq!(
        record.frontmatter["tags"],
        serde_json::json!(["bones", "tendons"])
    );

    // Two directives in source order, passthrough preserved.
    assert_eq!(record.directives.len(), 2);
    assert_eq!(record.directives[0].layout, "Title");
    assert_eq!(record.directives[1].layout, "Bullet Points");
    assert_eq!(record.directives[1].extra["theme"], "dark");

    // Prose only: 9 words on the first line, 8 on the third.
    assert_eq!(record.word_count, 17);
    assert_eq!(record.pause_count, 2);

    // The duration invariant holds for the config used at compile time.
    let expected = (((17.0 / 150.0) * 60.0 + 2.0 * 2.0) * 10.0_f64).round() / 10.0;
    assert_eq!(record.duration_seconds, expected);
    assert!(record.compiled_at.ends_with('Z'));
}

#[test]
fn worked_duration_example_hundred_words_three_pauses() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();

    // Exactly 100 whitespace tokens; three of them end in pause runs, so the
    // pause markers add no extra tokens.
    let mut words: Vec<String> = (0..100).map(|i| format!("word{}", i)).collect();
    words[10].push_str("...");
    words[50].push_str("....");
    words[90].push_str("...");
    let text = format!("---\ntitle: Timing\n---\n{}\n", words.join(" "));
    let path = write_doc(root, "01_intro/timing.md", &text);

    let record = compile(root, &path).expect("compile");
    assert_eq!(record.word_count, 100);
    assert_eq!(record.pause_count, 3);
    // (100 / 150) * 60 + 3 * 2 = 46.0
    assert_eq!(record.duration_seconds, 46.0);
}

#[test]
fn recompiling_unchanged_input_is_identical_modulo_compiled_at() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let text = "---\ntitle: Stable\n---\nWords stay the same... !slide{\"layout\": \"Title\", \"content\": \"x\"}\n";
    let path = write_doc(root, "01_intro/stable.md", text);

    let first = compile(root, &path).expect("first compile");
    let second = compile(root, &path).expect("second compile");

    let mut a = serde_json::to_value(&first).expect("serialize");
    let mut b = serde_json::to_value(&second).expect("serialize");
    a.as_object_mut().expect("object").remove("compiled_at");
    b.as_object_mut().expect("object").remove("compiled_at");
    assert_eq!(a, b);
}

#[test]
fn braces_inside_payload_strings_compile_end_to_end() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let text = "---\ntitle: Code\n---\nLook: !slide{\"layout\": \"Code\", \"content\": \"if x { y() } else { \\\"}\\\" }\"} done.\n";
    let path = write_doc(root, "01_intro/code.md", text);

    let record = compile(root, &path).expect("compile");
    assert_eq!(record.directives.len(), 1);
    assert!(record.directives[0].content.contains("else"));
    assert_eq!(record.word_count, 2);
}

#[test]
fn unterminated_directive_reports_file_relative_line() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let text = "---\ntitle: Broken\n---\nFine line.\n!slide{\"layout\": \"Title\", \"content\": \"open\n";
    let path = write_doc(root, "01_intro/broken.md", text);

    let err = compile(root, &path).unwrap_err();
    match err {
        ScriptoriumError::UnterminatedDirective { line, .. } => assert_eq!(line, 5),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn frontmatter_errors_carry_line_numbers_through_compile() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let text = "---\ntitle: ok\nbroken line without colon\n---\nBody.\n";
    let path = write_doc(root, "01_intro/bad_frontmatter.md", text);

    let err = compile(root, &path).unwrap_err();
    match err {
        ScriptoriumError::FrontmatterParse { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_positive_words_per_minute_fails_before_reading_the_document() {
    let mut config = CompileConfig::new(std::path::PathBuf::from("/nowhere"));
    config.words_per_minute = -10.0;
    let err = pipeline::compile(
        Path::new("/nowhere/01_intro/missing.md"),
        &config,
        &CompileOptions::default(),
    )
    .unwrap_err();
    // A Decode error would mean the file was touched first.
    assert!(matches!(err, ScriptoriumError::Configuration(_)));
}

#[test]
fn mistyped_frontmatter_title_collects_schema_violation() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let text = "---\ntitle: 42\n---\nBody words.\n";
    let path = write_doc(root, "01_intro/numeric_title.md", text);

    let err = compile(root, &path).unwrap_err();
    match err {
        ScriptoriumError::SchemaValidation(violations) => {
            assert!(violations.iter().any(|v| v.contains("frontmatter.title")));
        }
        other => panic!("unexpected error: {other}"),
    }
}
