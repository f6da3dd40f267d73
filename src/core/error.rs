use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptoriumError {
    #[error("Discovery error: {0}")]
    Discovery(String),
    #[error("Decode error in {path}: {detail}")]
    Decode { path: PathBuf, detail: String },
    #[error("Frontmatter parse error at line {line}: {detail}")]
    FrontmatterParse { line: usize, detail: String },
    #[error("Unterminated directive block starting at line {line} (offset {offset})")]
    UnterminatedDirective { line: usize, offset: usize },
    #[error("Directive schema error at line {line}: {detail}")]
    DirectiveSchema { line: usize, detail: String },
    #[error("Schema validation failed: {}", .0.join("; "))]
    SchemaValidation(Vec<String>),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Lock contention: {0}")]
    LockContention(String),
}
