//! Core modules of the content compiler and versioned vault.
//!
//! The pipeline runs leaf-first: vault discovery, frontmatter extraction,
//! dialect parsing, duration estimation, record assembly, then the atomic
//! versioned write. Shared primitives (errors, config, time, output) live
//! alongside.

pub mod config;
pub mod dialect;
pub mod error;
pub mod estimate;
pub mod frontmatter;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod time;
pub mod vault;
pub mod writer;
