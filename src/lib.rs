//! # vardecl - Declare implicit globals in JavaScript
//!
//! Rewrites JavaScript so that every plain `=` assignment to an undeclared
//! name declares it with `var`, touching as little text as possible.
//!
//! vardecl provides:
//! - A tree-sitter based syntax layer with a declaration pre-pass
//! - A single forward pass that places each declaration inline when it can
//!   and hoists it to the innermost scope covering every use otherwise
//! - An offset-indexed editor that renders the result with a source map
//! - File discovery, configuration and a parallel pipeline for the CLI
//!
//! ```
//! let result = vardecl::add_variable_declarations("a = 1;\nf(b = 2);\n")?;
//! assert_eq!(result.code, "var b;\nvar a = 1;\nf(b = 2);\n");
//! # Ok::<(), vardecl::Error>(())
//! ```

pub mod syntax;
pub mod pattern;
pub mod scope;
pub mod ledger;
pub mod commit;
pub mod edit;
pub mod transform;
pub mod config;
pub mod discover;
pub mod pipeline;
pub mod watcher;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use edit::SourceMap;
pub use transform::{add_variable_declarations, Options, Stats, Transformed, Transformer};

/// Result type alias for vardecl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for vardecl operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Language error: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// A traversal bug, never caused by the input
    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Message sent from parallel pipeline workers to the coordinator
#[derive(Debug)]
pub enum FileMessage {
    Processed(pipeline::FileReport),
    Error(String, String),
}

/// Outcome for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Changed,
    Unchanged,
    Failed,
}
