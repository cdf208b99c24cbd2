use std::path::{Path, PathBuf};
use thiserror::Error;

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur while loading and parsing sources
#[derive(Error, Debug)]
pub enum ParserError {
    /// Failed to read file
    #[error("IO error reading {0}: {1}")]
    IoError(PathBuf, #[source] std::io::Error),

    /// Syntax error in source code
    #[error("Syntax error in {0}:{1}:{2}: {3}")]
    SyntaxError(PathBuf, usize, usize, String),

    /// File too large
    #[error("File {0} exceeds maximum size ({1} bytes)")]
    FileTooLarge(PathBuf, usize),

    /// Source could not be decoded with its declared encoding
    #[error("Cannot decode {0}: {1}")]
    EncodingError(PathBuf, String),

    /// Configured source directory does not exist
    #[error("Source directory {0} does not exist")]
    MissingDirectory(PathBuf),

    /// No file matched the configured patterns
    #[error("No source files found in {}", display_paths(.0))]
    NoSourceFiles(Vec<PathBuf>),

    /// Invalid loader configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot or record storage failure
    #[error(transparent)]
    Storage(#[from] docgraph::DocError),

    /// Generic parsing error
    #[error("Parse error in {0}: {1}")]
    ParseError(PathBuf, String),
}

impl ParserError {
    /// Path of the file the error is about, if it concerns one file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ParserError::IoError(path, _)
            | ParserError::SyntaxError(path, ..)
            | ParserError::FileTooLarge(path, _)
            | ParserError::EncodingError(path, _)
            | ParserError::ParseError(path, _) => Some(path),
            _ => None,
        }
    }

    /// Whether the error concerns a single file and loading can continue.
    pub fn is_per_file(&self) -> bool {
        self.path().is_some()
    }
}

/// Result type for parser operations
pub type ParserResult<T> = Result<T, ParserError>;
