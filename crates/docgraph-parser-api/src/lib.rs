//! docgraph Parser API
//!
//! Shared trait and types for building docgraph language frontends.
//!
//! This crate provides the foundation for implementing frontends that feed
//! entity records into the docgraph core. It defines:
//!
//! - **SourceParser trait**: The interface every language frontend implements
//! - **Loader configuration**: Directories, patterns, ignore globs, namespace
//!   mode and incremental-build settings
//! - **Metrics**: Performance and success tracking
//! - **Error handling**: Fatal configuration errors and per-file failures
//!
//! # Example
//!
//! ```rust,ignore
//! use docgraph_parser_api::{LoaderConfig, SourceParser};
//!
//! let config = LoaderConfig::new(["src/mypkg"]).with_file_patterns(["*.pyi", "*.py"]);
//! config.validate()?;
//! ```

pub mod config;
pub mod errors;
pub mod metrics;
pub mod traits;

// Re-export commonly used types
pub use config::LoaderConfig;
pub use errors::{ParserError, ParserResult};
pub use metrics::ParserMetrics;
pub use traits::{FileInfo, ParsedModule, ProjectInfo, SourceFile, SourceParser};
