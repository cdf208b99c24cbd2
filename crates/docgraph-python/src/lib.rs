//! # docgraph-python
//!
//! Python frontend for docgraph - extracts documentable entities from Python
//! sources by parsing them, never by importing them.
//!
//! ## Features
//!
//! - Discover modules and packages under source directories, with ignore
//!   patterns and implicit namespace packages
//! - Functions, classes, methods, properties, data and attributes with
//!   docstrings, signatures and annotations (including `# type:` comments)
//! - Overload groups, constructor attributes and abstract detection
//! - Inherited members merged along the C3 method resolution order
//! - Re-exports emitted as placeholders for cross-module resolution
//! - Safe: No panics, per-file failures are reported and skipped
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docgraph::DisplayConfig;
//! use docgraph_python::{LoaderConfig, PythonMapper};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoaderConfig::new(["src/mypkg"]);
//! let mut mapper = PythonMapper::new(config, DisplayConfig::default())?;
//! let api = mapper.run()?;
//!
//! for page in api.objects.objects_to_render() {
//!     println!("{} - {}", page.id(), page.summary());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Single files go through the [`SourceParser`] trait:
//!
//! ```rust,no_run
//! use docgraph_python::{PythonParser, SourceParser};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let parser = PythonParser::new();
//! let module = parser.parse_source("def f(a: int) -> bool: ...\n", "m", Path::new("m.py"), false)?;
//! assert_eq!(module.children[0].full_name, "m.f");
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod mapper;
pub mod module_cache;
pub mod parser;
pub mod stdlib;

mod ancestors;
mod annotations;
mod args;
mod docstring;
mod literal;
mod parser_impl;
mod scope;
mod visitor;

// Re-export parser-api types for convenience
pub use docgraph_parser_api::{
    FileInfo, LoaderConfig, ParsedModule, ParserError, ParserMetrics, ParserResult, ProjectInfo,
    SourceFile, SourceParser,
};

pub use loader::{Discovery, LoadOutcome, LoadedModules, ModuleLoader};
pub use mapper::{MappedApi, PythonMapper};
pub use module_cache::{ModuleCache, SourceModule};
pub use parser::ModuleParser;
pub use parser_impl::PythonParser;
