//! # docgraph
//!
//! Language-agnostic core of an API documentation generator.
//!
//! ## Core Principles
//!
//! - **Static only**: records come from parsing source, never from importing it
//! - **Records first**: parsers emit plain [`Entity`] trees that serialize as-is
//! - **Explicit passes**: resolution, hiding and selection are separate steps
//!   the caller runs in order
//!
//! ## Architecture
//!
//! ```text
//! Language parser (entity records, placeholders for re-exports)
//!     ↓
//! PlaceholderResolver (re-exports → copies of their definitions)
//!     ↓
//! Pre-hiding passes (stdlib inheritance, non-public names)
//!     ↓
//! ObjectStore (arena of objects, hierarchy, docstrings, type hints)
//!     ↓
//! VisibilityFilter (display decisions, own-page selection)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use docgraph::{resolve_placeholders, DisplayConfig, Entity, EntityKind, ObjectStore, VisibilityFilter};
//!
//! let thing = Entity::new(EntityKind::Class, "Thing", "Thing", "p.m.Thing").with_doc("A thing.");
//! let mut modules = vec![
//!     Entity::new(EntityKind::Package, "p", "p", "p")
//!         .with_children(vec![Entity::placeholder("Thing", "Thing", "p.Thing", "p.m.Thing")]),
//!     Entity::new(EntityKind::Module, "p.m", "p.m", "p.m").with_children(vec![thing]),
//! ];
//!
//! let warnings = resolve_placeholders(&mut modules);
//! assert!(warnings.is_empty());
//!
//! let config = DisplayConfig::default();
//! let (mut store, _) = ObjectStore::build(modules, &config);
//! VisibilityFilter::new(&config).select(&mut store);
//! assert!(store.lookup("p.Thing").is_ok());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod export;
pub mod merge;
pub mod objects;
pub mod resolver;
pub mod storage;
pub mod visibility;

// Re-export main types
pub use config::{ClassContent, DisplayConfig, DocOption, DocOptions, MemberOrder, OWN_PAGE_LEVELS};
pub use diagnostics::{Diagnostic, Diagnostics, WarningCategory};
pub use entity::{ArgInfo, ArgPrefix, Entity, EntityKind, FunctionProperty, InheritedFrom, Overload};
pub use error::{DocError, Result};
pub use merge::{merge_inherited, ChildCollector, Redefinition};
pub use objects::{format_args, ApiObject, ObjectId, ObjectStore};
pub use resolver::{resolve_placeholder, resolve_placeholders, PlaceholderResolver};
pub use storage::{JsonFileStore, MemoryStore, SnapshotStore, SourceSnapshot};
pub use visibility::{hide_non_public_children, hide_stdlib_inherited, SkipHook, VisibilityFilter};
