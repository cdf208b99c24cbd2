//! Export of parsed records and selected objects for external tools.
//!
//! - **JSON**: resolved entity records keyed by module, and the rendered
//!   object selection with display decisions

pub mod json;

pub use json::{export_entities_json, export_objects_json};
