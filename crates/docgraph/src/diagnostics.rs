//! Structured warnings collected while loading and mapping.
//!
//! Every warning is emitted through `log` with its category and also kept as a
//! [`Diagnostic`] so callers can inspect what happened after a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category attached to each warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCategory {
    /// A re-export could not be followed to its definition
    PythonImportResolution,
    /// The selection pass produced no pages
    NothingRendered,
    /// A source file could not be read or parsed
    NotReadable,
    /// A record kind has no object counterpart
    UnknownType,
}

impl WarningCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCategory::PythonImportResolution => "python_import_resolution",
            WarningCategory::NothingRendered => "nothing_rendered",
            WarningCategory::NotReadable => "not_readable",
            WarningCategory::UnknownType => "unknown_type",
        }
    }
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: WarningCategory,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.category)
    }
}

/// Ordered list of warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a warning and keep it.
    pub fn warn(&mut self, category: WarningCategory, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{} [{}]", message, category);
        self.entries.push(Diagnostic { category, message });
    }

    /// Append diagnostics recorded elsewhere without logging them again.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Warnings of one category, in emission order.
    pub fn of_category(&self, category: WarningCategory) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_records_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(WarningCategory::NotReadable, "first");
        diagnostics.warn(WarningCategory::PythonImportResolution, "second");
        diagnostics.warn(WarningCategory::NotReadable, "third");

        assert_eq!(diagnostics.len(), 3);
        let unreadable = diagnostics.of_category(WarningCategory::NotReadable);
        assert_eq!(unreadable.len(), 2);
        assert_eq!(unreadable[1].message, "third");
    }

    #[test]
    fn test_category_names() {
        assert_eq!(
            WarningCategory::PythonImportResolution.to_string(),
            "python_import_resolution"
        );
        let json = serde_json::to_string(&WarningCategory::NothingRendered).unwrap();
        assert_eq!(json, "\"nothing_rendered\"");
    }
}
