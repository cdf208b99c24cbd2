use crate::{errors::ParserError, metrics::ParserMetrics};
use docgraph::Entity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A discovered source file and the module it defines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Directory the module name is computed relative to
    pub dir_root: PathBuf,

    /// Path to the source file
    pub path: PathBuf,

    /// Dotted module name
    pub module_name: String,

    /// Whether the file is a package initializer
    pub is_package: bool,
}

/// Information about a successfully parsed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path to the source file
    pub file_path: PathBuf,

    /// Dotted module name
    pub module_name: String,

    /// Encoding the source was decoded with
    pub encoding: String,

    /// Number of entity records produced, all nesting levels included
    pub entity_count: usize,

    /// Time taken to parse this file
    #[serde(with = "duration_serde")]
    pub parse_time: Duration,

    /// Number of lines in the file
    pub line_count: usize,

    /// File size in bytes
    pub byte_count: usize,
}

// Helper module for serializing Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: u64 = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// A module record together with its parse summary
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedModule {
    /// Module or package record with nested children
    pub entity: Entity,

    /// Parse summary
    pub info: FileInfo,
}

/// Aggregate information about a parsed project
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Information about each successfully parsed file
    pub files: Vec<FileInfo>,

    /// Total parse time for all files
    #[serde(with = "duration_serde")]
    pub total_parse_time: Duration,

    /// Files that failed to parse (path, error message)
    pub failed_files: Vec<(PathBuf, String)>,
}

impl ProjectInfo {
    /// Total number of files processed (success + failure)
    pub fn total_files(&self) -> usize {
        self.files.len() + self.failed_files.len()
    }

    /// Total number of entity records across all files
    pub fn total_entities(&self) -> usize {
        self.files.iter().map(|f| f.entity_count).sum()
    }

    /// Success rate (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_files() == 0 {
            0.0
        } else {
            self.files.len() as f64 / self.total_files() as f64
        }
    }
}

/// Core trait that all language frontends implement
///
/// A frontend turns one source file into a module [`Entity`] tree. Names
/// imported from other documented modules are emitted as placeholders and
/// resolved later by [`docgraph::PlaceholderResolver`].
///
/// # Thread Safety
/// Implementations must be `Send + Sync`.
pub trait SourceParser: Send + Sync {
    /// Returns the language identifier (lowercase, e.g., "python")
    fn language(&self) -> &str;

    /// Returns the default filename patterns (e.g., ["*.py", "*.pyi"])
    fn file_patterns(&self) -> &[&str];

    /// Parse a single file into a module record
    ///
    /// **Note on Metrics**: This method updates parser metrics
    /// (files_attempted, files_succeeded, etc.).
    ///
    /// # Errors
    /// Returns `ParserError` if:
    /// - File cannot be read or decoded
    /// - File exceeds the configured size limit
    /// - Source code has syntax errors
    fn parse_file(&self, file: &SourceFile) -> Result<ParsedModule, ParserError>;

    /// Parse source text into a module record
    ///
    /// **Note on Metrics**: This method does NOT update parser metrics.
    /// Only `parse_file()` updates metrics to avoid double-counting.
    fn parse_source(
        &self,
        source: &str,
        module_name: &str,
        file_path: &Path,
        is_package: bool,
    ) -> Result<Entity, ParserError>;

    /// Parse multiple files
    ///
    /// Failures are collected in `ProjectInfo::failed_files`; they never
    /// abort the remaining files.
    fn parse_files(&self, files: &[SourceFile]) -> (Vec<ParsedModule>, ProjectInfo) {
        let mut parsed = Vec::new();
        let mut info = ProjectInfo::default();

        for file in files {
            match self.parse_file(file) {
                Ok(module) => {
                    info.total_parse_time += module.info.parse_time;
                    info.files.push(module.info.clone());
                    parsed.push(module);
                }
                Err(e) => {
                    info.failed_files.push((file.path.clone(), e.to_string()));
                }
            }
        }

        (parsed, info)
    }

    /// Check if this parser can handle the given file
    ///
    /// Default implementation compares the extension with the `*.ext`
    /// patterns of [`SourceParser::file_patterns`].
    fn can_parse(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let pattern = format!("*.{}", ext.to_string_lossy());
                self.file_patterns().contains(&pattern.as_str())
            }
            None => false,
        }
    }

    /// Get accumulated metrics
    fn metrics(&self) -> ParserMetrics;

    /// Reset metrics
    fn reset_metrics(&mut self);
}
