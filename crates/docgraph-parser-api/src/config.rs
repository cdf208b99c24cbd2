use crate::errors::{ParserError, ParserResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for source discovery and loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directories to document
    pub dirs: Vec<PathBuf>,

    /// Filename patterns; earlier patterns win when two files normalize to
    /// the same module (e.g. `*.pyi` listed before `*.py`)
    pub file_patterns: Vec<String>,

    /// Path patterns to skip; matched against the full path
    pub ignore: Vec<String>,

    /// Treat directories without an `__init__` file as packages
    pub use_implicit_namespace: bool,

    /// Reuse the previous build when no source changed
    pub keep_files: bool,

    /// Maximum file size to parse (in bytes)
    /// Files larger than this will be skipped
    pub max_file_size: usize,

    /// Extra roots searched when locating ancestor classes defined outside
    /// the documented directories (not documented themselves)
    pub search_paths: Vec<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            file_patterns: vec!["*.py".to_string(), "*.pyi".to_string()],
            ignore: vec!["*migrations*".to_string()],
            use_implicit_namespace: false,
            keep_files: false,
            max_file_size: 10 * 1024 * 1024, // 10 MB
            search_paths: Vec::new(),
        }
    }
}

impl LoaderConfig {
    /// Config documenting the given directories with default patterns
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Replace the filename patterns
    pub fn with_file_patterns<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.file_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the ignore patterns
    pub fn with_ignore<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Enable implicit namespace packages
    pub fn with_implicit_namespace(mut self, enabled: bool) -> Self {
        self.use_implicit_namespace = enabled;
        self
    }

    /// Keep results of the previous build when sources are unchanged
    pub fn with_keep_files(mut self, keep_files: bool) -> Self {
        self.keep_files = keep_files;
        self
    }

    /// Set maximum file size
    pub fn with_max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Add a root searched for ancestor classes
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Check that the configuration can be used for a load
    pub fn validate(&self) -> ParserResult<()> {
        if self.dirs.is_empty() {
            return Err(ParserError::InvalidConfig(
                "at least one source directory is required".to_string(),
            ));
        }
        if self.file_patterns.is_empty() {
            return Err(ParserError::InvalidConfig(
                "at least one file pattern is required".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(ParserError::InvalidConfig(
                "max_file_size must be greater than zero".to_string(),
            ));
        }
        if let Some(dir) = self.dirs.iter().find(|dir| !dir.is_dir()) {
            return Err(ParserError::MissingDirectory(dir.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.file_patterns, vec!["*.py", "*.pyi"]);
        assert_eq!(config.ignore, vec!["*migrations*"]);
        assert!(!config.use_implicit_namespace);
        assert!(!config.keep_files);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_builder_methods() {
        let config = LoaderConfig::new(["src"])
            .with_file_patterns(["*.pyi", "*.py"])
            .with_ignore(Vec::<String>::new())
            .with_implicit_namespace(true)
            .with_keep_files(true)
            .with_search_path("/usr/lib/python3/");
        assert_eq!(config.dirs, vec![PathBuf::from("src")]);
        assert_eq!(config.file_patterns[0], "*.pyi");
        assert!(config.ignore.is_empty());
        assert!(config.use_implicit_namespace);
        assert_eq!(config.search_paths.len(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            LoaderConfig::default().validate(),
            Err(ParserError::InvalidConfig(_))
        ));
        assert!(matches!(
            LoaderConfig::new(["/definitely/not/here"]).validate(),
            Err(ParserError::MissingDirectory(_))
        ));
        let dir = std::env::temp_dir();
        assert!(LoaderConfig::new([dir]).validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{"dirs": ["pkg"], "keep_files": true}"#).unwrap();
        assert_eq!(config.dirs, vec![PathBuf::from("pkg")]);
        assert!(config.keep_files);
        assert_eq!(config.file_patterns.len(), 2);
    }
}
