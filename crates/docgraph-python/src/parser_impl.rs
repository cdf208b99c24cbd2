//! Implementation of the SourceParser trait for Python
//!
//! This module provides the PythonParser struct that implements the
//! docgraph-parser-api::SourceParser trait. Every parsed module is kept in a
//! shared [`ModuleCache`] so later files can find their ancestor classes
//! without reading them twice.

use crate::module_cache::{decode_source, ModuleCache, SourceModule};
use crate::parser::ModuleParser;
use docgraph::Entity;
use docgraph_parser_api::{
    FileInfo, LoaderConfig, ParsedModule, ParserError, ParserMetrics, SourceFile, SourceParser,
};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Python language parser implementing the SourceParser trait
pub struct PythonParser {
    config: LoaderConfig,
    cache: Arc<ModuleCache>,
    metrics: Mutex<ParserMetrics>,
}

impl PythonParser {
    /// Create a new Python parser with default configuration
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a new Python parser with custom configuration
    ///
    /// The documented directories and the configured search paths become
    /// roots of the module cache.
    pub fn with_config(config: LoaderConfig) -> Self {
        let roots = config
            .dirs
            .iter()
            .chain(config.search_paths.iter())
            .cloned()
            .collect();
        Self {
            config,
            cache: Arc::new(ModuleCache::new(roots)),
            metrics: Mutex::new(ParserMetrics::default()),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Modules parsed so far, shared with ancestor lookup
    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    /// Update metrics after parsing a file
    fn update_metrics(&self, success: bool, duration: Duration, entities: usize) {
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        metrics.files_attempted += 1;
        if success {
            metrics.files_succeeded += 1;
        } else {
            metrics.files_failed += 1;
        }
        metrics.total_parse_time += duration;
        metrics.total_entities += entities;
    }

    fn read_module(&self, file: &SourceFile) -> Result<Arc<SourceModule>, ParserError> {
        let path = file.path.as_path();
        let metadata =
            std::fs::metadata(path).map_err(|e| ParserError::IoError(path.to_path_buf(), e))?;
        if metadata.len() > self.config.max_file_size as u64 {
            warn!("File too large: {} bytes", metadata.len());
            return Err(ParserError::FileTooLarge(
                path.to_path_buf(),
                metadata.len() as usize,
            ));
        }

        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError(path.to_path_buf(), e))?;
        let decoded = decode_source(&bytes, path)?;
        if decoded.lossy {
            warn!(
                category = "not_readable",
                encoding = %decoded.encoding,
                "Unsupported source encoding, undecodable bytes were replaced"
            );
        }

        self.cache.add_root(file.dir_root.clone());
        let module = SourceModule::parse(
            &file.module_name,
            path,
            decoded.text,
            file.is_package,
            &decoded.encoding,
        )?;
        let module = Arc::new(module);
        self.cache.insert(Arc::clone(&module));
        Ok(module)
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for PythonParser {
    fn language(&self) -> &str {
        "python"
    }

    fn file_patterns(&self) -> &[&str] {
        &["*.py", "*.pyi"]
    }

    #[instrument(skip(self, file), fields(file = %file.path.display(), module = %file.module_name))]
    fn parse_file(&self, file: &SourceFile) -> Result<ParsedModule, ParserError> {
        let start = Instant::now();
        debug!("Starting file parse");

        let module = match self.read_module(file) {
            Ok(module) => module,
            Err(e) => {
                self.update_metrics(false, start.elapsed(), 0);
                return Err(e);
            }
        };

        let entity = ModuleParser::new(&module, &self.cache).parse();
        let entity_count = entity.walk().len();
        let parse_time = start.elapsed();
        self.update_metrics(true, parse_time, entity_count);

        let info = FileInfo {
            file_path: file.path.clone(),
            module_name: module.name.clone(),
            encoding: module.encoding.clone(),
            entity_count,
            parse_time,
            line_count: module.source.lines().count(),
            byte_count: module.source.len(),
        };

        info!(
            entities = info.entity_count,
            lines = info.line_count,
            time_ms = info.parse_time.as_millis(),
            "File parsed successfully"
        );

        Ok(ParsedModule { entity, info })
    }

    fn parse_source(
        &self,
        source: &str,
        module_name: &str,
        file_path: &Path,
        is_package: bool,
    ) -> Result<Entity, ParserError> {
        if source.len() > self.config.max_file_size {
            return Err(ParserError::FileTooLarge(
                file_path.to_path_buf(),
                source.len(),
            ));
        }

        let module = Arc::new(SourceModule::parse(
            module_name,
            file_path,
            source.to_string(),
            is_package,
            "utf-8",
        )?);
        self.cache.insert(Arc::clone(&module));
        Ok(ModuleParser::new(&module, &self.cache).parse())
    }

    fn metrics(&self) -> ParserMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reset_metrics(&mut self) {
        *self.metrics.lock().unwrap_or_else(PoisonError::into_inner) = ParserMetrics::default();
    }
}
