//! Source discovery and loading
//!
//! [`ModuleLoader`] finds the files to document under the configured
//! directories, computes their dotted module names and parses each one with
//! [`PythonParser`]. A file that cannot be read or parsed is reported and
//! skipped; only configuration problems abort a load.

use crate::parser_impl::PythonParser;
use docgraph::{Diagnostic, Diagnostics, Entity, SourceSnapshot, WarningCategory};
use docgraph_parser_api::{
    LoaderConfig, ParsedModule, ParserError, ParserMetrics, ParserResult, ProjectInfo, SourceFile,
    SourceParser,
};
use glob::Pattern;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

const PACKAGE_INITS: [&str; 2] = ["__init__.py", "__init__.pyi"];

/// Files found by [`ModuleLoader::discover`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Matching files in discovery order
    pub files: Vec<SourceFile>,
    /// Files dropped by an ignore pattern or shadowed by an earlier pattern
    pub skipped: usize,
    /// Paths the directory walk could not enter
    pub walk_failures: Vec<(PathBuf, String)>,
}

/// Parsed modules of one load
#[derive(Debug, Clone)]
pub struct LoadedModules {
    /// One record per successfully parsed file, in discovery order
    pub modules: Vec<ParsedModule>,
    pub project: ProjectInfo,
    pub diagnostics: Diagnostics,
    pub metrics: ParserMetrics,
    /// Snapshot to store for the next incremental build
    pub snapshot: SourceSnapshot,
}

impl LoadedModules {
    /// Parsed module of a source file
    pub fn get(&self, path: &Path) -> Option<&ParsedModule> {
        self.modules.iter().find(|module| module.info.file_path == path)
    }

    /// Module records keyed by the file they were parsed from
    pub fn by_path(&self) -> HashMap<&Path, &Entity> {
        self.modules
            .iter()
            .map(|module| (module.info.file_path.as_path(), &module.entity))
            .collect()
    }

    /// Module records in discovery order
    pub fn into_entities(self) -> Vec<Entity> {
        self.modules.into_iter().map(|module| module.entity).collect()
    }
}

/// Result of an incremental load
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// No source changed since the previous snapshot; nothing was parsed
    Unchanged(SourceSnapshot),
    Loaded(LoadedModules),
}

/// Finds and parses the sources of a project
pub struct ModuleLoader {
    config: LoaderConfig,
    parser: PythonParser,
}

impl ModuleLoader {
    pub fn new(config: LoaderConfig) -> Self {
        let parser = PythonParser::with_config(config.clone());
        Self { config, parser }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn parser(&self) -> &PythonParser {
        &self.parser
    }

    /// Find every file matching the configured patterns
    ///
    /// Within one directory a file whose name without extension was already
    /// yielded by an earlier pattern is skipped, so listing `*.pyi` before
    /// `*.py` prefers stubs. A file is also skipped when any ignore pattern
    /// matches its full path.
    ///
    /// # Errors
    /// Returns `ParserError::InvalidConfig` or `ParserError::MissingDirectory`
    /// for an unusable configuration.
    pub fn discover(&self) -> ParserResult<Discovery> {
        self.config.validate()?;
        let patterns = compile_patterns(&self.config.file_patterns)?;
        let ignore = compile_patterns(&self.config.ignore)?;

        let mut discovery = Discovery::default();
        for dir in &self.config.dirs {
            let dir = absolute(dir)?;
            let namespace = self.config.use_implicit_namespace;
            let dir_root = if namespace || has_package_init(&dir) {
                dir.parent().map(Path::to_path_buf).unwrap_or_else(|| dir.clone())
            } else {
                dir.clone()
            };

            for (directory, filenames) in list_directories(&dir, &mut discovery.walk_failures) {
                let mut seen = HashSet::new();
                for pattern in &patterns {
                    for filename in filenames.iter().filter(|name| pattern.matches(name)) {
                        let norm_name = Path::new(filename)
                            .file_stem()
                            .map(|stem| stem.to_string_lossy().into_owned())
                            .unwrap_or_else(|| filename.clone());
                        if seen.contains(&norm_name) {
                            discovery.skipped += 1;
                            continue;
                        }

                        let path = directory.join(filename);
                        let path_text = path.to_string_lossy();
                        if ignore.iter().any(|pattern| pattern.matches(&path_text)) {
                            info!(file = %path.display(), "Ignoring file");
                            discovery.skipped += 1;
                            continue;
                        }

                        match module_name(&path, &dir_root, namespace) {
                            Some(module_name) => {
                                let is_package = PACKAGE_INITS.contains(&filename.as_str());
                                discovery.files.push(SourceFile {
                                    dir_root: dir_root.clone(),
                                    path,
                                    module_name,
                                    is_package,
                                });
                            }
                            None => {
                                debug!(file = %path.display(), "File is outside any package");
                                discovery.skipped += 1;
                            }
                        }
                        seen.insert(norm_name);
                    }
                }
            }
        }
        Ok(discovery)
    }

    /// Parse every discovered file unconditionally
    ///
    /// # Errors
    /// Returns a configuration error, or `ParserError::NoSourceFiles` when no
    /// file matched.
    #[instrument(skip(self), fields(dirs = self.config.dirs.len()))]
    pub fn load_all(&mut self) -> ParserResult<LoadedModules> {
        let discovery = self.discover_nonempty()?;
        let snapshot = snapshot_of(&discovery.files);
        Ok(self.read_files(discovery, snapshot))
    }

    /// Parse the discovered files unless they are unchanged since `previous`
    ///
    /// Parsing is skipped only with `keep_files` enabled, an identical file
    /// list and no file newer than the previous snapshot.
    ///
    /// # Errors
    /// Same as [`ModuleLoader::load_all`].
    #[instrument(skip(self, previous), fields(dirs = self.config.dirs.len()))]
    pub fn load(&mut self, previous: Option<&SourceSnapshot>) -> ParserResult<LoadOutcome> {
        let discovery = self.discover_nonempty()?;
        let snapshot = snapshot_of(&discovery.files);
        if !snapshot.needs_load(previous, self.config.keep_files) {
            debug!("Skipping read stage because source files have not changed");
            return Ok(LoadOutcome::Unchanged(snapshot));
        }
        Ok(LoadOutcome::Loaded(self.read_files(discovery, snapshot)))
    }

    fn discover_nonempty(&self) -> ParserResult<Discovery> {
        let discovery = self.discover()?;
        if discovery.files.is_empty() {
            return Err(ParserError::NoSourceFiles(self.config.dirs.clone()));
        }
        Ok(discovery)
    }

    fn read_files(&mut self, discovery: Discovery, snapshot: SourceSnapshot) -> LoadedModules {
        self.parser.reset_metrics();
        let (modules, mut project) = self.parser.parse_files(&discovery.files);
        project.failed_files.extend(discovery.walk_failures);

        let mut diagnostics = Diagnostics::new();
        for (path, reason) in &project.failed_files {
            warn!(
                category = "not_readable",
                file = %path.display(),
                error = %reason,
                "Unable to read file"
            );
            diagnostics.push(Diagnostic {
                category: WarningCategory::NotReadable,
                message: format!("Unable to read file: {}: {reason}", path.display()),
            });
        }

        let mut metrics = self.parser.metrics();
        metrics.files_skipped = discovery.skipped;

        info!(
            files_parsed = project.files.len(),
            files_failed = project.failed_files.len(),
            files_skipped = metrics.files_skipped,
            total_entities = project.total_entities(),
            total_time_ms = project.total_parse_time.as_millis(),
            success_rate = project.success_rate(),
            avg_time_ms = metrics.avg_parse_time().as_millis(),
            avg_entities = metrics.avg_entities_per_file(),
            "Source load completed"
        );

        LoadedModules {
            modules,
            project,
            diagnostics,
            metrics,
            snapshot,
        }
    }
}

fn compile_patterns(patterns: &[String]) -> ParserResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| {
                ParserError::InvalidConfig(format!("invalid pattern '{pattern}': {e}"))
            })
        })
        .collect()
}

fn absolute(dir: &Path) -> ParserResult<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| ParserError::IoError(dir.to_path_buf(), e))?;
    Ok(cwd.join(dir))
}

fn has_package_init(dir: &Path) -> bool {
    PACKAGE_INITS.iter().any(|init| dir.join(init).is_file())
}

/// Directories under `root` with the names of the files they contain, both
/// sorted by name
fn list_directories(
    root: &Path,
    failures: &mut Vec<(PathBuf, String)>,
) -> Vec<(PathBuf, Vec<String>)> {
    let mut directories: Vec<(PathBuf, Vec<String>)> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    index.insert(entry.path().to_path_buf(), directories.len());
                    directories.push((entry.path().to_path_buf(), Vec::new()));
                } else if entry.file_type().is_file() {
                    let slot = entry.path().parent().and_then(|parent| index.get(parent));
                    if let Some(&slot) = slot {
                        directories[slot]
                            .1
                            .push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
            }
            Err(e) => {
                // Record walkdir errors as failed files
                if let Some(path) = e.path() {
                    failures.push((path.to_path_buf(), e.to_string()));
                }
            }
        }
    }
    directories
}

/// Dotted module name of `path`
///
/// Directories are prepended while they are packages: they hold an
/// `__init__` file or, in namespace mode, they are below `dir_root`.
fn module_name(path: &Path, dir_root: &Path, namespace: bool) -> Option<String> {
    let filename = path.file_name()?.to_str()?;
    let mut parts = Vec::new();
    if !PACKAGE_INITS.contains(&filename) {
        parts.push(path.file_stem()?.to_string_lossy().into_owned());
    }

    let mut directory = path.parent();
    while let Some(dir) = directory {
        let is_package = if namespace {
            dir != dir_root
        } else {
            has_package_init(dir)
        };
        if !is_package {
            break;
        }
        match dir.file_name() {
            Some(name) => parts.push(name.to_string_lossy().into_owned()),
            None => break,
        }
        directory = dir.parent();
    }

    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    Some(parts.join("."))
}

fn snapshot_of(files: &[SourceFile]) -> SourceSnapshot {
    let max_mtime = files
        .iter()
        .filter_map(|file| std::fs::metadata(&file.path).ok())
        .filter_map(|metadata| metadata.modified().ok())
        .filter_map(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs_f64())
        .fold(0.0, f64::max);
    let source_files = files
        .iter()
        .map(|file| (file.dir_root.clone(), file.path.clone()))
        .collect();
    SourceSnapshot::new(source_files, max_mtime)
}
