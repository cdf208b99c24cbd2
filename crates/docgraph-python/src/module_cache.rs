//! Process-wide cache of parsed modules
//!
//! Documented files are inserted as they are parsed. Modules that are only
//! needed to find ancestor classes (a base class imported from a module that
//! is not documented, or from a configured search path) are located on disk
//! and parsed lazily the first time they are asked for. Failed lookups are
//! cached too.

use crate::scope::ScopeIndex;
use docgraph_parser_api::{ParserError, ParserResult};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

/// A parsed module together with its binding index
pub struct SourceModule {
    pub name: String,
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
    pub is_package: bool,
    pub encoding: String,
    pub scopes: ScopeIndex,
}

impl std::fmt::Debug for SourceModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceModule")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("is_package", &self.is_package)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl SourceModule {
    /// Parse decoded source text
    ///
    /// # Errors
    /// Returns `ParserError::SyntaxError` when the tree contains error nodes.
    pub fn parse(
        name: &str,
        path: &Path,
        source: String,
        is_package: bool,
        encoding: &str,
    ) -> ParserResult<Self> {
        let tree = parse_tree(&source, path)?;
        let root = tree.root_node();
        if root.has_error() {
            let (row, column) = first_error(root)
                .map(|node| (node.start_position().row + 1, node.start_position().column))
                .unwrap_or((0, 0));
            return Err(ParserError::SyntaxError(
                path.to_path_buf(),
                row,
                column,
                "invalid syntax".to_string(),
            ));
        }
        let scopes = ScopeIndex::build(root, source.as_bytes(), name, is_package);
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
            tree,
            is_package,
            encoding: encoding.to_string(),
            scopes,
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }
}

/// Build a tree-sitter tree for Python source
pub fn parse_tree(source: &str, path: &Path) -> ParserResult<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| ParserError::ParseError(path.to_path_buf(), e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ParserError::ParseError(path.to_path_buf(), "Failed to parse".to_string()))
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

/// Decoded source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSource {
    pub text: String,
    pub encoding: String,
    /// The declared encoding is not supported and undecodable bytes were
    /// replaced
    pub lossy: bool,
}

fn coding_cookie() -> &'static Regex {
    static COOKIE: OnceLock<Regex> = OnceLock::new();
    COOKIE.get_or_init(|| {
        Regex::new(r"^[ \t\x0c]*#.*?coding[:=][ \t]*([-\w.]+)").expect("valid coding pattern")
    })
}

/// Decode source bytes using a UTF-8 BOM or a PEP 263 coding declaration
///
/// # Errors
/// Returns `ParserError::EncodingError` when the bytes are invalid for a
/// supported encoding.
pub fn decode_source(bytes: &[u8], path: &Path) -> ParserResult<DecodedSource> {
    if let Some(rest) = bytes.strip_prefix(b"\xef\xbb\xbf") {
        let text = std::str::from_utf8(rest)
            .map_err(|e| ParserError::EncodingError(path.to_path_buf(), e.to_string()))?;
        return Ok(DecodedSource {
            text: text.to_string(),
            encoding: "utf-8-sig".to_string(),
            lossy: false,
        });
    }

    let encoding = declared_encoding(bytes).unwrap_or_else(|| "utf-8".to_string());
    match encoding.as_str() {
        "utf-8" => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| ParserError::EncodingError(path.to_path_buf(), e.to_string()))?;
            Ok(DecodedSource {
                text: text.to_string(),
                encoding,
                lossy: false,
            })
        }
        "ascii" => {
            if let Some(position) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(ParserError::EncodingError(
                    path.to_path_buf(),
                    format!("non-ASCII byte at offset {position}"),
                ));
            }
            Ok(DecodedSource {
                text: bytes.iter().map(|&b| b as char).collect(),
                encoding,
                lossy: false,
            })
        }
        "latin-1" => Ok(DecodedSource {
            text: bytes.iter().map(|&b| b as char).collect(),
            encoding,
            lossy: false,
        }),
        _ => Ok(DecodedSource {
            text: String::from_utf8_lossy(bytes).into_owned(),
            encoding,
            lossy: true,
        }),
    }
}

fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]);
    for line in head.lines().take(2) {
        if let Some(captures) = coding_cookie().captures(line) {
            return captures.get(1).map(|m| normalize_encoding(m.as_str()));
        }
        // The second line only counts when the first one is blank or a comment
        let trimmed = line.trim_start();
        if !(trimmed.is_empty() || trimmed.starts_with('#')) {
            break;
        }
    }
    None
}

fn normalize_encoding(name: &str) -> String {
    let lower = name.to_ascii_lowercase().replace('_', "-");
    match lower.as_str() {
        "utf-8" | "utf8" | "utf-8-unix" => "utf-8".to_string(),
        "ascii" | "us-ascii" => "ascii".to_string(),
        "latin-1" | "latin1" | "l1" | "iso-8859-1" | "iso8859-1" | "iso-latin-1" => {
            "latin-1".to_string()
        }
        _ => lower,
    }
}

/// Shared module lookup used by ancestor discovery
#[derive(Debug, Default)]
pub struct ModuleCache {
    roots: Mutex<Vec<PathBuf>>,
    modules: Mutex<HashMap<String, Option<Arc<SourceModule>>>>,
}

impl ModuleCache {
    /// Cache searching the given roots for undocumented modules
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots: Mutex::new(roots),
            modules: Mutex::new(HashMap::new()),
        }
    }

    /// Add a directory that module names are relative to
    pub fn add_root(&self, root: PathBuf) {
        let mut roots = self.roots.lock().unwrap_or_else(PoisonError::into_inner);
        if !roots.contains(&root) {
            roots.push(root);
        }
    }

    /// Register an already parsed module, replacing any cached entry
    pub fn insert(&self, module: Arc<SourceModule>) {
        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        modules.insert(module.name.clone(), Some(module));
    }

    /// Number of modules parsed so far
    pub fn len(&self) -> usize {
        let modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        modules.values().filter(|module| module.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Module by dotted name, loading it from disk on first use
    pub fn get(&self, name: &str) -> Option<Arc<SourceModule>> {
        {
            let modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = modules.get(name) {
                return cached.clone();
            }
        }

        let loaded = self.load(name).map(Arc::new);
        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        modules
            .entry(name.to_string())
            .or_insert(loaded)
            .clone()
    }

    fn load(&self, name: &str) -> Option<SourceModule> {
        let (path, is_package) = self.locate(name)?;
        let bytes = std::fs::read(&path).ok()?;
        let decoded = decode_source(&bytes, &path).ok()?;
        match SourceModule::parse(name, &path, decoded.text, is_package, &decoded.encoding) {
            Ok(module) => {
                debug!(module = name, path = %path.display(), "loaded module for ancestor lookup");
                Some(module)
            }
            Err(e) => {
                debug!(module = name, error = %e, "cannot load module for ancestor lookup");
                None
            }
        }
    }

    fn locate(&self, name: &str) -> Option<(PathBuf, bool)> {
        let roots = self
            .roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let relative: PathBuf = name.split('.').collect();
        for root in roots {
            let base = root.join(&relative);
            for extension in ["py", "pyi"] {
                let candidate = base.with_extension(extension);
                if candidate.is_file() {
                    return Some((candidate, false));
                }
            }
            for init in ["__init__.py", "__init__.pyi"] {
                let candidate = base.join(init);
                if candidate.is_file() {
                    return Some((candidate, true));
                }
            }
        }
        None
    }
}
