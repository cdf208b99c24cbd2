//! Name bindings per scope and qualified-name resolution
//!
//! A [`ScopeIndex`] is built once per module. It records, for the module and
//! for every class and function body, which names are bound and by what
//! statement. Resolution walks outward from a scope the way Python looks up
//! names: class bodies are only consulted from inside themselves.

use crate::visitor::{field_children, named_children, node_text, statements};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tree_sitter::Node;

/// Index of a scope inside a [`ScopeIndex`]
pub type ScopeId = usize;

/// The module scope of every index
pub const MODULE_SCOPE: ScopeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
}

/// Statement that bound a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// `class Name:`; carries the fully qualified class name
    Class { qname: String },
    /// `def name():`
    Function,
    /// `from module import name [as alias]`, with the module made absolute
    ImportFrom { module: String, name: String },
    /// `import module [as alias]`
    Import { module: String },
    /// Assignment target or parameter
    Assign,
}

#[derive(Debug, Clone)]
struct Scope {
    kind: ScopeKind,
    qname: String,
    parent: Option<ScopeId>,
    bindings: HashMap<String, Vec<Binding>>,
}

/// Byte range of a class definition, used to find its node again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClassSite {
    start_byte: usize,
    end_byte: usize,
}

/// Bindings of every scope in one module
#[derive(Debug, Clone)]
pub struct ScopeIndex {
    module_name: String,
    is_package: bool,
    scopes: Vec<Scope>,
    by_node: HashMap<usize, ScopeId>,
    classes: HashMap<String, ClassSite>,
}

fn call_arguments() -> &'static Regex {
    static CALL_ARGUMENTS: OnceLock<Regex> = OnceLock::new();
    CALL_ARGUMENTS.get_or_init(|| Regex::new(r"\(.*\)").expect("valid call pattern"))
}

impl ScopeIndex {
    /// Index the bindings of a parsed module
    pub fn build(root: Node, source: &[u8], module_name: &str, is_package: bool) -> Self {
        let mut index = Self {
            module_name: module_name.to_string(),
            is_package,
            scopes: vec![Scope {
                kind: ScopeKind::Module,
                qname: module_name.to_string(),
                parent: None,
                bindings: HashMap::new(),
            }],
            by_node: HashMap::new(),
            classes: HashMap::new(),
        };
        index.by_node.insert(root.id(), MODULE_SCOPE);
        index.visit_block(root, source, MODULE_SCOPE);
        index
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn is_package(&self) -> bool {
        self.is_package
    }

    pub fn kind(&self, scope: ScopeId) -> ScopeKind {
        self.scopes[scope].kind
    }

    /// Fully qualified name of a scope
    pub fn qname(&self, scope: ScopeId) -> &str {
        &self.scopes[scope].qname
    }

    /// Scope opened by a class or function definition node
    pub fn scope_of_definition(&self, definition: Node) -> Option<ScopeId> {
        self.by_node.get(&definition.id()).copied()
    }

    /// Scope in which names appearing at `node` are looked up.
    ///
    /// Decorators, bases, parameters and annotations of a definition belong
    /// to the enclosing scope; only the body belongs to the definition.
    pub fn scope_at(&self, node: Node) -> ScopeId {
        let mut current = node;
        while let Some(parent) = current.parent() {
            if matches!(parent.kind(), "class_definition" | "function_definition")
                && parent
                    .child_by_field_name("body")
                    .is_some_and(|body| body.id() == current.id())
            {
                if let Some(scope) = self.scope_of_definition(parent) {
                    return scope;
                }
            }
            current = parent;
        }
        MODULE_SCOPE
    }

    /// Bindings of `name` visible from `scope`, nearest scope first
    pub fn lookup(&self, scope: ScopeId, name: &str) -> &[Binding] {
        let mut current = Some(scope);
        let mut first = true;
        while let Some(id) = current {
            let scope = &self.scopes[id];
            if first || scope.kind != ScopeKind::Class {
                if let Some(bindings) = scope.bindings.get(name) {
                    if !bindings.is_empty() {
                        return bindings;
                    }
                }
            }
            first = false;
            current = scope.parent;
        }
        &[]
    }

    /// Bindings made directly in the module body
    pub fn module_binding(&self, name: &str) -> &[Binding] {
        self.scopes[MODULE_SCOPE]
            .bindings
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Class definition node for a path like `Outer.Inner`
    pub fn class_node<'t>(&self, root: Node<'t>, qual_name: &str) -> Option<Node<'t>> {
        let site = self.classes.get(qual_name)?;
        let mut node = root.descendant_for_byte_range(site.start_byte, site.end_byte)?;
        loop {
            if node.kind() == "class_definition"
                && node.start_byte() == site.start_byte
                && node.end_byte() == site.end_byte
            {
                return Some(node);
            }
            node = node.parent()?;
        }
    }

    /// Turn a partial dotted name seen in `scope` into a fully qualified one.
    ///
    /// The first component is looked up: imports replace it with the
    /// imported path, classes with their qualified name, assignments prefix
    /// it with the assigning scope. Call arguments collapse to `()` when
    /// `is_call` is set, and the builtin namespace prefix is dropped.
    pub fn resolve_qualname(&self, scope: ScopeId, basename: &str, is_call: bool) -> String {
        let without_calls = call_arguments().replace_all(basename, "");
        let top_level = without_calls.split('.').next().unwrap_or_default();
        let rest = basename
            .strip_prefix(top_level)
            .filter(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('('))
            .unwrap_or("");

        let mut full_basename = basename.to_string();
        if !top_level.is_empty() {
            for binding in self.lookup(scope, top_level) {
                match binding {
                    Binding::ImportFrom { module, name } => {
                        full_basename = format!("{module}.{name}{rest}");
                        break;
                    }
                    Binding::Import { module } => {
                        full_basename = format!("{module}{rest}");
                        break;
                    }
                    Binding::Class { qname } => {
                        full_basename = format!("{qname}{rest}");
                        break;
                    }
                    Binding::Assign => {
                        let owner = self.binding_scope(scope, top_level);
                        full_basename = format!("{}.{}{}", self.qname(owner), top_level, rest);
                    }
                    Binding::Function => {}
                }
            }
        }

        if is_call {
            full_basename = call_arguments().replace_all(&full_basename, "()").into_owned();
        }

        for builtin in ["builtins.", "__builtin__."] {
            if let Some(stripped) = full_basename.strip_prefix(builtin) {
                return stripped.to_string();
            }
        }
        full_basename
    }

    fn binding_scope(&self, scope: ScopeId, name: &str) -> ScopeId {
        let mut current = Some(scope);
        let mut first = true;
        while let Some(id) = current {
            let entry = &self.scopes[id];
            if (first || entry.kind != ScopeKind::Class) && entry.bindings.contains_key(name) {
                return id;
            }
            first = false;
            current = entry.parent;
        }
        scope
    }

    /// Absolute module named by an import-from statement
    pub fn import_from_module(&self, statement: Node, source: &[u8]) -> Option<String> {
        let module_node = statement.child_by_field_name("module_name")?;
        if module_node.kind() == "relative_import" {
            let mut level = 0;
            let mut name = "";
            for child in named_children(module_node) {
                match child.kind() {
                    "import_prefix" => level = node_text(child, source).matches('.').count(),
                    "dotted_name" => name = node_text(child, source),
                    _ => {}
                }
            }
            relative_to_absolute(&self.module_name, self.is_package, name, level)
        } else {
            Some(node_text(module_node, source).to_string())
        }
    }

    fn add_scope(&mut self, kind: ScopeKind, qname: String, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            kind,
            qname,
            parent: Some(parent),
            bindings: HashMap::new(),
        });
        self.scopes.len() - 1
    }

    fn bind(&mut self, scope: ScopeId, name: &str, binding: Binding) {
        self.scopes[scope]
            .bindings
            .entry(name.to_string())
            .or_default()
            .push(binding);
    }

    fn visit_block(&mut self, block: Node, source: &[u8], scope: ScopeId) {
        for statement in statements(block) {
            self.visit(statement, source, scope);
        }
    }

    fn visit(&mut self, node: Node, source: &[u8], scope: ScopeId) {
        match node.kind() {
            "class_definition" => {
                let Some(name_node) = node.child_by_field_name("name") else {
                    return;
                };
                let name = node_text(name_node, source);
                let qname = format!("{}.{}", self.qname(scope), name);
                self.bind(scope, name, Binding::Class { qname: qname.clone() });

                let qual_name = qname
                    .strip_prefix(&format!("{}.", self.module_name))
                    .unwrap_or(name)
                    .to_string();
                self.classes.insert(
                    qual_name,
                    ClassSite {
                        start_byte: node.start_byte(),
                        end_byte: node.end_byte(),
                    },
                );

                let class_scope = self.add_scope(ScopeKind::Class, qname, scope);
                self.by_node.insert(node.id(), class_scope);
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_block(body, source, class_scope);
                }
            }
            "function_definition" => {
                let Some(name_node) = node.child_by_field_name("name") else {
                    return;
                };
                let name = node_text(name_node, source);
                self.bind(scope, name, Binding::Function);

                let qname = format!("{}.{}", self.qname(scope), name);
                let function_scope = self.add_scope(ScopeKind::Function, qname, scope);
                self.by_node.insert(node.id(), function_scope);
                if let Some(parameters) = node.child_by_field_name("parameters") {
                    for parameter in parameter_names(parameters, source) {
                        self.bind(function_scope, &parameter, Binding::Assign);
                    }
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_block(body, source, function_scope);
                }
            }
            "import_from_statement" => {
                let Some(module) = self.import_from_module(node, source) else {
                    return;
                };
                for imported in field_children(node, "name") {
                    let (name, alias) = import_name_and_alias(imported, source);
                    self.bind(
                        scope,
                        alias.unwrap_or(name),
                        Binding::ImportFrom {
                            module: module.clone(),
                            name: name.to_string(),
                        },
                    );
                }
            }
            "import_statement" => {
                for imported in field_children(node, "name") {
                    let (name, alias) = import_name_and_alias(imported, source);
                    match alias {
                        Some(alias) => self.bind(
                            scope,
                            alias,
                            Binding::Import {
                                module: name.to_string(),
                            },
                        ),
                        None => {
                            let top = name.split('.').next().unwrap_or(name);
                            self.bind(
                                scope,
                                top,
                                Binding::Import {
                                    module: top.to_string(),
                                },
                            );
                        }
                    }
                }
            }
            "assignment" => {
                if let Some(left) = node.child_by_field_name("left") {
                    for target in target_names(left, source) {
                        self.bind(scope, &target, Binding::Assign);
                    }
                }
                if let Some(right) = node.child_by_field_name("right") {
                    if right.kind() == "assignment" {
                        self.visit(right, source, scope);
                    }
                }
            }
            "for_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    for target in target_names(left, source) {
                        self.bind(scope, &target, Binding::Assign);
                    }
                }
                self.visit_children(node, source, scope);
            }
            "decorated_definition" => {
                if let Some(definition) = node.child_by_field_name("definition") {
                    self.visit(definition, source, scope);
                }
            }
            "lambda" | "list_comprehension" | "set_comprehension" | "dictionary_comprehension"
            | "generator_expression" => {}
            _ => self.visit_children(node, source, scope),
        }
    }

    fn visit_children(&mut self, node: Node, source: &[u8], scope: ScopeId) {
        for child in statements(node) {
            self.visit(child, source, scope);
        }
    }
}

/// `(name, alias)` of one entry of an import list
pub fn import_name_and_alias<'a>(node: Node, source: &'a [u8]) -> (&'a str, Option<&'a str>) {
    if node.kind() == "aliased_import" {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, source))
            .unwrap_or("");
        let alias = node.child_by_field_name("alias").map(|n| node_text(n, source));
        (name, alias)
    } else {
        (node_text(node, source), None)
    }
}

fn target_names(target: Node, source: &[u8]) -> Vec<String> {
    match target.kind() {
        "identifier" => vec![node_text(target, source).to_string()],
        "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list"
        | "parenthesized_expression" => statements(target)
            .into_iter()
            .flat_map(|child| target_names(child, source))
            .collect(),
        "list_splat_pattern" => statements(target)
            .into_iter()
            .flat_map(|child| target_names(child, source))
            .collect(),
        _ => Vec::new(),
    }
}

fn parameter_names(parameters: Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    for parameter in statements(parameters) {
        let target = match parameter.kind() {
            "default_parameter" | "typed_default_parameter" => parameter.child_by_field_name("name"),
            "typed_parameter" => statements(parameter).into_iter().next(),
            _ => Some(parameter),
        };
        let Some(target) = target else { continue };
        match target.kind() {
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                names.extend(statements(target).into_iter().flat_map(|n| target_names(n, source)))
            }
            _ => names.extend(target_names(target, source)),
        }
    }
    names
}

/// Resolve a relative import against the importing module.
///
/// `level` is the number of leading dots. Returns `None` when the import
/// climbs above the top-level package.
pub fn relative_to_absolute(
    module_name: &str,
    is_package: bool,
    name: &str,
    level: usize,
) -> Option<String> {
    let package_name = if level > 0 {
        let level = if is_package { level - 1 } else { level };
        let parts: Vec<&str> = module_name.split('.').collect();
        if level >= parts.len() && level > 0 {
            return None;
        }
        parts[..parts.len() - level].join(".")
    } else if is_package {
        module_name.to_string()
    } else {
        module_name
            .rsplit_once('.')
            .map_or(module_name, |(package, _)| package)
            .to_string()
    };

    if package_name.is_empty() {
        return Some(name.to_string());
    }
    if name.is_empty() {
        return Some(package_name);
    }
    Some(format!("{package_name}.{name}"))
}
