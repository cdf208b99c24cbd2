//! Ancestor discovery and method resolution order
//!
//! Base-class expressions are resolved to qualified names through the
//! defining module's scopes, then located in the [`ModuleCache`]. Bases that
//! cannot be found in source (builtins, uninstalled packages) stay in the
//! order as bare names so that exception and ABC checks still see them.
//!
//! The order itself is computed with C3 linearization. When the hierarchy is
//! inconsistent a depth-first preorder is used instead.

use crate::module_cache::{ModuleCache, SourceModule};
use crate::scope::{Binding, MODULE_SCOPE};
use crate::visitor::{node_text, statements};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use tree_sitter::Node;

/// Maximum number of re-export hops and inheritance levels followed
pub const MAX_ANCESTOR_DEPTH: usize = 16;

/// A class definition located in a parsed module
#[derive(Debug, Clone)]
pub struct ClassRef {
    pub module: Arc<SourceModule>,
    /// Dotted path of the class inside its module
    pub qual_name: String,
}

impl ClassRef {
    pub fn new(module: Arc<SourceModule>, qual_name: impl Into<String>) -> Self {
        Self {
            module,
            qual_name: qual_name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.module.name, self.qual_name)
    }

    /// The `class_definition` node
    pub fn node(&self) -> Option<Node<'_>> {
        self.module
            .scopes
            .class_node(self.module.root(), &self.qual_name)
    }
}

/// One entry of a method resolution order
#[derive(Debug, Clone)]
pub enum Ancestor {
    /// Class whose source was found
    Class(ClassRef),
    /// Qualified name of a class without available source
    Named(String),
}

impl Ancestor {
    pub fn full_name(&self) -> String {
        match self {
            Ancestor::Class(class) => class.full_name(),
            Ancestor::Named(name) => name.clone(),
        }
    }

    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Ancestor::Class(class) => Some(class),
            Ancestor::Named(_) => None,
        }
    }
}

/// Names that never take part in member merging
fn is_root_type(full_name: &str) -> bool {
    matches!(full_name, "object" | "type")
}

/// Ancestor lookups backed by a module cache
#[derive(Debug, Clone, Copy)]
pub struct Ancestry<'c> {
    cache: &'c ModuleCache,
}

impl<'c> Ancestry<'c> {
    pub fn new(cache: &'c ModuleCache) -> Self {
        Self { cache }
    }

    /// Base expressions of a class, keyword arguments excluded
    pub fn base_nodes(class_node: Node) -> Vec<Node> {
        let Some(superclasses) = class_node.child_by_field_name("superclasses") else {
            return Vec::new();
        };
        statements(superclasses)
            .into_iter()
            .filter(|base| {
                !matches!(
                    base.kind(),
                    "keyword_argument" | "list_splat" | "dictionary_splat"
                )
            })
            .collect()
    }

    /// Value of the `metaclass=` keyword, resolved to a qualified name
    pub fn metaclass(class: &ClassRef) -> Option<String> {
        let node = class.node()?;
        let superclasses = node.child_by_field_name("superclasses")?;
        let source = class.module.bytes();
        statements(superclasses)
            .into_iter()
            .filter(|argument| argument.kind() == "keyword_argument")
            .find(|argument| {
                argument
                    .child_by_field_name("name")
                    .is_some_and(|name| node_text(name, source) == "metaclass")
            })
            .and_then(|argument| argument.child_by_field_name("value"))
            .map(|value| {
                let scope = class.module.scopes.scope_at(value);
                class
                    .module
                    .scopes
                    .resolve_qualname(scope, node_text(value, source), false)
            })
    }

    /// Qualified names of the direct bases of a class
    pub fn base_names(class: &ClassRef) -> Vec<String> {
        let Some(node) = class.node() else {
            return Vec::new();
        };
        let source = class.module.bytes();
        Self::base_nodes(node)
            .into_iter()
            .filter_map(|base| {
                let target = match base.kind() {
                    "subscript" => base.child_by_field_name("value")?,
                    "identifier" | "attribute" => base,
                    _ => return None,
                };
                let scope = class.module.scopes.scope_at(target);
                Some(
                    class
                        .module
                        .scopes
                        .resolve_qualname(scope, node_text(target, source), false),
                )
            })
            .collect()
    }

    /// Direct bases, located where possible; `object` and `type` are dropped
    pub fn direct_bases(&self, class: &ClassRef) -> Vec<Ancestor> {
        Self::base_names(class)
            .into_iter()
            .filter(|name| !is_root_type(name))
            .map(|name| self.find_class(&name))
            .collect()
    }

    /// Locate a class by qualified name, following re-exports
    pub fn find_class(&self, qualified: &str) -> Ancestor {
        self.find_class_at_depth(qualified, 0)
            .unwrap_or_else(|| Ancestor::Named(qualified.to_string()))
    }

    fn find_class_at_depth(&self, qualified: &str, depth: usize) -> Option<Ancestor> {
        if depth > MAX_ANCESTOR_DEPTH {
            debug!(class = qualified, "re-export chain too deep");
            return None;
        }
        let parts: Vec<&str> = qualified.split('.').collect();

        // Longest module prefix that exists wins
        for split in (1..parts.len()).rev() {
            let module_name = parts[..split].join(".");
            let Some(module) = self.cache.get(&module_name) else {
                continue;
            };
            let rest = parts[split..].join(".");
            if module.scopes.class_node(module.root(), &rest).is_some() {
                return Some(Ancestor::Class(ClassRef::new(module, rest)));
            }

            let first = parts[split];
            let reexported = module
                .scopes
                .module_binding(first)
                .iter()
                .any(|binding| {
                    matches!(binding, Binding::ImportFrom { .. } | Binding::Import { .. })
                });
            if reexported {
                let target = module.scopes.resolve_qualname(MODULE_SCOPE, &rest, false);
                if target != qualified {
                    return self.find_class_at_depth(&target, depth + 1);
                }
            }
            return None;
        }
        None
    }

    /// Method resolution order of a class, excluding the class itself and
    /// the root `object` and `type` classes
    pub fn mro(&self, class: &ClassRef) -> Vec<Ancestor> {
        let mut stack = Vec::new();
        match self.linearize(&Ancestor::Class(class.clone()), &mut stack) {
            Some(mut order) => {
                order.remove(0);
                order
            }
            None => {
                debug!(
                    class = %class.full_name(),
                    "inconsistent hierarchy, using depth-first order"
                );
                self.depth_first(class)
            }
        }
    }

    fn linearize(&self, ancestor: &Ancestor, stack: &mut Vec<String>) -> Option<Vec<Ancestor>> {
        let class = match ancestor {
            Ancestor::Named(_) => return Some(vec![ancestor.clone()]),
            Ancestor::Class(class) => class,
        };
        let key = class.full_name();
        if stack.contains(&key) || stack.len() > MAX_ANCESTOR_DEPTH {
            return None;
        }
        stack.push(key);

        let bases = self.direct_bases(class);
        let mut seqs = Vec::with_capacity(bases.len() + 1);
        for base in &bases {
            match self.linearize(base, stack) {
                Some(seq) => seqs.push(seq),
                None => {
                    stack.pop();
                    return None;
                }
            }
        }
        seqs.push(bases);

        let merged = merge(seqs);
        stack.pop();

        let mut order = vec![ancestor.clone()];
        order.extend(merged?);
        Some(order)
    }

    fn depth_first(&self, class: &ClassRef) -> Vec<Ancestor> {
        let mut order = Vec::new();
        let mut seen = HashSet::from([class.full_name()]);
        self.depth_first_into(class, &mut seen, &mut order, 0);
        order
    }

    fn depth_first_into(
        &self,
        class: &ClassRef,
        seen: &mut HashSet<String>,
        order: &mut Vec<Ancestor>,
        depth: usize,
    ) {
        if depth > MAX_ANCESTOR_DEPTH {
            return;
        }
        for base in self.direct_bases(class) {
            if !seen.insert(base.full_name()) {
                continue;
            }
            order.push(base.clone());
            if let Ancestor::Class(base_class) = &base {
                self.depth_first_into(base_class, seen, order, depth + 1);
            }
        }
    }
}

/// C3 merge of linearizations
fn merge(mut seqs: Vec<Vec<Ancestor>>) -> Option<Vec<Ancestor>> {
    let mut result = Vec::new();

    loop {
        seqs.retain(|seq| !seq.is_empty());
        if seqs.is_empty() {
            return Some(result);
        }

        // A head that appears in no tail
        let candidate = seqs.iter().find_map(|seq| {
            let head = seq[0].full_name();
            let in_tail = seqs
                .iter()
                .any(|s| s.iter().skip(1).any(|entry| entry.full_name() == head));
            (!in_tail).then(|| seq[0].clone())
        })?;

        let name = candidate.full_name();
        for seq in seqs.iter_mut() {
            if seq.first().is_some_and(|head| head.full_name() == name) {
                seq.remove(0);
            }
        }
        result.push(candidate);
    }
}
