//! Cross-module re-export resolution.
//!
//! Parsers emit a [`Placeholder`](EntityKind::Placeholder) record for every
//! name imported from another documented module. The resolver replaces each
//! placeholder with a deep copy of the record it refers to, expands wildcard
//! imports, and drops placeholders that cannot be followed. Every dropped
//! placeholder produces a `python_import_resolution` warning.

use crate::diagnostics::{Diagnostics, WarningCategory};
use crate::entity::{Entity, EntityKind};
use std::collections::{HashMap, HashSet};

/// Resolves placeholders across a set of module records.
pub struct PlaceholderResolver<'a> {
    modules: &'a mut [Entity],
    index: HashMap<String, usize>,
    resolved: HashSet<String>,
    diagnostics: Diagnostics,
}

impl<'a> PlaceholderResolver<'a> {
    /// Index `modules` by their `name` field.
    pub fn new(modules: &'a mut [Entity]) -> Self {
        let index = modules
            .iter()
            .enumerate()
            .map(|(i, module)| (module.name.clone(), i))
            .collect();
        Self {
            modules,
            index,
            resolved: HashSet::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Resolve every module and return the warnings that were emitted.
    ///
    /// Each module is processed at most once. A module's placeholders are
    /// resolved only after the module they import from has been resolved, so
    /// re-exports of re-exports collapse onto the original definition.
    pub fn resolve(mut self) -> Diagnostics {
        let names: Vec<String> = self.modules.iter().map(|m| m.name.clone()).collect();
        for name in names {
            let mut visit_path = Vec::new();
            self.resolve_module(&name, &mut visit_path);
        }
        self.diagnostics
    }

    fn resolve_module(&mut self, module_name: &str, visit_path: &mut Vec<String>) {
        if self.resolved.contains(module_name) {
            return;
        }
        let Some(&module_index) = self.index.get(module_name) else {
            return;
        };
        visit_path.push(module_name.to_string());

        let mut position = 0;
        while position < self.modules[module_index].children.len() {
            let child = &self.modules[module_index].children[position];
            if child.kind != EntityKind::Placeholder {
                position += 1;
                continue;
            }
            let placeholder = child.clone();
            let original_path = placeholder.original_path.clone().unwrap_or_default();

            // Submodule imports are documented on their own page
            if self.index.contains_key(&original_path) {
                self.modules[module_index].children.remove(position);
                continue;
            }

            let Some((imported_from, original_name)) = original_path.rsplit_once('.') else {
                self.warn_unknown_module(&original_path, module_name);
                self.modules[module_index].children.remove(position);
                continue;
            };

            if visit_path.iter().any(|visited| visited == imported_from) {
                self.diagnostics.warn(
                    WarningCategory::PythonImportResolution,
                    format!(
                        "Cannot resolve cyclic import: {}, {}",
                        visit_path.join(", "),
                        imported_from
                    ),
                );
                self.modules[module_index].children.remove(position);
                continue;
            }

            let Some(&source_index) = self.index.get(imported_from) else {
                self.warn_unknown_module(imported_from, module_name);
                self.modules[module_index].children.remove(position);
                continue;
            };

            self.resolve_module(imported_from, visit_path);

            if original_name == "*" {
                let expanded = self.expand_wildcard(source_index, module_index, &placeholder);
                let count = expanded.len();
                self.modules[module_index]
                    .children
                    .splice(position..=position, expanded);
                position += count;
                continue;
            }

            let original = self.modules[source_index]
                .child(original_name)
                .filter(|original| original.kind != EntityKind::Placeholder)
                .cloned();
            match original {
                Some(original) => {
                    self.modules[module_index].children[position] =
                        resolve_placeholder(&placeholder, &original);
                    position += 1;
                }
                None => {
                    self.diagnostics.warn(
                        WarningCategory::PythonImportResolution,
                        format!(
                            "Cannot resolve import of {} in {}",
                            original_path, module_name
                        ),
                    );
                    self.modules[module_index].children.remove(position);
                }
            }
        }

        // A wildcard may bind a name that a later import binds again
        let children = std::mem::take(&mut self.modules[module_index].children);
        self.modules[module_index].children = keep_last_binding(children);

        visit_path.pop();
        self.resolved.insert(module_name.to_string());
    }

    /// Concrete records for a `from x import *` placeholder.
    ///
    /// Names come from the source module's public-name list when it has one,
    /// otherwise from all of its children. Names already bound in the
    /// importing module are skipped.
    fn expand_wildcard(
        &mut self,
        source_index: usize,
        target_index: usize,
        placeholder: &Entity,
    ) -> Vec<Entity> {
        let source = &self.modules[source_index];
        let source_name = source.name.clone();
        let originals: HashMap<&str, &Entity> = source
            .children
            .iter()
            .filter(|child| child.kind != EntityKind::Placeholder)
            .map(|child| (child.name.as_str(), child))
            .collect();

        let mut invalid = Vec::new();
        let mut selected: Vec<Entity> = Vec::new();
        match &source.all {
            Some(all) => {
                for name in all {
                    if name == "__all__" {
                        continue;
                    }
                    match originals.get(name.as_str()) {
                        Some(original) => selected.push((*original).clone()),
                        None => invalid.push(name.clone()),
                    }
                }
            }
            None => {
                selected.extend(
                    source
                        .children
                        .iter()
                        .filter(|child| child.kind != EntityKind::Placeholder)
                        .cloned(),
                );
            }
        }

        for name in invalid {
            self.diagnostics.warn(
                WarningCategory::PythonImportResolution,
                format!("Invalid __all__ entry {} in {}", name, source_name),
            );
        }

        let bound: HashSet<String> = self.modules[target_index]
            .children
            .iter()
            .filter(|child| child.kind != EntityKind::Placeholder)
            .map(|child| child.name.clone())
            .collect();

        selected
            .into_iter()
            .filter(|original| !bound.contains(&original.name))
            .map(|original| {
                let mut expanded = Entity::placeholder(
                    original.name.clone(),
                    replace_last_star(&placeholder.qual_name, &original.name),
                    replace_last_star(&placeholder.full_name, &original.name),
                    original.full_name.clone(),
                );
                expanded.doc = placeholder.doc.clone();
                resolve_placeholder(&expanded, &original)
            })
            .collect()
    }

    fn warn_unknown_module(&mut self, imported_from: &str, module_name: &str) {
        self.diagnostics.warn(
            WarningCategory::PythonImportResolution,
            format!(
                "Cannot resolve import of unknown module {} in {}",
                imported_from, module_name
            ),
        );
    }
}

/// Drop earlier records of a rebound name; the last record takes the
/// position of the first.
fn keep_last_binding(children: Vec<Entity>) -> Vec<Entity> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Entity> = Vec::with_capacity(children.len());
    for child in children {
        match index.get(&child.name) {
            Some(&position) => kept[position] = child,
            None => {
                index.insert(child.name.clone(), kept.len());
                kept.push(child);
            }
        }
    }
    kept
}

fn replace_last_star(dotted: &str, name: &str) -> String {
    match dotted.rsplit_once('.') {
        Some((prefix, "*")) => format!("{prefix}.{name}"),
        _ if dotted == "*" => name.to_string(),
        _ => dotted.replace('*', name),
    }
}

/// Copy `original` into the position described by `placeholder`.
///
/// The copy keeps the placeholder's names, records where it came from, drops
/// source line numbers (they belong to another file) and moves every
/// descendant under the new full name.
pub fn resolve_placeholder(placeholder: &Entity, original: &Entity) -> Entity {
    let mut resolved = original.clone();
    resolved.name = placeholder.name.clone();
    resolved.qual_name = placeholder.qual_name.clone();
    resolved.full_name = placeholder.full_name.clone();
    resolved.original_path = Some(original.full_name.clone());
    resolved.strip_lines();
    resolved.relocate_descendants(&original.full_name, &placeholder.full_name);
    resolved
}

/// Convenience wrapper around [`PlaceholderResolver`].
pub fn resolve_placeholders(modules: &mut [Entity]) -> Diagnostics {
    PlaceholderResolver::new(modules).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, children: Vec<Entity>) -> Entity {
        Entity::new(EntityKind::Module, name, name, name).with_children(children)
    }

    fn class_in(module: &str, name: &str) -> Entity {
        let method = Entity::new(
            EntityKind::Method,
            "run",
            format!("{name}.run"),
            format!("{module}.{name}.run"),
        )
        .with_lines(4, 5);
        Entity::new(EntityKind::Class, name, name, format!("{module}.{name}"))
            .with_lines(2, 5)
            .with_doc("A thing.")
            .with_children(vec![method])
    }

    fn import(module: &str, name: &str, original: &str) -> Entity {
        Entity::placeholder(name, name, format!("{module}.{name}"), original)
    }

    #[test]
    fn test_resolves_simple_reexport() {
        let mut modules = vec![
            module("p", vec![import("p", "Thing", "p.m.Thing")]),
            module("p.m", vec![class_in("p.m", "Thing")]),
        ];
        let diagnostics = resolve_placeholders(&mut modules);
        assert!(diagnostics.is_empty());

        let thing = &modules[0].children[0];
        assert_eq!(thing.kind, EntityKind::Class);
        assert_eq!(thing.full_name, "p.Thing");
        assert_eq!(thing.original_path.as_deref(), Some("p.m.Thing"));
        assert_eq!(thing.doc, "A thing.");
        assert!(thing.from_line.is_none());
        assert_eq!(thing.children[0].full_name, "p.Thing.run");
        assert!(thing.children[0].from_line.is_none());
        // The original is untouched
        assert_eq!(modules[1].children[0].from_line, Some(2));
    }

    #[test]
    fn test_chained_reexports_point_at_previous_hop() {
        let mut modules = vec![
            module("a", vec![import("a", "Thing", "b.Thing")]),
            module("b", vec![import("b", "Thing", "c.Thing")]),
            module("c", vec![class_in("c", "Thing")]),
        ];
        resolve_placeholders(&mut modules);

        let thing = &modules[0].children[0];
        assert_eq!(thing.original_path.as_deref(), Some("b.Thing"));
        assert_eq!(modules[1].children[0].original_path.as_deref(), Some("c.Thing"));
        assert_eq!(thing.kind, EntityKind::Class);
        assert_eq!(thing.doc, "A thing.");
        let children: Vec<_> = thing.children.iter().map(|c| c.full_name.as_str()).collect();
        assert_eq!(children, vec!["a.Thing.run"]);
    }

    #[test]
    fn test_explicit_import_after_wildcard_wins() {
        let mut modules = vec![
            module(
                "p",
                vec![
                    Entity::placeholder("p.a.*", "*", "p.*", "p.a.*"),
                    import("p", "X", "p.b.X"),
                ],
            ),
            module("p.a", vec![class_in("p.a", "X"), class_in("p.a", "Y")]),
            module("p.b", vec![class_in("p.b", "X")]),
        ];
        let diagnostics = resolve_placeholders(&mut modules);
        assert!(diagnostics.is_empty());

        let bound: Vec<_> = modules[0]
            .children
            .iter()
            .map(|c| (c.full_name.as_str(), c.original_path.as_deref()))
            .collect();
        assert_eq!(
            bound,
            vec![("p.X", Some("p.b.X")), ("p.Y", Some("p.a.Y"))]
        );
    }

    #[test]
    fn test_cyclic_import_is_dropped_with_warning() {
        let mut modules = vec![
            module("a", vec![import("a", "X", "b.X")]),
            module("b", vec![import("b", "X", "a.X")]),
        ];
        let diagnostics = resolve_placeholders(&mut modules);

        assert!(modules.iter().all(|m| m.children.is_empty()));
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.clone()).collect();
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Cannot resolve cyclic import: a, b")));
    }

    #[test]
    fn test_unknown_module_is_dropped() {
        let mut modules = vec![module("a", vec![import("a", "X", "nowhere.X")])];
        let diagnostics = resolve_placeholders(&mut modules);
        assert!(modules[0].children.is_empty());
        assert_eq!(
            diagnostics.iter().next().unwrap().message,
            "Cannot resolve import of unknown module nowhere in a"
        );
        assert_eq!(
            diagnostics.iter().next().unwrap().category,
            WarningCategory::PythonImportResolution
        );
    }

    #[test]
    fn test_missing_name_is_dropped() {
        let mut modules = vec![
            module("a", vec![import("a", "Y", "b.Y")]),
            module("b", vec![class_in("b", "X")]),
        ];
        let diagnostics = resolve_placeholders(&mut modules);
        assert!(modules[0].children.is_empty());
        assert_eq!(
            diagnostics.iter().next().unwrap().message,
            "Cannot resolve import of b.Y in a"
        );
    }

    #[test]
    fn test_submodule_import_is_dropped_silently() {
        let mut modules = vec![
            module("p", vec![import("p", "m", "p.m")]),
            module("p.m", vec![]),
        ];
        let diagnostics = resolve_placeholders(&mut modules);
        assert!(modules[0].children.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_wildcard_uses_public_name_list() {
        let mut source = module("b", vec![class_in("b", "X"), class_in("b", "Y")]);
        source.all = Some(vec!["X".into(), "Missing".into(), "__all__".into()]);
        let mut modules = vec![
            module("a", vec![Entity::placeholder("b.*", "*", "a.*", "b.*")]),
            source,
        ];
        let diagnostics = resolve_placeholders(&mut modules);

        let names: Vec<_> = modules[0].children.iter().map(|c| c.full_name.as_str()).collect();
        assert_eq!(names, vec!["a.X"]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().message,
            "Invalid __all__ entry Missing in b"
        );
    }

    #[test]
    fn test_wildcard_without_list_takes_all_children_and_skips_bound_names() {
        let mut modules = vec![
            module(
                "a",
                vec![
                    Entity::placeholder("b.*", "*", "a.*", "b.*"),
                    Entity::new(EntityKind::Data, "Y", "Y", "a.Y"),
                ],
            ),
            module("b", vec![class_in("b", "X"), class_in("b", "Y")]),
        ];
        resolve_placeholders(&mut modules);

        let names: Vec<_> = modules[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y"]);
        assert_eq!(modules[0].children[1].kind, EntityKind::Data);
        assert_eq!(modules[0].children[0].qual_name, "X");
    }

    #[test]
    fn test_no_placeholders_survive() {
        let mut modules = vec![
            module(
                "a",
                vec![
                    import("a", "X", "b.X"),
                    import("a", "Z", "b.Z"),
                    import("a", "Q", "zz.Q"),
                ],
            ),
            module("b", vec![class_in("b", "X")]),
        ];
        resolve_placeholders(&mut modules);
        for module in &modules {
            assert!(module
                .walk()
                .iter()
                .all(|e| e.kind != EntityKind::Placeholder));
        }
    }
}
