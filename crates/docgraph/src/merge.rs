//! Child collection and inheritance merging.
//!
//! [`ChildCollector`] assembles the member list of a module or class as the
//! parser produces records, folding `@overload` groups into one record.
//! [`merge_inherited`] then combines a class's own members with those of its
//! ancestors, walking the method resolution order.

use crate::entity::{Entity, EntityKind, InheritedFrom, Overload};
use std::collections::{HashMap, HashSet};

/// What happens when a name is bound twice in the same container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redefinition {
    /// Later binding replaces the earlier record in place (module scope).
    Replace,
    /// Both records are kept; [`merge_inherited`] keeps the first (class scope).
    Keep,
}

/// Ordered child list with overload grouping.
#[derive(Debug)]
pub struct ChildCollector {
    children: Vec<Entity>,
    by_name: HashMap<String, usize>,
    overload_groups: HashMap<String, usize>,
    redefinition: Redefinition,
}

impl ChildCollector {
    pub fn new(redefinition: Redefinition) -> Self {
        Self {
            children: Vec::new(),
            by_name: HashMap::new(),
            overload_groups: HashMap::new(),
            redefinition,
        }
    }

    /// Add one parsed record.
    ///
    /// A callable whose name already heads an overload group is folded into
    /// the group's canonical record instead of being appended: overload
    /// declarations add a signature, the implementation supplies the
    /// canonical `args` and `return_annotation`.
    pub fn push(&mut self, mut child: Entity) {
        if child.kind.is_callable() {
            if let Some(&index) = self.overload_groups.get(&child.name) {
                let grouped = &mut self.children[index];
                if !child.doc.is_empty() {
                    grouped.doc = child.doc;
                }
                if child.is_overload {
                    grouped.overloads.push(Overload {
                        args: child.args,
                        return_annotation: child.return_annotation,
                    });
                } else {
                    grouped.args = child.args;
                    grouped.return_annotation = child.return_annotation;
                    grouped.properties = child.properties;
                }
                return;
            }

            if child.is_overload {
                child.overloads.push(Overload {
                    args: child.args.clone(),
                    return_annotation: child.return_annotation.clone(),
                });
                let name = child.name.clone();
                let index = self.insert(child);
                self.overload_groups.insert(name, index);
                return;
            }
        }

        self.insert(child);
    }

    pub fn extend(&mut self, children: impl IntoIterator<Item = Entity>) {
        for child in children {
            self.push(child);
        }
    }

    fn insert(&mut self, child: Entity) -> usize {
        if self.redefinition == Redefinition::Replace {
            if let Some(&index) = self.by_name.get(&child.name) {
                self.overload_groups.remove(&child.name);
                self.children[index] = child;
                return index;
            }
        }
        let index = self.children.len();
        self.by_name.entry(child.name.clone()).or_insert(index);
        self.children.push(child);
        index
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn into_children(self) -> Vec<Entity> {
        self.children
    }
}

/// Insertion-ordered name → record map; replacing a key keeps its position.
#[derive(Default)]
struct OrderedMembers {
    entries: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl OrderedMembers {
    fn get(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Entity> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    fn insert(&mut self, entity: Entity) {
        match self.index.get(&entity.name) {
            Some(&i) => self.entries[i] = entity,
            None => {
                self.index.insert(entity.name.clone(), self.entries.len());
                self.entries.push(entity);
            }
        }
    }
}

/// Merge a class's own members with those of its ancestors.
///
/// `ancestors` must be in method resolution order, excluding the class
/// itself and the root object type. For each name the first class in the
/// order that defines it wins, except that a property found later replaces
/// an attribute of the same name. Records merged from an ancestor are marked
/// `inherited` and relocated under the derived class's names. A member with
/// no docstring borrows the docstring of the first later definition that has
/// one.
pub fn merge_inherited(derived: &Entity, ancestors: &[Entity]) -> Vec<Entity> {
    let mut members = OrderedMembers::default();
    let mut overridden: HashSet<String> = HashSet::new();

    let classes = std::iter::once(derived).chain(ancestors.iter());
    for (position, class) in classes.enumerate() {
        let inherited = position != 0;
        let mut seen = HashSet::new();
        let mut base_children = Vec::new();

        for child in &class.children {
            if let Some(existing) = members.get_mut(&child.name) {
                if existing.doc.is_empty() && !child.doc.is_empty() {
                    existing.doc = child.doc.clone();
                }
            }
            if overridden.contains(&child.name) {
                continue;
            }
            seen.insert(child.name.clone());

            let mut child = child.clone();
            if inherited {
                child.inherited = true;
                child.inherited_from = Some(InheritedFrom {
                    name: class.name.clone(),
                    full_name: class.full_name.clone(),
                    is_abstract: class.is_abstract,
                });
                relocate(&mut child, class, derived);
            }
            base_children.push(child);
        }
        overridden.extend(seen);

        for child in base_children {
            if let Some(existing) = members.get(&child.name) {
                let property_over_attribute = child.kind == EntityKind::Property
                    && existing.kind == EntityKind::Attribute;
                if !property_over_attribute {
                    continue;
                }
            }
            members.insert(child);
        }
    }

    members.entries
}

fn relocate(child: &mut Entity, from: &Entity, to: &Entity) {
    if from.full_name == to.full_name {
        return;
    }
    let old_full = child.full_name.clone();
    if let Some(rest) = child.full_name.strip_prefix(&from.full_name) {
        if rest.starts_with('.') {
            child.full_name = format!("{}{}", to.full_name, rest);
        }
    }
    let old_qual = child.qual_name.clone();
    if let Some(rest) = child.qual_name.strip_prefix(&from.qual_name) {
        if rest.starts_with('.') {
            child.qual_name = format!("{}{}", to.qual_name, rest);
        }
    }
    let (new_full, new_qual) = (child.full_name.clone(), child.qual_name.clone());
    child.relocate_descendants(&old_full, &new_full);
    child.relocate_descendant_qual_names(&old_qual, &new_qual);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ArgInfo, EntityKind};

    fn member(kind: EntityKind, class: &Entity, name: &str, doc: &str) -> Entity {
        Entity::new(
            kind,
            name,
            format!("{}.{}", class.qual_name, name),
            format!("{}.{}", class.full_name, name),
        )
        .with_doc(doc)
    }

    fn class(name: &str) -> Entity {
        Entity::new(EntityKind::Class, name, name, format!("m.{name}"))
    }

    fn function(name: &str, overload: bool, arg: &str) -> Entity {
        let mut f = Entity::new(EntityKind::Function, name, name, format!("m.{name}"));
        f.is_overload = overload;
        f.args = vec![ArgInfo::named(arg)];
        f
    }

    #[test]
    fn test_overload_group_folds_into_first_record() {
        let mut collector = ChildCollector::new(Redefinition::Replace);
        collector.push(function("f", true, "a"));
        collector.push(function("f", true, "b"));
        collector.push(function("f", true, "c"));
        collector.push(function("f", false, "impl").with_doc("Implementation."));

        let children = collector.into_children();
        assert_eq!(children.len(), 1);
        let f = &children[0];
        assert_eq!(f.overloads.len(), 3);
        assert_eq!(f.overloads[1].args[0].name.as_deref(), Some("b"));
        assert_eq!(f.args[0].name.as_deref(), Some("impl"));
        assert_eq!(f.doc, "Implementation.");
    }

    #[test]
    fn test_module_redefinition_replaces_in_place() {
        let mut collector = ChildCollector::new(Redefinition::Replace);
        let mut first = Entity::new(EntityKind::Data, "value", "value", "m.value");
        first.value = Some("'value1'".to_string());
        let mut second = first.clone();
        second.value = Some("'value2'".to_string());

        collector.push(first);
        collector.push(Entity::new(EntityKind::Data, "other", "other", "m.other"));
        collector.push(second);

        let children = collector.into_children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].value.as_deref(), Some("'value2'"));
    }

    #[test]
    fn test_class_keep_policy_appends_duplicates() {
        let mut collector = ChildCollector::new(Redefinition::Keep);
        let c = class("C");
        collector.push(member(EntityKind::Attribute, &c, "x", ""));
        collector.push(member(EntityKind::Attribute, &c, "x", ""));
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_merge_marks_inherited_members() {
        let mut base = class("Base");
        base.children = vec![
            member(EntityKind::Method, &base, "a", "Base a."),
            member(EntityKind::Method, &base, "b", "Base b."),
        ];
        let mut derived = class("Derived");
        derived.children = vec![member(EntityKind::Method, &derived, "a", "")];

        let merged = merge_inherited(&derived, std::slice::from_ref(&base));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "a");
        assert!(!merged[0].inherited);
        // docstring borrowed from the overridden definition
        assert_eq!(merged[0].doc, "Base a.");
        assert_eq!(merged[1].name, "b");
        assert!(merged[1].inherited);
        assert_eq!(merged[1].full_name, "m.Derived.b");
        assert_eq!(merged[1].qual_name, "Derived.b");
        let from = merged[1].inherited_from.as_ref().unwrap();
        assert_eq!(from.full_name, "m.Base");
    }

    #[test]
    fn test_merge_first_definition_wins_within_class() {
        let mut c = class("C");
        c.children = vec![
            member(EntityKind::Attribute, &c, "x", "class level"),
            member(EntityKind::Attribute, &c, "x", "from __init__"),
        ];
        let merged = merge_inherited(&c, &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].doc, "class level");
    }

    #[test]
    fn test_merge_property_replaces_attribute() {
        let mut c = class("C");
        c.children = vec![
            member(EntityKind::Attribute, &c, "size", ""),
            member(EntityKind::Method, &c, "grow", ""),
            member(EntityKind::Property, &c, "size", "The size."),
        ];

        let merged = merge_inherited(&c, &[]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].kind, EntityKind::Property);
        assert_eq!(merged[0].doc, "The size.");
    }

    #[test]
    fn test_merge_overridden_names_skip_ancestor_members() {
        let mut base = class("Base");
        base.children = vec![member(EntityKind::Property, &base, "size", "")];
        let mut derived = class("Derived");
        derived.children = vec![member(EntityKind::Attribute, &derived, "size", "")];

        let merged = merge_inherited(&derived, &[base]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, EntityKind::Attribute);
        assert!(!merged[0].inherited);
    }

    #[test]
    fn test_merge_respects_resolution_order() {
        let mut left = class("Left");
        left.children = vec![member(EntityKind::Method, &left, "go", "left")];
        let mut right = class("Right");
        right.children = vec![
            member(EntityKind::Method, &right, "go", "right"),
            member(EntityKind::Method, &right, "stop", "right stop"),
        ];
        let derived = class("Both");

        let merged = merge_inherited(&derived, &[left, right]);
        let names: Vec<_> = merged.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["go", "stop"]);
        assert_eq!(merged[0].doc, "left");
        assert_eq!(merged[0].inherited_from.as_ref().unwrap().name, "Left");
    }

    #[test]
    fn test_merge_without_ancestors_keeps_order() {
        let mut c = class("C");
        c.children = vec![
            member(EntityKind::Method, &c, "z", ""),
            member(EntityKind::Method, &c, "a", ""),
        ];
        let merged = merge_inherited(&c, &[]);
        assert_eq!(merged[0].name, "z");
        assert!(merged.iter().all(|m| !m.inherited));
    }
}
