//! Display filtering.
//!
//! Two passes run on entity records before objects are built:
//! [`hide_stdlib_inherited`] and [`hide_non_public_children`]. Once the
//! [`ObjectStore`] exists, [`VisibilityFilter::select`] decides which objects
//! are displayed and which get their own page, propagating hidden parents to
//! their children.

use crate::config::{DisplayConfig, DocOption, DocOptions};
use crate::diagnostics::{Diagnostics, WarningCategory};
use crate::entity::{Entity, EntityKind};
use crate::objects::{ApiObject, ObjectId, ObjectStore};
use std::collections::HashSet;

/// Caller-supplied override of the skip decision.
///
/// Receives the object's kind, its dotted id, the object, the filter's own
/// decision and the enabled options. Returning `Some(skip)` replaces the
/// decision; `None` keeps it.
pub trait SkipHook {
    fn skip_member(
        &self,
        kind: EntityKind,
        id: &str,
        object: &ApiObject,
        skip: bool,
        options: &DocOptions,
    ) -> Option<bool>;
}

impl<F> SkipHook for F
where
    F: Fn(EntityKind, &str, &ApiObject, bool, &DocOptions) -> Option<bool>,
{
    fn skip_member(
        &self,
        kind: EntityKind,
        id: &str,
        object: &ApiObject,
        skip: bool,
        options: &DocOptions,
    ) -> Option<bool> {
        self(kind, id, object, skip, options)
    }
}

/// Mark every inherited member whose origin is a standard-library class as
/// hidden, unless that class is abstract or its top-level module is itself
/// being documented.
pub fn hide_stdlib_inherited(modules: &mut [Entity], is_stdlib: impl Fn(&str) -> bool) {
    let documented: HashSet<String> = modules.iter().map(|m| m.full_name.clone()).collect();

    fn visit(entity: &mut Entity, documented: &HashSet<String>, is_stdlib: &dyn Fn(&str) -> bool) {
        if entity.inherited {
            if let Some(origin) = &entity.inherited_from {
                let top = origin.full_name.split('.').next().unwrap_or_default();
                if is_stdlib(top) && !origin.is_abstract && !documented.contains(top) {
                    entity.hide = true;
                }
            }
        }
        for child in &mut entity.children {
            visit(child, documented, is_stdlib);
        }
    }

    for module in modules.iter_mut() {
        visit(module, &documented, &is_stdlib);
    }
}

/// Hide module children that are not part of the public interface.
///
/// With a public-name list, every child whose `qual_name` is not listed is
/// hidden. Without one, a plain module (not a package) hides the children it
/// imported from elsewhere.
pub fn hide_non_public_children(modules: &mut [Entity]) {
    for module in modules.iter_mut() {
        match &module.all {
            Some(all) => {
                let public: HashSet<&str> = all.iter().map(String::as_str).collect();
                for child in &mut module.children {
                    if !public.contains(child.qual_name.as_str()) {
                        child.hide = true;
                    }
                }
            }
            None if module.kind == EntityKind::Module => {
                for child in &mut module.children {
                    if child.is_imported() {
                        child.hide = true;
                    }
                }
            }
            None => {}
        }
    }
}

/// Decides whether objects are displayed.
pub struct VisibilityFilter {
    options: DocOptions,
    own_page_types: &'static [EntityKind],
    hook: Option<Box<dyn SkipHook>>,
}

impl VisibilityFilter {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            options: config.options.clone(),
            own_page_types: config.own_page_types(),
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: impl SkipHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn options(&self) -> &DocOptions {
        &self.options
    }

    /// The filter's own decision, before the hook is consulted.
    pub fn should_skip(&self, object: &ApiObject) -> bool {
        let missing = |option: DocOption| !self.options.contains(option);

        let skip = object.hidden()
            || (object.is_undoc_member() && missing(DocOption::UndocMembers))
            || (object.is_private_member() && missing(DocOption::PrivateMembers))
            || (object.is_special_member() && missing(DocOption::SpecialMembers))
            || (object.imported() && missing(DocOption::ImportedMembers))
            || (object.inherited() && missing(DocOption::InheritedMembers));

        // Constructors are documented through their class
        skip || (object.kind() == EntityKind::Method
            && matches!(object.name(), "__init__" | "__new__"))
    }

    /// Final display decision, with the hook applied.
    pub fn is_displayed(&self, object: &ApiObject) -> bool {
        let skip = self.should_skip(object);
        let skip = self
            .hook
            .as_ref()
            .and_then(|hook| {
                hook.skip_member(object.kind(), object.id(), object, skip, &self.options)
            })
            .unwrap_or(skip);
        !skip
    }

    fn display(&self, store: &mut ObjectStore, id: ObjectId) -> bool {
        let Some(object) = store.get(id) else {
            return false;
        };
        if let Some(display) = object.display() {
            return display;
        }
        let display = self.is_displayed(object);
        if let Some(object) = store.get_mut(id) {
            object.display = Some(display);
        }
        display
    }

    fn hide(store: &mut ObjectStore, id: ObjectId) {
        if let Some(object) = store.get_mut(id) {
            object.entity.hide = true;
        }
    }

    /// Compute display decisions and the own-page selection.
    ///
    /// Top-level objects are processed shortest id first, so a package is
    /// decided before its subpackages and submodules; an undisplayed package
    /// hides them. Every child of an undisplayed object is hidden as well.
    pub fn select(&self, store: &mut ObjectStore) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        store.render.clear();
        let all: Vec<ObjectId> = store.iter().map(|(id, _)| id).collect();
        for id in all {
            if let Some(object) = store.get_mut(id) {
                object.display = None;
            }
        }

        let mut top_level = store.top_level().to_vec();
        top_level.sort_by_key(|&id| store.get(id).map_or(0, |o| o.id().len()));

        for &id in &top_level {
            if self.display(store, id) {
                store.render.push(id);
            } else if let Some(object) = store.get(id) {
                let nested: Vec<ObjectId> = object
                    .subpackages
                    .iter()
                    .chain(object.submodules.iter())
                    .copied()
                    .collect();
                for module in nested {
                    Self::hide(store, module);
                }
            }
        }

        for id in store.top_level().to_vec() {
            self.select_children(store, id);
        }

        if store.render.is_empty() {
            diagnostics.warn(
                WarningCategory::NothingRendered,
                "No modules were rendered. Do you need to set the display options to render additional objects?",
            );
        }
        log::debug!("Selected {} objects to render", store.render.len());
        diagnostics
    }

    fn select_children(&self, store: &mut ObjectStore, parent: ObjectId) {
        let parent_displayed = self.display(store, parent);
        let children = store.get(parent).map(|o| o.children.clone()).unwrap_or_default();
        for child in children {
            if !parent_displayed {
                Self::hide(store, child);
            }
            let kind = store.get(child).map(ApiObject::kind);
            if self.display(store, child)
                && kind.is_some_and(|kind| self.own_page_types.contains(&kind))
            {
                store.render.push(child);
            }
            self.select_children(store, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::InheritedFrom;

    fn entity(kind: EntityKind, full: &str, doc: &str) -> Entity {
        let name = if kind.is_module_like() {
            full
        } else {
            full.rsplit('.').next().unwrap_or(full)
        };
        Entity::new(kind, name, name, full).with_doc(doc)
    }

    fn build(modules: Vec<Entity>, config: &DisplayConfig) -> ObjectStore {
        ObjectStore::build(modules, config).0
    }

    #[test]
    fn test_hide_non_public_with_list() {
        let mut module = entity(EntityKind::Module, "m", "").with_children(vec![
            entity(EntityKind::Function, "m.a", ""),
            entity(EntityKind::Function, "m.b", ""),
        ]);
        module.all = Some(vec!["a".into()]);
        let mut modules = vec![module];
        hide_non_public_children(&mut modules);
        assert!(!modules[0].children[0].hide);
        assert!(modules[0].children[1].hide);
    }

    #[test]
    fn test_hide_imported_only_in_plain_modules() {
        let mut imported = entity(EntityKind::Class, "x.Thing", "");
        imported.original_path = Some("y.Thing".into());
        let mut modules = vec![
            entity(EntityKind::Module, "x", "").with_children(vec![imported.clone()]),
            entity(EntityKind::Package, "p", "").with_children(vec![imported]),
        ];
        hide_non_public_children(&mut modules);
        assert!(modules[0].children[0].hide);
        assert!(!modules[1].children[0].hide);
    }

    #[test]
    fn test_hide_stdlib_inherited() {
        let mut inherited = entity(EntityKind::Method, "m.C.append", "");
        inherited.inherited = true;
        inherited.inherited_from = Some(InheritedFrom {
            name: "UserList".into(),
            full_name: "collections.UserList".into(),
            is_abstract: false,
        });
        let mut abstract_origin = inherited.clone();
        abstract_origin.name = "keys".into();
        abstract_origin.inherited_from = Some(InheritedFrom {
            name: "Mapping".into(),
            full_name: "collections.abc.Mapping".into(),
            is_abstract: true,
        });
        let class = entity(EntityKind::Class, "m.C", "")
            .with_children(vec![inherited, abstract_origin]);
        let mut modules = vec![entity(EntityKind::Module, "m", "").with_children(vec![class])];

        hide_stdlib_inherited(&mut modules, |name| name == "collections");
        let members = &modules[0].children[0].children;
        assert!(members[0].hide);
        assert!(!members[1].hide);
    }

    #[test]
    fn test_should_skip_rules() {
        let module = entity(EntityKind::Module, "m", "Doc.").with_children(vec![
            entity(EntityKind::Function, "m.undocumented", ""),
            entity(EntityKind::Function, "m._private", "Doc."),
            entity(EntityKind::Function, "m.__dunder__", "Doc."),
            entity(EntityKind::Function, "m.public", "Doc."),
        ]);
        let config = DisplayConfig::default().with_options(DocOptions::from_iter([DocOption::Members]));
        let store = build(vec![module], &config);
        let filter = VisibilityFilter::new(&config);

        let displayed = |id: &str| filter.is_displayed(store.lookup(id).unwrap());
        assert!(!displayed("m.undocumented"));
        assert!(!displayed("m._private"));
        assert!(!displayed("m.__dunder__"));
        assert!(displayed("m.public"));
    }

    #[test]
    fn test_constructor_methods_always_skipped() {
        let class = entity(EntityKind::Class, "m.C", "Doc.").with_children(vec![
            entity(EntityKind::Method, "m.C.__init__", "Init."),
            entity(EntityKind::Method, "m.C.__call__", "Call."),
        ]);
        let config = DisplayConfig::default();
        let store = build(vec![entity(EntityKind::Module, "m", "").with_children(vec![class])], &config);
        let filter = VisibilityFilter::new(&config);

        assert!(!filter.is_displayed(store.lookup("m.C.__init__").unwrap()));
        assert!(filter.is_displayed(store.lookup("m.C.__call__").unwrap()));
    }

    #[test]
    fn test_hook_overrides_decision() {
        let module = entity(EntityKind::Module, "m", "").with_children(vec![
            entity(EntityKind::Function, "m._private", "Doc."),
            entity(EntityKind::Function, "m.public", "Doc."),
        ]);
        let config = DisplayConfig::default();
        let store = build(vec![module], &config);
        let filter = VisibilityFilter::new(&config).with_hook(
            |_kind: EntityKind, id: &str, _object: &ApiObject, _skip: bool, _options: &DocOptions| {
                (id == "m.public").then_some(true)
            },
        );

        assert!(!filter.is_displayed(store.lookup("m.public").unwrap()));
        assert!(filter.is_displayed(store.lookup("m._private").unwrap()));
    }

    #[test]
    fn test_select_hides_children_of_hidden_parent() {
        let mut class = entity(EntityKind::Class, "m._Hidden", "Doc.")
            .with_children(vec![entity(EntityKind::Method, "m._Hidden.run", "Doc.")]);
        class.hide = true;
        let module = entity(EntityKind::Module, "m", "Doc.").with_children(vec![class]);
        let config = DisplayConfig::default();
        let mut store = build(vec![module], &config);

        let diagnostics = VisibilityFilter::new(&config).select(&mut store);
        assert!(diagnostics.is_empty());
        assert!(store.lookup("m._Hidden.run").unwrap().hidden());
        assert_eq!(store.lookup("m._Hidden.run").unwrap().display(), Some(false));
        let rendered: Vec<_> = store.objects_to_render().map(|o| o.id().to_string()).collect();
        assert_eq!(rendered, vec!["m"]);
    }

    #[test]
    fn test_select_hidden_package_hides_submodules() {
        let mut package = entity(EntityKind::Package, "p", "Doc.");
        package.hide = true;
        let modules = vec![
            package,
            entity(EntityKind::Module, "p.sub", "Doc."),
            entity(EntityKind::Module, "q", "Doc."),
        ];
        let config = DisplayConfig::default();
        let mut store = build(modules, &config);
        VisibilityFilter::new(&config).select(&mut store);

        let rendered: Vec<_> = store.objects_to_render().map(|o| o.id().to_string()).collect();
        assert_eq!(rendered, vec!["q"]);
        assert!(store.lookup("p.sub").unwrap().hidden());
    }

    #[test]
    fn test_select_own_page_level_class() {
        let module = entity(EntityKind::Module, "m", "Doc.").with_children(vec![
            entity(EntityKind::Class, "m.C", "Doc."),
            entity(EntityKind::Function, "m.f", "Doc."),
        ]);
        let config = DisplayConfig::default().with_own_page_level(EntityKind::Class);
        let mut store = build(vec![module], &config);
        VisibilityFilter::new(&config).select(&mut store);

        let rendered: Vec<_> = store.objects_to_render().map(|o| o.id().to_string()).collect();
        assert_eq!(rendered, vec!["m", "m.C"]);
    }

    #[test]
    fn test_nothing_rendered_warning() {
        let mut module = entity(EntityKind::Module, "m", "");
        module.hide = true;
        let config = DisplayConfig::default();
        let mut store = build(vec![module], &config);
        let diagnostics = VisibilityFilter::new(&config).select(&mut store);
        assert_eq!(
            diagnostics.of_category(WarningCategory::NothingRendered).len(),
            1
        );
    }
}
