//! Object model built from resolved entity records.
//!
//! Objects live in an arena owned by [`ObjectStore`] and refer to each other by
//! [`ObjectId`]. Parent/child links, the package hierarchy and the resolved
//! docstrings are computed once when the store is built.

use crate::config::{ClassContent, DisplayConfig, MemberOrder};
use crate::diagnostics::{Diagnostics, WarningCategory};
use crate::entity::{ArgInfo, Entity, EntityKind};
use crate::error::{DocError, Result};
use std::collections::{BTreeMap, HashMap};

/// Index of an object inside its [`ObjectStore`].
pub type ObjectId = usize;

/// Render an argument list the way it appears in a signature.
///
/// Each entry becomes `prefix + name`, followed by `: annotation` when
/// annotations are shown, followed by the default (` = x` after an
/// annotation, `=x` otherwise). When `ignore_self` is given and the first
/// argument has that name, it is left out.
pub fn format_args(args: &[ArgInfo], include_annotations: bool, ignore_self: Option<&str>) -> String {
    let mut formatted = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        if i == 0 && ignore_self.is_some() && arg.name.as_deref() == ignore_self {
            continue;
        }

        let mut entry = String::new();
        if let Some(prefix) = arg.prefix {
            entry.push_str(prefix.as_str());
        }
        if let Some(name) = &arg.name {
            entry.push_str(name);
        }
        let annotation = arg.annotation.as_deref().filter(|_| include_annotations);
        if let Some(annotation) = annotation {
            entry.push_str(": ");
            entry.push_str(annotation);
        }
        if let Some(default) = &arg.default_value {
            entry.push_str(if annotation.is_some() { " = " } else { "=" });
            entry.push_str(default);
        }
        formatted.push(entry);
    }
    formatted.join(", ")
}

/// A documented object.
#[derive(Debug, Clone)]
pub struct ApiObject {
    /// The record this object was built from; its `children` are moved into
    /// the store and referenced through [`ApiObject::children`].
    pub entity: Entity,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    /// Direct subpackages (packages and modules only), sorted by id
    pub subpackages: Vec<ObjectId>,
    /// Direct submodules (packages and modules only), sorted by id
    pub submodules: Vec<ObjectId>,
    /// Docstring after class-content resolution
    pub docstring: String,
    pub(crate) display: Option<bool>,
}

impl ApiObject {
    fn new(entity: Entity, parent: Option<ObjectId>) -> Self {
        let docstring = entity.doc.clone();
        Self {
            entity,
            parent,
            children: Vec::new(),
            subpackages: Vec::new(),
            submodules: Vec::new(),
            docstring,
            display: None,
        }
    }

    /// Dotted id (the record's `full_name`).
    pub fn id(&self) -> &str {
        &self.entity.full_name
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind
    }

    pub fn name(&self) -> &str {
        &self.entity.name
    }

    pub fn qual_name(&self) -> &str {
        &self.entity.qual_name
    }

    pub fn short_name(&self) -> &str {
        self.entity
            .name
            .rsplit_once('.')
            .map_or(self.entity.name.as_str(), |(_, last)| last)
    }

    /// First non-empty line of the docstring.
    pub fn summary(&self) -> &str {
        self.docstring
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }

    /// True for top-level packages and modules (no dot in the id).
    pub fn is_top_level_object(&self) -> bool {
        !self.id().contains('.')
    }

    pub fn is_undoc_member(&self) -> bool {
        self.docstring.is_empty()
    }

    pub fn is_private_member(&self) -> bool {
        let name = self.short_name();
        name.starts_with('_') && !name.ends_with("__")
    }

    pub fn is_special_member(&self) -> bool {
        let name = self.short_name();
        name.starts_with("__") && name.ends_with("__")
    }

    pub fn imported(&self) -> bool {
        self.entity.is_imported()
    }

    pub fn inherited(&self) -> bool {
        self.entity.inherited
    }

    pub fn hidden(&self) -> bool {
        self.entity.hide
    }

    /// Display decision made by the last selection pass, if any.
    pub fn display(&self) -> Option<bool> {
        self.display
    }

    /// Formatted argument list of a function, method or property.
    pub fn signature(&self, include_annotations: bool) -> String {
        format_args(&self.entity.args, include_annotations, None)
    }

    /// Formatted `(args, return_annotation)` of each overload.
    pub fn overload_signatures(&self, include_annotations: bool) -> Vec<(String, Option<String>)> {
        self.entity
            .overloads
            .iter()
            .map(|overload| {
                (
                    format_args(&overload.args, include_annotations, None),
                    overload.return_annotation.clone(),
                )
            })
            .collect()
    }

    fn sort_key(&self, order: MemberOrder) -> (u32, String) {
        match order {
            MemberOrder::Groupwise => (self.kind().member_order(), self.name().to_string()),
            _ => (0, self.name().to_string()),
        }
    }
}

/// Arena of documented objects.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: Vec<ApiObject>,
    ids: HashMap<String, ObjectId>,
    top_level: Vec<ObjectId>,
    pub(crate) render: Vec<ObjectId>,
    annotations: HashMap<String, BTreeMap<String, String>>,
}

impl ObjectStore {
    /// Build objects for every module record.
    ///
    /// Records of a kind with no object counterpart (placeholders that
    /// survived resolution) are skipped with an `unknown_type` warning.
    pub fn build(modules: Vec<Entity>, config: &DisplayConfig) -> (Self, Diagnostics) {
        let mut store = Self::default();
        let mut diagnostics = Diagnostics::new();

        for module in modules {
            if let Some(id) = store.create(module, None, config, &mut diagnostics) {
                store.top_level.push(id);
            }
        }
        store.create_module_hierarchy();

        log::debug!(
            "Built {} objects from {} modules",
            store.objects.len(),
            store.top_level.len()
        );
        (store, diagnostics)
    }

    fn create(
        &mut self,
        mut entity: Entity,
        parent: Option<ObjectId>,
        config: &DisplayConfig,
        diagnostics: &mut Diagnostics,
    ) -> Option<ObjectId> {
        if entity.kind == EntityKind::Placeholder {
            diagnostics.warn(
                WarningCategory::UnknownType,
                format!("Unknown type: {}", entity.kind),
            );
            return None;
        }

        let children = std::mem::take(&mut entity.children);
        let id = self.objects.len();
        self.ids.insert(entity.full_name.clone(), id);
        self.objects.push(ApiObject::new(entity, parent));

        let mut child_ids: Vec<ObjectId> = children
            .into_iter()
            .filter_map(|child| self.create(child, Some(id), config, diagnostics))
            .collect();

        if config.member_order != MemberOrder::Bysource {
            child_ids.sort_by_cached_key(|&child| self.objects[child].sort_key(config.member_order));
        }
        self.objects[id].children = child_ids;

        if self.objects[id].kind().is_class_like() {
            self.objects[id].docstring = self.resolve_class_docstring(id, config.class_content);
        }
        self.record_typehints(id);

        Some(id)
    }

    fn resolve_class_docstring(&self, id: ObjectId, class_content: ClassContent) -> String {
        let docstring = self.objects[id].entity.doc.clone();
        if class_content == ClassContent::Class {
            return docstring;
        }
        let constructor_docstring = self.constructor_docstring(id);
        if constructor_docstring.is_empty() {
            return docstring;
        }
        match class_content {
            ClassContent::Both => format!("{docstring}\n{constructor_docstring}"),
            _ => constructor_docstring,
        }
    }

    fn record_typehints(&mut self, id: ObjectId) {
        let object = &self.objects[id];
        let (source, include_return) = match object.kind() {
            EntityKind::Class | EntityKind::Exception => match self.constructor(id) {
                Some(constructor) if constructor.entity.overloads.is_empty() => {
                    (&constructor.entity, false)
                }
                _ => return,
            },
            EntityKind::Function | EntityKind::Method if object.entity.overloads.is_empty() => {
                (&object.entity, true)
            }
            EntityKind::Property => (&object.entity, true),
            _ => return,
        };

        let mut annotations = BTreeMap::new();
        for arg in &source.args {
            if let (Some(name), Some(annotation)) = (&arg.name, &arg.annotation) {
                annotations.insert(name.clone(), annotation.clone());
            }
        }
        if include_return {
            if let Some(ret) = &source.return_annotation {
                annotations.insert("return".to_string(), ret.clone());
            }
        }
        let key = object.id().to_string();
        self.annotations.insert(key, annotations);
    }

    fn create_module_hierarchy(&mut self) {
        let top_level = self.top_level.clone();
        for &id in &top_level {
            let name = self.objects[id].name().to_string();
            let Some((parent_name, _)) = name.rsplit_once('.') else {
                continue;
            };
            let Some(parent) = top_level
                .iter()
                .copied()
                .find(|&candidate| self.objects[candidate].name() == parent_name)
            else {
                continue;
            };
            match self.objects[id].kind() {
                EntityKind::Package => self.objects[parent].subpackages.push(id),
                EntityKind::Module => self.objects[parent].submodules.push(id),
                _ => {}
            }
        }

        for &id in &top_level {
            let mut subpackages = std::mem::take(&mut self.objects[id].subpackages);
            let mut submodules = std::mem::take(&mut self.objects[id].submodules);
            subpackages.sort_by(|a, b| self.objects[*a].id().cmp(self.objects[*b].id()));
            submodules.sort_by(|a, b| self.objects[*a].id().cmp(self.objects[*b].id()));
            self.objects[id].subpackages = subpackages;
            self.objects[id].submodules = submodules;
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&ApiObject> {
        self.objects.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut ApiObject> {
        self.objects.get_mut(id)
    }

    /// Look an object up by its dotted id.
    pub fn lookup(&self, dotted: &str) -> Result<&ApiObject> {
        self.ids
            .get(dotted)
            .map(|&id| &self.objects[id])
            .ok_or_else(|| DocError::ObjectNotFound {
                id: dotted.to_string(),
            })
    }

    pub fn id_of(&self, dotted: &str) -> Option<ObjectId> {
        self.ids.get(dotted).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ApiObject)> {
        self.objects.iter().enumerate()
    }

    /// Package and module objects in load order.
    pub fn top_level(&self) -> &[ObjectId] {
        &self.top_level
    }

    /// Objects selected for their own page by the last selection pass.
    pub fn objects_to_render(&self) -> impl Iterator<Item = &ApiObject> {
        self.render.iter().map(|&id| &self.objects[id])
    }

    /// Recorded `name → annotation` map (with `return`) for an object id.
    pub fn annotations(&self, dotted: &str) -> Option<&BTreeMap<String, String>> {
        self.annotations.get(dotted)
    }

    pub fn children(&self, id: ObjectId) -> impl Iterator<Item = &ApiObject> {
        self.objects
            .get(id)
            .into_iter()
            .flat_map(move |object| object.children.iter().map(move |&child| &self.objects[child]))
    }

    pub fn children_of_kind(&self, id: ObjectId, kind: EntityKind) -> Vec<&ApiObject> {
        self.children(id).filter(|child| child.kind() == kind).collect()
    }

    pub fn methods(&self, id: ObjectId) -> Vec<&ApiObject> {
        self.children_of_kind(id, EntityKind::Method)
    }

    pub fn properties(&self, id: ObjectId) -> Vec<&ApiObject> {
        self.children_of_kind(id, EntityKind::Property)
    }

    pub fn attributes(&self, id: ObjectId) -> Vec<&ApiObject> {
        self.children_of_kind(id, EntityKind::Attribute)
    }

    pub fn classes(&self, id: ObjectId) -> Vec<&ApiObject> {
        self.children_of_kind(id, EntityKind::Class)
    }

    pub fn functions(&self, id: ObjectId) -> Vec<&ApiObject> {
        self.children_of_kind(id, EntityKind::Function)
    }

    /// The class's `__init__` method, if it is a method.
    pub fn constructor(&self, id: ObjectId) -> Option<&ApiObject> {
        let init = self.children(id).find(|child| child.short_name() == "__init__")?;
        (init.kind() == EntityKind::Method).then_some(init)
    }

    /// Docstring of `__init__`, or of `__new__` when `__init__` has none.
    pub fn constructor_docstring(&self, id: ObjectId) -> String {
        match self.constructor(id) {
            Some(constructor) if !constructor.docstring.is_empty() => constructor.docstring.clone(),
            _ => self
                .children(id)
                .find(|child| child.short_name() == "__new__")
                .map(|new| new.docstring.clone())
                .unwrap_or_default(),
        }
    }

    /// Constructor arguments of a class, without `self`.
    pub fn class_args(&self, id: ObjectId, include_annotations: bool) -> String {
        self.constructor(id)
            .map(|constructor| format_args(&constructor.entity.args, include_annotations, Some("self")))
            .unwrap_or_default()
    }

    /// Constructor overloads of a class, without `self`.
    pub fn class_overloads(&self, id: ObjectId, include_annotations: bool) -> Vec<(String, Option<String>)> {
        self.constructor(id)
            .map(|constructor| {
                constructor
                    .entity
                    .overloads
                    .iter()
                    .map(|overload| {
                        (
                            format_args(&overload.args, include_annotations, Some("self")),
                            overload.return_annotation.clone(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ArgPrefix, Overload};

    fn entity(kind: EntityKind, full: &str) -> Entity {
        let name = full.rsplit('.').next().unwrap_or(full);
        let name = if kind.is_module_like() { full } else { name };
        Entity::new(kind, name, name, full)
    }

    fn class_with_init(init_doc: &str) -> Entity {
        let mut init = entity(EntityKind::Method, "m.C.__init__").with_doc(init_doc);
        init.args = vec![ArgInfo::named("x").with_annotation("int")];
        let new = entity(EntityKind::Method, "m.C.__new__").with_doc("New doc.");
        entity(EntityKind::Class, "m.C")
            .with_doc("Class doc.")
            .with_children(vec![init, new])
    }

    #[test]
    fn test_format_args_shapes() {
        let args = vec![
            ArgInfo::named("a"),
            ArgInfo::sentinel(ArgPrefix::Slash),
            ArgInfo::named("b").with_annotation("int").with_default("1"),
            ArgInfo::named("c").with_default("None"),
            ArgInfo::variadic(ArgPrefix::Star, "args"),
            ArgInfo::named("d").with_annotation("str"),
            ArgInfo::variadic(ArgPrefix::DoubleStar, "kwargs"),
        ];
        assert_eq!(
            format_args(&args, true, None),
            "a, /, b: int = 1, c=None, *args, d: str, **kwargs"
        );
        assert_eq!(
            format_args(&args, false, None),
            "a, /, b=1, c=None, *args, d, **kwargs"
        );
    }

    #[test]
    fn test_format_args_ignores_self_only_in_first_slot() {
        let args = vec![ArgInfo::named("self"), ArgInfo::named("self")];
        assert_eq!(format_args(&args, true, Some("self")), "self");
        assert_eq!(format_args(&args, true, None), "self, self");
    }

    #[test]
    fn test_build_links_children() {
        let module = entity(EntityKind::Module, "m").with_children(vec![class_with_init("")]);
        let (store, diagnostics) = ObjectStore::build(vec![module], &DisplayConfig::default());
        assert!(diagnostics.is_empty());
        assert_eq!(store.len(), 4);

        let class = store.lookup("m.C").unwrap();
        let class_id = store.id_of("m.C").unwrap();
        assert_eq!(class.parent, store.id_of("m"));
        assert_eq!(store.methods(class_id).len(), 2);
        assert_eq!(store.class_args(class_id, true), "x: int");
        assert!(store.lookup("m.D").is_err());
    }

    #[test]
    fn test_class_content_policies() {
        let build = |content: ClassContent, init_doc: &str| {
            let module = entity(EntityKind::Module, "m").with_children(vec![class_with_init(init_doc)]);
            let config = DisplayConfig::default().with_class_content(content);
            let (store, _) = ObjectStore::build(vec![module], &config);
            store.lookup("m.C").unwrap().docstring.clone()
        };

        assert_eq!(build(ClassContent::Class, "Init doc."), "Class doc.");
        assert_eq!(build(ClassContent::Init, "Init doc."), "Init doc.");
        assert_eq!(build(ClassContent::Both, "Init doc."), "Class doc.\nInit doc.");
        // __new__ stands in for an undocumented __init__
        assert_eq!(build(ClassContent::Init, ""), "New doc.");
    }

    #[test]
    fn test_member_ordering() {
        let module = entity(EntityKind::Module, "m").with_children(vec![
            entity(EntityKind::Data, "m.zeta"),
            entity(EntityKind::Function, "m.beta"),
            entity(EntityKind::Class, "m.Alpha"),
            entity(EntityKind::Exception, "m.Omega"),
        ]);

        let names = |order: MemberOrder| {
            let config = DisplayConfig::default().with_member_order(order);
            let (store, _) = ObjectStore::build(vec![module.clone()], &config);
            let id = store.id_of("m").unwrap();
            store.children(id).map(|c| c.name().to_string()).collect::<Vec<_>>()
        };

        assert_eq!(names(MemberOrder::Bysource), vec!["zeta", "beta", "Alpha", "Omega"]);
        assert_eq!(names(MemberOrder::Alphabetical), vec!["Alpha", "Omega", "beta", "zeta"]);
        assert_eq!(names(MemberOrder::Groupwise), vec!["Omega", "Alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_module_hierarchy() {
        let modules = vec![
            entity(EntityKind::Package, "p"),
            entity(EntityKind::Module, "p.z"),
            entity(EntityKind::Package, "p.sub"),
            entity(EntityKind::Module, "p.a"),
            entity(EntityKind::Module, "p.sub.leaf"),
        ];
        let (store, _) = ObjectStore::build(modules, &DisplayConfig::default());

        let p = store.lookup("p").unwrap();
        let submodules: Vec<_> = p.submodules.iter().map(|&id| store.get(id).unwrap().id()).collect();
        assert_eq!(submodules, vec!["p.a", "p.z"]);
        assert_eq!(p.subpackages.len(), 1);
        assert_eq!(store.lookup("p.sub").unwrap().submodules.len(), 1);
        assert!(p.is_top_level_object());
    }

    #[test]
    fn test_typehints_recorded() {
        let mut func = entity(EntityKind::Function, "m.f");
        func.args = vec![ArgInfo::named("a").with_annotation("int"), ArgInfo::named("b")];
        func.return_annotation = Some("str".into());
        let mut overloaded = entity(EntityKind::Function, "m.g");
        overloaded.overloads = vec![Overload::default()];
        let module = entity(EntityKind::Module, "m").with_children(vec![
            func,
            overloaded,
            class_with_init(""),
        ]);
        let (store, _) = ObjectStore::build(vec![module], &DisplayConfig::default());

        let hints = store.annotations("m.f").unwrap();
        assert_eq!(hints.get("a").map(String::as_str), Some("int"));
        assert_eq!(hints.get("return").map(String::as_str), Some("str"));
        assert!(!hints.contains_key("b"));
        assert!(store.annotations("m.g").is_none());
        let class_hints = store.annotations("m.C").unwrap();
        assert_eq!(class_hints.len(), 1);
    }

    #[test]
    fn test_placeholder_reports_unknown_type() {
        let module = entity(EntityKind::Module, "m")
            .with_children(vec![Entity::placeholder("X", "X", "m.X", "n.X")]);
        let (store, diagnostics) = ObjectStore::build(vec![module], &DisplayConfig::default());
        assert_eq!(store.len(), 1);
        assert_eq!(
            diagnostics.of_category(WarningCategory::UnknownType).len(),
            1
        );
    }

    #[test]
    fn test_member_classification() {
        let module = entity(EntityKind::Module, "m").with_children(vec![
            entity(EntityKind::Function, "m._private"),
            entity(EntityKind::Function, "m.__special__"),
            entity(EntityKind::Function, "m.public").with_doc("\n  Summary line.\n\nMore."),
        ]);
        let (store, _) = ObjectStore::build(vec![module], &DisplayConfig::default());

        assert!(store.lookup("m._private").unwrap().is_private_member());
        let special = store.lookup("m.__special__").unwrap();
        assert!(special.is_special_member());
        assert!(!special.is_private_member());
        let public = store.lookup("m.public").unwrap();
        assert_eq!(public.summary(), "Summary line.");
        assert!(!public.is_undoc_member());
    }
}
