//! Entity extraction from one parsed module
//!
//! [`ModuleParser`] walks a module tree and produces the module [`Entity`]
//! with its nested children. Imports from inside the documented top-level
//! package become placeholders; every other import is ignored. Classes are
//! merged with the members of their ancestors, which are parsed in isolation
//! from wherever the [`ModuleCache`] finds them.

use crate::ancestors::{Ancestor, Ancestry, ClassRef};
use crate::annotations::AnnotationFormatter;
use crate::args::get_signature;
use crate::literal::{const_value, eval_node, PyConst};
use crate::module_cache::{ModuleCache, SourceModule};
use crate::scope::import_name_and_alias;
use crate::stdlib::is_builtin_exception;
use crate::visitor::{
    decorators, extract_docstring, field_children, following_docstring, is_async, line_range,
    named_children, node_text, statements, string_statement_value, trailing_comment, type_comment,
    VisitorContext,
};
use docgraph::{
    merge_inherited, ChildCollector, Entity, EntityKind, FunctionProperty, Redefinition,
};
use std::sync::Arc;
use tracing::trace;
use tree_sitter::Node;

/// Nesting limit for classes parsed while merging ancestors
const MAX_ANCESTOR_PARSE_DEPTH: usize = 8;

/// Methods that receive the class as first argument without a decorator
const IMPLICIT_CLASSMETHODS: &[&str] = &["__new__", "__init_subclass__", "__class_getitem__"];

const ABSTRACT_DECORATORS: &[&str] = &[
    "abc.abstractmethod",
    "abc.abstractproperty",
    "abc.abstractclassmethod",
    "abc.abstractstaticmethod",
];

const PROPERTY_DECORATORS: &[&str] = &["property", "functools.cached_property", "abc.abstractproperty"];

const OVERLOAD_DECORATORS: &[&str] = &["typing.overload", "typing_extensions.overload"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    Function,
    Method,
    Classmethod,
    Staticmethod,
}

/// Builds the entity tree of one module
pub struct ModuleParser<'a> {
    module: &'a Arc<SourceModule>,
    source: &'a [u8],
    cache: &'a ModuleCache,
    formatter: AnnotationFormatter<'a>,
    ctx: VisitorContext,
    ancestor_depth: usize,
}

impl<'a> ModuleParser<'a> {
    pub fn new(module: &'a Arc<SourceModule>, cache: &'a ModuleCache) -> Self {
        Self {
            module,
            source: module.source.as_bytes(),
            cache,
            formatter: AnnotationFormatter::new(&module.scopes),
            ctx: VisitorContext::for_module(&module.name),
            ancestor_depth: 0,
        }
    }

    /// Parse the whole module
    pub fn parse(mut self) -> Entity {
        let module: &'a SourceModule = self.module;
        let root = module.root();
        let kind = if module.is_package {
            EntityKind::Package
        } else {
            EntityKind::Module
        };
        let top_package = module.name.split('.').next().unwrap_or_default();

        let mut children = ChildCollector::new(Redefinition::Replace);
        for statement in statements(root) {
            if is_local_import_from(statement, self.source, top_package) {
                children.extend(self.parse_local_import_from(statement));
            } else {
                children.extend(self.parse_node(statement));
            }
        }

        let mut entity = Entity::new(kind, &module.name, &module.name, &module.name)
            .with_doc(extract_docstring(self.source, root).unwrap_or_default())
            .with_children(children.into_children());
        entity.file_path = Some(module.path.display().to_string());
        entity.encoding = Some(module.encoding.clone());
        entity.all = module_all(root, self.source);
        entity
    }

    fn parse_node(&mut self, node: Node) -> Vec<Entity> {
        match node.kind() {
            "class_definition" => self.parse_class(node, true).into_iter().collect(),
            "function_definition" => self.parse_function(node),
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(definition) => self.parse_node(definition),
                None => Vec::new(),
            },
            "expression_statement" => match statements(node).into_iter().next() {
                Some(assignment) if assignment.kind() == "assignment" => {
                    self.parse_assignment(node, assignment)
                }
                _ => self.parse_first_child(node),
            },
            "type_alias_statement" => self.parse_type_alias(node),
            "import_statement" | "import_from_statement" | "future_import_statement"
            | "comment" => Vec::new(),
            _ => self.parse_first_child(node),
        }
    }

    /// Entities of the first child that produces any
    fn parse_first_child(&mut self, node: Node) -> Vec<Entity> {
        for child in statements(node) {
            let entities = self.parse_node(child);
            if !entities.is_empty() {
                return entities;
            }
        }
        Vec::new()
    }

    fn parse_local_import_from(&mut self, statement: Node) -> Vec<Entity> {
        let Some(module) = self.module.scopes.import_from_module(statement, self.source) else {
            trace!(
                module = %self.module.name,
                line = statement.start_position().row + 1,
                "relative import climbs above the top-level package"
            );
            return Vec::new();
        };

        let is_wildcard = named_children(statement)
            .iter()
            .any(|child| child.kind() == "wildcard_import");
        let names: Vec<(&str, Option<&str>)> = if is_wildcard {
            vec![("*", None)]
        } else {
            field_children(statement, "name")
                .into_iter()
                .map(|imported| import_name_and_alias(imported, self.source))
                .collect()
        };

        names
            .into_iter()
            .map(|(name, alias)| {
                let local = alias.unwrap_or(name);
                let original_path = format!("{module}.{name}");
                let entity_name = if is_wildcard {
                    original_path.clone()
                } else {
                    local.to_string()
                };
                Entity::placeholder(
                    entity_name,
                    self.ctx.qual_name(local),
                    self.ctx.full_name(local),
                    original_path,
                )
            })
            .collect()
    }

    /// Parse a class; with `with_ancestors` its members are merged with
    /// those of every ancestor in method resolution order
    fn parse_class(&mut self, node: Node, with_ancestors: bool) -> Option<Entity> {
        let name = node_text(node.child_by_field_name("name")?, self.source).to_string();
        let qual_name = self.ctx.qual_name(&name);
        let full_name = self.ctx.full_name(&name);
        let class = ClassRef::new(self.module.clone(), qual_name.clone());

        let bases: Vec<String> = Ancestry::base_nodes(node)
            .into_iter()
            .filter_map(|base| self.formatter.format(Some(base), self.source))
            .collect();
        let body = node.child_by_field_name("body");
        let own_doc = body
            .and_then(|body| extract_docstring(self.source, body))
            .unwrap_or_default();

        self.ctx.enter_class(&name);
        let mut members = ChildCollector::new(Redefinition::Keep);
        if let Some(body) = body {
            for statement in statements(body) {
                members.extend(self.parse_node(statement));
            }
        }
        self.ctx.exit_class();

        let (from_line, to_line) = line_range(node);
        let mut entity = Entity::new(EntityKind::Class, &name, qual_name, full_name)
            .with_lines(from_line, to_line)
            .with_children(members.into_children());
        entity.bases = bases;
        entity.children = merge_inherited(&entity, &[]);

        let ancestry = Ancestry::new(self.cache);
        let mro = ancestry.mro(&class);

        if with_ancestors && self.ancestor_depth < MAX_ANCESTOR_PARSE_DEPTH {
            let ancestors: Vec<Entity> = mro
                .iter()
                .filter_map(Ancestor::as_class)
                .filter_map(|ancestor| self.parse_ancestor(ancestor))
                .collect();
            if !ancestors.is_empty() {
                entity.children = merge_inherited(&entity, &ancestors);
            }
        }

        if mro
            .iter()
            .any(|ancestor| matches!(ancestor, Ancestor::Named(name) if is_builtin_exception(name)))
        {
            entity.kind = EntityKind::Exception;
        }

        entity.doc = if own_doc.is_empty() {
            mro.iter()
                .filter_map(Ancestor::as_class)
                .find_map(ancestor_doc)
                .unwrap_or_default()
        } else {
            own_doc
        };

        entity.is_abstract = declares_abc(&class)
            || mro.iter().any(|ancestor| match ancestor {
                Ancestor::Class(class) => declares_abc(class),
                Ancestor::Named(name) => name == "abc.ABC",
            })
            || entity.children.iter().any(|child| {
                child.kind.is_callable() && child.has_property(FunctionProperty::Abstractmethod)
            });

        Some(entity)
    }

    /// Parse an ancestor class on its own, under its own names
    fn parse_ancestor(&self, ancestor: &ClassRef) -> Option<Entity> {
        let node = ancestor.node()?;
        let mut parser = ModuleParser::new(&ancestor.module, self.cache);
        parser.ancestor_depth = self.ancestor_depth + 1;
        if let Some((enclosing, _)) = ancestor.qual_name.rsplit_once('.') {
            for class_name in enclosing.split('.') {
                parser.ctx.enter_class(class_name);
            }
        }
        parser.parse_class(node, false)
    }

    fn parse_function(&mut self, node: Node) -> Vec<Entity> {
        let Some(name_node) = node.child_by_field_name("name") else {
            return Vec::new();
        };
        if is_property_setter(node, self.source) {
            return Vec::new();
        }
        let name = node_text(name_node, self.source).to_string();
        let decorator_names = self.decorator_names(node);
        let has_decorator = |candidates: &[&str]| {
            decorator_names
                .iter()
                .any(|decorator| candidates.contains(&decorator.as_str()))
        };

        let in_class = !self.ctx.is_top_level();
        let function_type = function_type(&name, &decorator_names, in_class);
        let is_abstract = has_decorator(ABSTRACT_DECORATORS) || raises_not_implemented(node, self.source);

        let mut properties = Vec::new();
        let kind = if function_type == FunctionType::Function {
            if is_async(node) {
                properties.push(FunctionProperty::Async);
            }
            EntityKind::Function
        } else if has_decorator(PROPERTY_DECORATORS) {
            if function_type == FunctionType::Classmethod {
                properties.push(FunctionProperty::Classmethod);
            }
            if is_abstract {
                properties.push(FunctionProperty::Abstractmethod);
            }
            EntityKind::Property
        } else {
            match function_type {
                FunctionType::Staticmethod => properties.push(FunctionProperty::Staticmethod),
                FunctionType::Classmethod if name != "__new__" => {
                    properties.push(FunctionProperty::Classmethod)
                }
                _ => {}
            }
            if is_abstract {
                properties.push(FunctionProperty::Abstractmethod);
            }
            if is_async(node) {
                properties.push(FunctionProperty::Async);
            }
            EntityKind::Method
        };

        let drop_first = matches!(function_type, FunctionType::Method | FunctionType::Classmethod);
        let scope = self.module.scopes.scope_at(node);
        let signature = get_signature(node, self.source, &self.formatter, scope, drop_first);

        let (from_line, to_line) = line_range(node);
        let doc = node
            .child_by_field_name("body")
            .and_then(|body| extract_docstring(self.source, body))
            .unwrap_or_default();
        let mut entity = Entity::new(kind, &name, self.ctx.qual_name(&name), self.ctx.full_name(&name))
            .with_doc(doc)
            .with_lines(from_line, to_line);
        entity.args = signature.args;
        entity.return_annotation = signature.return_annotation;
        entity.properties = properties;
        entity.is_overload = has_decorator(OVERLOAD_DECORATORS);

        let mut result = vec![entity];
        if in_class && name == "__init__" {
            result.extend(self.parse_constructor_attributes(node));
        }
        result
    }

    /// `self.<name> = ...` assignments directly in a constructor body
    fn parse_constructor_attributes(&mut self, constructor: Node) -> Vec<Entity> {
        let Some(body) = constructor.child_by_field_name("body") else {
            return Vec::new();
        };
        let mut attributes = Vec::new();
        for statement in statements(body) {
            if statement.kind() != "expression_statement" {
                continue;
            }
            let Some(assignment) = statements(statement).into_iter().next() else {
                continue;
            };
            if assignment.kind() != "assignment" {
                continue;
            }
            if !assignment_targets(assignment)
                .into_iter()
                .all(|target| is_self_attribute(target, self.source))
            {
                continue;
            }
            attributes.extend(self.assignment_entity(statement, assignment, EntityKind::Attribute));
        }
        attributes
    }

    fn parse_assignment(&mut self, statement: Node, assignment: Node) -> Vec<Entity> {
        // Attribute targets outside a constructor document another object
        if assignment_targets(assignment)
            .into_iter()
            .any(|target| target.kind() == "attribute")
        {
            return Vec::new();
        }
        let kind = if self.ctx.is_top_level() {
            EntityKind::Data
        } else {
            EntityKind::Attribute
        };
        self.assignment_entity(statement, assignment, kind)
            .into_iter()
            .collect()
    }

    /// Record for a single-target assignment; chained and unpacking
    /// assignments document nothing
    fn assignment_entity(&self, statement: Node, assignment: Node, kind: EntityKind) -> Option<Entity> {
        let targets = assignment_targets(assignment);
        let [target] = targets.as_slice() else {
            return None;
        };
        let name = match target.kind() {
            "identifier" => node_text(*target, self.source),
            "attribute" => node_text(target.child_by_field_name("attribute")?, self.source),
            _ => return None,
        };

        let right = assignment.child_by_field_name("right");
        let mut value = right.and_then(|right| const_value(right, self.source));
        let annotation = self
            .formatter
            .format(assignment.child_by_field_name("type"), self.source)
            .or_else(|| {
                let comment = trailing_comment(statement)?;
                let text = type_comment(node_text(comment, self.source))?;
                self.formatter
                    .format_text(text, self.module.scopes.scope_at(statement))
            });
        if annotation.as_deref() == Some("TypeAlias") {
            value = right.map(|right| node_text(right, self.source).trim().to_string());
        }

        let (from_line, to_line) = line_range(statement);
        let mut entity = Entity::new(kind, name, self.ctx.qual_name(name), self.ctx.full_name(name))
            .with_doc(following_docstring(self.source, statement).unwrap_or_default())
            .with_lines(from_line, to_line);
        entity.value = value;
        entity.annotation = annotation;
        Some(entity)
    }

    fn parse_type_alias(&mut self, statement: Node) -> Vec<Entity> {
        let Some(left) = statement.child_by_field_name("left") else {
            return Vec::new();
        };
        let left_text = node_text(left, self.source);
        let name = left_text
            .split('[')
            .next()
            .unwrap_or(left_text)
            .trim()
            .to_string();
        if name.is_empty() {
            return Vec::new();
        }

        let (from_line, to_line) = line_range(statement);
        let mut entity = Entity::new(
            EntityKind::Data,
            &name,
            self.ctx.qual_name(&name),
            self.ctx.full_name(&name),
        )
        .with_doc(following_docstring(self.source, statement).unwrap_or_default())
        .with_lines(from_line, to_line);
        entity.value = statement
            .child_by_field_name("right")
            .map(|right| node_text(right, self.source).trim().to_string());
        entity.annotation = Some("TypeAlias".to_string());
        vec![entity]
    }

    /// Qualified names of the decorators of a definition, call arguments
    /// dropped
    fn decorator_names(&self, definition: Node) -> Vec<String> {
        decorators(definition)
            .into_iter()
            .filter_map(|expression| {
                let target = if expression.kind() == "call" {
                    expression.child_by_field_name("function")?
                } else {
                    expression
                };
                if !matches!(target.kind(), "identifier" | "attribute") {
                    return None;
                }
                let scope = self.module.scopes.scope_at(target);
                Some(
                    self.module
                        .scopes
                        .resolve_qualname(scope, node_text(target, self.source), false),
                )
            })
            .collect()
    }
}

fn function_type(name: &str, decorator_names: &[String], in_class: bool) -> FunctionType {
    if !in_class {
        return FunctionType::Function;
    }
    for decorator in decorator_names {
        match decorator.as_str() {
            "classmethod" => return FunctionType::Classmethod,
            "staticmethod" => return FunctionType::Staticmethod,
            _ => {}
        }
    }
    if IMPLICIT_CLASSMETHODS.contains(&name) {
        FunctionType::Classmethod
    } else {
        FunctionType::Method
    }
}

fn is_property_setter(definition: Node, source: &[u8]) -> bool {
    decorators(definition).into_iter().any(|decorator| {
        decorator.kind() == "attribute"
            && decorator
                .child_by_field_name("attribute")
                .is_some_and(|attribute| node_text(attribute, source) == "setter")
    })
}

/// Whether the first statement after the docstring raises
/// `NotImplementedError`
fn raises_not_implemented(definition: Node, source: &[u8]) -> bool {
    let Some(body) = definition.child_by_field_name("body") else {
        return false;
    };
    let mut body_statements = statements(body).into_iter().peekable();
    if body_statements
        .peek()
        .is_some_and(|first| string_statement_value(*first, source).is_some())
    {
        body_statements.next();
    }
    let Some(first) = body_statements.next() else {
        return false;
    };
    if first.kind() != "raise_statement" {
        return false;
    }
    let Some(raised) = statements(first).into_iter().next() else {
        return false;
    };
    let raised = match raised.kind() {
        "call" => match raised.child_by_field_name("function") {
            Some(function) => function,
            None => return false,
        },
        _ => raised,
    };
    node_text(raised, source) == "NotImplementedError"
}

/// Declares an ABC metaclass or derives from `abc.ABC` directly
fn declares_abc(class: &ClassRef) -> bool {
    Ancestry::metaclass(class).is_some_and(|metaclass| metaclass == "abc.ABCMeta")
        || Ancestry::base_names(class).iter().any(|base| base == "abc.ABC")
}

/// Prepared docstring of an ancestor class, if it has one
fn ancestor_doc(ancestor: &ClassRef) -> Option<String> {
    let body = ancestor.node()?.child_by_field_name("body")?;
    extract_docstring(ancestor.module.bytes(), body).filter(|doc| !doc.is_empty())
}

/// Targets of an assignment, one per `=` in a chain
fn assignment_targets(assignment: Node) -> Vec<Node> {
    let mut targets = Vec::new();
    let mut current = Some(assignment);
    while let Some(node) = current.filter(|node| node.kind() == "assignment") {
        if let Some(left) = node.child_by_field_name("left") {
            targets.push(left);
        }
        current = node.child_by_field_name("right");
    }
    targets
}

fn is_self_attribute(target: Node, source: &[u8]) -> bool {
    target.kind() == "attribute"
        && target
            .child_by_field_name("object")
            .is_some_and(|object| object.kind() == "identifier" && node_text(object, source) == "self")
}

/// Whether an import-from statement imports from the documented package:
/// relative imports, the top-level package itself, or one of its submodules
fn is_local_import_from(statement: Node, source: &[u8], top_package: &str) -> bool {
    if statement.kind() != "import_from_statement" {
        return false;
    }
    let Some(module_node) = statement.child_by_field_name("module_name") else {
        return false;
    };
    if module_node.kind() == "relative_import" {
        return true;
    }
    let module = node_text(module_node, source);
    module == top_package || module.starts_with(&format!("{top_package}."))
}

/// Contents of the module's `__all__` list, string entries only
pub fn module_all(root: Node, source: &[u8]) -> Option<Vec<String>> {
    let mut all: Option<Vec<String>> = None;
    for statement in statements(root) {
        if statement.kind() != "expression_statement" {
            continue;
        }
        let Some(expression) = statements(statement).into_iter().next() else {
            continue;
        };
        let is_all = expression
            .child_by_field_name("left")
            .is_some_and(|left| left.kind() == "identifier" && node_text(left, source) == "__all__");
        if !is_all {
            continue;
        }
        let names = expression
            .child_by_field_name("right")
            .and_then(|right| string_elements(right, source));
        match expression.kind() {
            "assignment" => all = names,
            "augmented_assignment" => {
                if let (Some(all), Some(names)) = (all.as_mut(), names) {
                    all.extend(names);
                }
            }
            _ => {}
        }
    }
    all
}

fn string_elements(sequence: Node, source: &[u8]) -> Option<Vec<String>> {
    if !matches!(sequence.kind(), "list" | "tuple") {
        return None;
    }
    Some(
        statements(sequence)
            .into_iter()
            .filter_map(|element| match eval_node(element, source) {
                Some(PyConst::Str(value)) => Some(value),
                _ => None,
            })
            .collect(),
    )
}
