//! Entity records produced by language parsers.
//!
//! An [`Entity`] is a flat, serializable description of one documentable
//! declaration (module, class, function, attribute, ...). Records nest through
//! their `children` field, so a parsed module is a tree of entities whose
//! `full_name` fields are dotted paths rooted at the module name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a documentable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Source file that is not a package initializer
    Module,
    /// Package initializer (`__init__` file)
    Package,
    /// Class definition
    Class,
    /// Class deriving from a builtin exception
    Exception,
    /// Module-level function
    Function,
    /// Function defined in a class body
    Method,
    /// Property-decorated method
    Property,
    /// Class-level or instance attribute
    Attribute,
    /// Module-level variable
    Data,
    /// Unresolved re-export; replaced or dropped before display
    Placeholder,
}

impl EntityKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Module,
        EntityKind::Package,
        EntityKind::Class,
        EntityKind::Exception,
        EntityKind::Function,
        EntityKind::Method,
        EntityKind::Property,
        EntityKind::Attribute,
        EntityKind::Data,
        EntityKind::Placeholder,
    ];

    /// Lowercase name used in serialized records.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Module => "module",
            EntityKind::Package => "package",
            EntityKind::Class => "class",
            EntityKind::Exception => "exception",
            EntityKind::Function => "function",
            EntityKind::Method => "method",
            EntityKind::Property => "property",
            EntityKind::Attribute => "attribute",
            EntityKind::Data => "data",
            EntityKind::Placeholder => "placeholder",
        }
    }

    /// Modules and packages.
    pub fn is_module_like(&self) -> bool {
        matches!(self, EntityKind::Module | EntityKind::Package)
    }

    /// Classes and exceptions.
    pub fn is_class_like(&self) -> bool {
        matches!(self, EntityKind::Class | EntityKind::Exception)
    }

    /// Kinds that can be grouped by overload declarations.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            EntityKind::Function | EntityKind::Method | EntityKind::Property
        )
    }

    /// Sort key used by the `groupwise` member order.
    pub fn member_order(&self) -> u32 {
        match self {
            EntityKind::Exception => 10,
            EntityKind::Class => 20,
            EntityKind::Function => 30,
            EntityKind::Data => 40,
            EntityKind::Method => 50,
            EntityKind::Property | EntityKind::Attribute => 60,
            EntityKind::Module | EntityKind::Package | EntityKind::Placeholder => 0,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind '{s}'"))
    }
}

/// Marker preceding an argument in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgPrefix {
    /// End of positional-only arguments
    #[serde(rename = "/")]
    Slash,
    /// Variadic positional argument, or the keyword-only marker when unnamed
    #[serde(rename = "*")]
    Star,
    /// Variadic keyword argument
    #[serde(rename = "**")]
    DoubleStar,
}

impl ArgPrefix {
    /// Source spelling of the marker.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgPrefix::Slash => "/",
            ArgPrefix::Star => "*",
            ArgPrefix::DoubleStar => "**",
        }
    }
}

/// One slot of a function signature.
///
/// Sentinels (`/` and a bare `*`) carry a prefix and no name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArgInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<ArgPrefix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ArgInfo {
    /// Plain named argument.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Prefix-only marker such as `/` or a bare `*`.
    pub fn sentinel(prefix: ArgPrefix) -> Self {
        Self {
            prefix: Some(prefix),
            ..Default::default()
        }
    }

    /// Named argument with a marker (`*args`, `**kwargs`).
    pub fn variadic(prefix: ArgPrefix, name: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// True for `/` and bare `*` markers.
    pub fn is_sentinel(&self) -> bool {
        self.prefix.is_some() && self.name.is_none()
    }
}

/// Signature of one overload declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Overload {
    pub args: Vec<ArgInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
}

/// Modifier flags on functions, methods and properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionProperty {
    Async,
    Classmethod,
    Staticmethod,
    Abstractmethod,
}

impl FunctionProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionProperty::Async => "async",
            FunctionProperty::Classmethod => "classmethod",
            FunctionProperty::Staticmethod => "staticmethod",
            FunctionProperty::Abstractmethod => "abstractmethod",
        }
    }
}

/// Class a member was inherited from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritedFrom {
    pub name: String,
    pub full_name: String,
    pub is_abstract: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A documentable declaration and its nested members.
///
/// Only the fields relevant to `kind` are populated; everything else keeps its
/// default and is omitted from serialized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Unqualified name (a dotted module path for modules)
    pub name: String,
    /// Dotted path inside the defining module
    pub qual_name: String,
    /// Dotted path from the module root, or the dotted module name for modules
    pub full_name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Entity>,
    /// Dotted path of the declaration this record was imported from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inherited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<InheritedFrom>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hide: bool,

    // Functions, methods and properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<FunctionProperty>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_overload: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overloads: Vec<Overload>,

    // Classes and exceptions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_abstract: bool,

    // Data and attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,

    // Modules and packages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl Entity {
    /// Create an empty record of the given kind.
    pub fn new(
        kind: EntityKind,
        name: impl Into<String>,
        qual_name: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            qual_name: qual_name.into(),
            full_name: full_name.into(),
            doc: String::new(),
            from_line: None,
            to_line: None,
            children: Vec::new(),
            original_path: None,
            inherited: false,
            inherited_from: None,
            hide: false,
            args: Vec::new(),
            return_annotation: None,
            properties: Vec::new(),
            is_overload: false,
            overloads: Vec::new(),
            bases: Vec::new(),
            is_abstract: false,
            value: None,
            annotation: None,
            all: None,
            file_path: None,
            encoding: None,
        }
    }

    /// Unresolved re-export of `original_path`.
    pub fn placeholder(
        name: impl Into<String>,
        qual_name: impl Into<String>,
        full_name: impl Into<String>,
        original_path: impl Into<String>,
    ) -> Self {
        let mut entity = Self::new(EntityKind::Placeholder, name, qual_name, full_name);
        entity.original_path = Some(original_path.into());
        entity
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_lines(mut self, from_line: usize, to_line: usize) -> Self {
        self.from_line = Some(from_line);
        self.to_line = Some(to_line);
        self
    }

    pub fn with_children(mut self, children: Vec<Entity>) -> Self {
        self.children = children;
        self
    }

    /// Records whose origin is another module.
    pub fn is_imported(&self) -> bool {
        self.original_path.is_some()
    }

    pub fn has_property(&self, property: FunctionProperty) -> bool {
        self.properties.contains(&property)
    }

    /// Last component of the dotted `full_name`.
    pub fn short_name(&self) -> &str {
        self.full_name
            .rsplit_once('.')
            .map_or(self.full_name.as_str(), |(_, last)| last)
    }

    /// Direct child with the given unqualified name.
    pub fn child(&self, name: &str) -> Option<&Entity> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// Pre-order traversal over this record and every descendant.
    pub fn walk(&self) -> Vec<&Entity> {
        let mut out = vec![self];
        let mut index = 0;
        while index < out.len() {
            let current = out[index];
            out.extend(current.children.iter());
            index += 1;
        }
        out
    }

    /// Drop source line numbers from this record and all descendants.
    pub fn strip_lines(&mut self) {
        self.from_line = None;
        self.to_line = None;
        for child in &mut self.children {
            child.strip_lines();
        }
    }

    /// Rewrite the `full_name` of every descendant that starts with `from`
    /// so that it starts with `to` instead.
    pub fn relocate_descendants(&mut self, from: &str, to: &str) {
        for child in &mut self.children {
            if let Some(rest) = child.full_name.strip_prefix(from) {
                if rest.is_empty() || rest.starts_with('.') {
                    child.full_name = format!("{to}{rest}");
                }
            }
            child.relocate_descendants(from, to);
        }
    }

    /// Same as [`Entity::relocate_descendants`] for `qual_name`.
    pub fn relocate_descendant_qual_names(&mut self, from: &str, to: &str) {
        for child in &mut self.children {
            if let Some(rest) = child.qual_name.strip_prefix(from) {
                if rest.is_empty() || rest.starts_with('.') {
                    child.qual_name = format!("{to}{rest}");
                }
            }
            child.relocate_descendant_qual_names(from, to);
        }
    }
}
