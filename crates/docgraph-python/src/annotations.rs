//! Annotation formatting
//!
//! Renders annotation expressions, base-class lists and `# type:` comments
//! into display strings. Names are resolved through the module's
//! [`ScopeIndex`]; a leading `typing.` or current-module prefix is dropped.

use crate::literal::eval_node;
use crate::module_cache::parse_tree;
use crate::scope::{ScopeId, ScopeIndex};
use crate::visitor::{field_children, node_text, statements};
use std::path::Path;
use tree_sitter::Node;

/// Signature described by a function-level `# type: (A, B) -> R` comment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionTypeComment {
    /// One entry per listed argument; `None` for `...` placeholders
    pub args: Vec<Option<String>>,
    pub returns: Option<String>,
}

/// Formats annotation nodes of one module
#[derive(Debug, Clone, Copy)]
pub struct AnnotationFormatter<'a> {
    scopes: &'a ScopeIndex,
}

impl<'a> AnnotationFormatter<'a> {
    pub fn new(scopes: &'a ScopeIndex) -> Self {
        Self { scopes }
    }

    /// Render an annotation node found in the module tree
    pub fn format(&self, node: Option<Node>, source: &[u8]) -> Option<String> {
        let node = node?;
        let scope = self.scopes.scope_at(node);
        Some(self.resolve(node, source, scope))
    }

    /// Render an annotation node, resolving names in `scope`
    pub fn format_in_scope(&self, node: Node, source: &[u8], scope: ScopeId) -> String {
        self.resolve(node, source, scope)
    }

    /// Render annotation source text, such as the body of a type comment
    pub fn format_text(&self, text: &str, scope: ScopeId) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let tree = parse_tree(text, Path::new("<type comment>")).ok()?;
        let root = tree.root_node();
        if root.has_error() {
            return Some(text.to_string());
        }
        let statement = statements(root).into_iter().next()?;
        let expression = statements(statement).into_iter().next()?;
        Some(self.resolve(expression, text.as_bytes(), scope))
    }

    /// Parse a function-level type comment such as `(int, *str) -> bool`
    pub fn function_type_comment(&self, text: &str, scope: ScopeId) -> Option<FunctionTypeComment> {
        let (params, returns) = split_arrow(text)?;
        let params = params.trim();
        let inner = params.strip_prefix('(')?.strip_suffix(')')?;

        let args = split_top_level(inner)
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let item = item.trim_start_matches('*').trim();
                if item == "..." {
                    None
                } else {
                    self.format_text(item, scope)
                }
            })
            .collect();

        let returns = self.format_text(returns, scope);
        Some(FunctionTypeComment { args, returns })
    }

    fn resolve(&self, node: Node, source: &[u8], scope: ScopeId) -> String {
        let resolved = match node.kind() {
            "type" | "parenthesized_expression" => {
                return match statements(node).into_iter().next() {
                    Some(inner) => self.resolve(inner, source, scope),
                    None => compact(node_text(node, source)),
                };
            }
            "ellipsis" => "...".to_string(),
            "string" | "concatenated_string" | "integer" | "float" | "true" | "false"
            | "none" => {
                let text = eval_node(node, source)
                    .map(|value| value.to_display_string())
                    .unwrap_or_else(|| compact(node_text(node, source)));
                self.scopes.resolve_qualname(scope, &text, false)
            }
            "identifier" | "attribute" => {
                self.scopes
                    .resolve_qualname(scope, &compact(node_text(node, source)), false)
            }
            "subscript" => {
                let value = node
                    .child_by_field_name("value")
                    .map(|value| self.resolve(value, source, scope))
                    .unwrap_or_default();
                let mut elements = field_children(node, "subscript");
                if let [single] = elements.as_slice() {
                    if single.kind() == "tuple" {
                        elements = statements(*single);
                    }
                }
                let parameters = self.resolve_parameters(&value, elements, source, scope);
                format!("{value}[{parameters}]")
            }
            "generic_type" => {
                let parts = statements(node);
                let value = parts
                    .iter()
                    .find(|part| part.kind() != "type_parameter")
                    .map(|value| self.resolve(*value, source, scope))
                    .unwrap_or_default();
                let parameters = parts
                    .iter()
                    .find(|part| part.kind() == "type_parameter")
                    .map(|parameter| {
                        self.resolve_parameters(&value, statements(*parameter), source, scope)
                    })
                    .unwrap_or_default();
                format!("{value}[{parameters}]")
            }
            "union_type" => statements(node)
                .into_iter()
                .map(|member| self.resolve(member, source, scope))
                .collect::<Vec<_>>()
                .join(" | "),
            "member_type" => {
                self.scopes
                    .resolve_qualname(scope, &compact(node_text(node, source)), false)
            }
            "tuple" => format!("({})", self.resolve_all(statements(node), source, scope)),
            "list" => format!("[{}]", self.resolve_all(statements(node), source, scope)),
            "binary_operator"
                if node
                    .child_by_field_name("operator")
                    .is_some_and(|op| node_text(op, source) == "|") =>
            {
                let side = |field: &str| {
                    node.child_by_field_name(field)
                        .map(|side| self.resolve(side, source, scope))
                        .unwrap_or_default()
                };
                format!("{} | {}", side("left"), side("right"))
            }
            "call" => self
                .scopes
                .resolve_qualname(scope, &compact(node_text(node, source)), true),
            _ => compact(node_text(node, source)),
        };
        self.strip_prefixes(resolved)
    }

    /// Render the elements of `value[...]`; `Literal` keeps element reprs
    fn resolve_parameters(
        &self,
        value: &str,
        elements: Vec<Node>,
        source: &[u8],
        scope: ScopeId,
    ) -> String {
        elements
            .into_iter()
            .filter(|element| element.kind() != "comment")
            .map(|element| {
                let literal = (value == "Literal")
                    .then(|| eval_node(unwrap_type(element), source))
                    .flatten();
                match literal {
                    Some(constant) => constant.repr(),
                    None => self.resolve(element, source, scope),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn resolve_all(&self, nodes: Vec<Node>, source: &[u8], scope: ScopeId) -> String {
        nodes
            .into_iter()
            .map(|node| self.resolve(node, source, scope))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn strip_prefixes(&self, resolved: String) -> String {
        if let Some(stripped) = resolved.strip_prefix("typing.") {
            return stripped.to_string();
        }
        let module_prefix = format!("{}.", self.scopes.module_name());
        match resolved.strip_prefix(&module_prefix) {
            Some(stripped) => stripped.to_string(),
            None => resolved,
        }
    }
}

/// The expression inside a `type` wrapper node
fn unwrap_type(node: Node) -> Node {
    if node.kind() == "type" {
        if let Some(inner) = statements(node).into_iter().next() {
            return unwrap_type(inner);
        }
    }
    node
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `params -> returns` at the top-level arrow
fn split_arrow(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let bytes = text.as_bytes();
    for (i, &byte) in bytes.iter().enumerate() {
        match byte {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'-' if depth == 0 && bytes.get(i + 1) == Some(&b'>') => {
                return Some((&text[..i], &text[i + 2..]));
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested in brackets or quotes
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::MODULE_SCOPE;
    use tree_sitter::Tree;

    const SOURCE: &str = "\
import typing
from typing import List, Literal, Optional
from collections import abc
from .models import Model

class Local:
    pass

x: Optional[Local] = None
y: Literal['a', \"b\", 3] = 'a'
z: typing.Dict[str, List[int]] = {}
w: int | None = None
v: 'Local' = None
u: abc.Mapping[str, ...] = {}
t: Model = None
";

    fn setup() -> (Tree, ScopeIndex) {
        let tree = parse_tree(SOURCE, Path::new("m.py")).unwrap();
        let scopes = ScopeIndex::build(tree.root_node(), SOURCE.as_bytes(), "pkg.m", false);
        (tree, scopes)
    }

    fn annotation_of(tree: &Tree, scopes: &ScopeIndex, target: &str) -> Option<String> {
        let formatter = AnnotationFormatter::new(scopes);
        for statement in statements(tree.root_node()) {
            if statement.kind() != "expression_statement" {
                continue;
            }
            let assignment = statements(statement)[0];
            let left = assignment.child_by_field_name("left")?;
            if node_text(left, SOURCE.as_bytes()) == target {
                return formatter.format(assignment.child_by_field_name("type"), SOURCE.as_bytes());
            }
        }
        None
    }

    #[test]
    fn test_format_annotations() {
        let (tree, scopes) = setup();
        assert_eq!(annotation_of(&tree, &scopes, "x").as_deref(), Some("Optional[Local]"));
        assert_eq!(
            annotation_of(&tree, &scopes, "y").as_deref(),
            Some("Literal['a', 'b', 3]")
        );
        assert_eq!(
            annotation_of(&tree, &scopes, "z").as_deref(),
            Some("Dict[str, List[int]]")
        );
        assert_eq!(annotation_of(&tree, &scopes, "w").as_deref(), Some("int | None"));
        assert_eq!(annotation_of(&tree, &scopes, "v").as_deref(), Some("Local"));
        assert_eq!(
            annotation_of(&tree, &scopes, "u").as_deref(),
            Some("collections.abc.Mapping[str, ...]")
        );
        assert_eq!(annotation_of(&tree, &scopes, "t").as_deref(), Some("pkg.models.Model"));
    }

    #[test]
    fn test_format_text() {
        let (_tree, scopes) = setup();
        let formatter = AnnotationFormatter::new(&scopes);
        assert_eq!(
            formatter.format_text("List[Local]", MODULE_SCOPE).as_deref(),
            Some("List[Local]")
        );
        assert_eq!(formatter.format_text("  ", MODULE_SCOPE), None);
    }

    #[test]
    fn test_function_type_comment() {
        let (_tree, scopes) = setup();
        let formatter = AnnotationFormatter::new(&scopes);
        let parsed = formatter
            .function_type_comment("(int, Dict[str, int], *str, ...) -> Local", MODULE_SCOPE)
            .unwrap();
        assert_eq!(
            parsed.args,
            vec![
                Some("int".to_string()),
                Some("Dict[str, int]".to_string()),
                Some("str".to_string()),
                None
            ]
        );
        assert_eq!(parsed.returns.as_deref(), Some("Local"));

        let empty = formatter.function_type_comment("() -> None", MODULE_SCOPE).unwrap();
        assert!(empty.args.is_empty());
        assert!(formatter.function_type_comment("int", MODULE_SCOPE).is_none());
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, B[c, d], 'e,f'"), vec!["a", " B[c, d]", " 'e,f'"]);
    }
}
