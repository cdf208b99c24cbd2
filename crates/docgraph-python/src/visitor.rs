//! Tree-sitter helpers shared by the extraction passes
//!
//! Holds the name stacks used while walking a module and the small node
//! queries (text, children, docstrings, decorators, type comments) that the
//! parser and the annotation formatter build on.

use crate::docstring::prepare_docstring;
use crate::literal::{eval_node, PyConst};
use tree_sitter::Node;

/// Context for tracking names during AST traversal
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    /// Enclosing class names inside the module
    qual_name_stack: Vec<String>,

    /// Module name followed by the enclosing class names
    full_name_stack: Vec<String>,
}

impl VisitorContext {
    /// Create a context rooted at a module
    pub fn for_module(module_name: &str) -> Self {
        Self {
            qual_name_stack: Vec::new(),
            full_name_stack: vec![module_name.to_string()],
        }
    }

    /// Dotted path of `name` inside the module
    pub fn qual_name(&self, name: &str) -> String {
        join(&self.qual_name_stack, name)
    }

    /// Dotted path of `name` from the module root
    pub fn full_name(&self, name: &str) -> String {
        join(&self.full_name_stack, name)
    }

    /// Enter a class body
    pub fn enter_class(&mut self, class_name: &str) {
        self.qual_name_stack.push(class_name.to_string());
        self.full_name_stack.push(class_name.to_string());
    }

    /// Exit a class body
    pub fn exit_class(&mut self) {
        self.qual_name_stack.pop();
        if self.full_name_stack.len() > 1 {
            self.full_name_stack.pop();
        }
    }

    /// Check if we're at module level (not inside any class)
    pub fn is_top_level(&self) -> bool {
        self.qual_name_stack.is_empty()
    }
}

fn join(stack: &[String], name: &str) -> String {
    if stack.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", stack.join("."), name)
    }
}

/// Source text of a node
pub fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Named children, comments included
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Named children without comments
pub fn statements<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    named_children(node)
        .into_iter()
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// All children carrying the given field name
pub fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// One-based first and last line of a node
pub fn line_range(node: Node) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

/// Value of a string literal expression statement, if `node` is one
pub fn string_statement_value(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() != "expression_statement" {
        return None;
    }
    let children = statements(node);
    let [expression] = children.as_slice() else {
        return None;
    };
    match eval_node(*expression, source)? {
        PyConst::Str(value) => Some(value),
        _ => None,
    }
}

/// Extract the prepared docstring from a module or block node
pub fn extract_docstring(source: &[u8], body: Node) -> Option<String> {
    let first = statements(body).into_iter().next()?;
    string_statement_value(first, source).map(|raw| prepare_docstring(&raw))
}

/// Docstring of an assignment: the string statement right after it
pub fn following_docstring(source: &[u8], statement: Node) -> Option<String> {
    let mut sibling = statement.next_named_sibling();
    while let Some(node) = sibling {
        if node.kind() != "comment" {
            return string_statement_value(node, source).map(|raw| prepare_docstring(&raw));
        }
        sibling = node.next_named_sibling();
    }
    None
}

/// Decorator expressions applied to a class or function definition
pub fn decorators<'t>(definition: Node<'t>) -> Vec<Node<'t>> {
    let Some(parent) = definition.parent() else {
        return Vec::new();
    };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    named_children(parent)
        .into_iter()
        .filter(|child| child.kind() == "decorator")
        .filter_map(|decorator| statements(decorator).into_iter().next())
        .collect()
}

/// Whether a function definition is declared `async`
pub fn is_async(definition: Node) -> bool {
    let mut cursor = definition.walk();
    let is_async = definition
        .children(&mut cursor)
        .take_while(|child| child.kind() != "def")
        .any(|child| child.kind() == "async");
    is_async
}

/// Annotation text of a `# type: ...` comment, `None` for other comments
/// and for `# type: ignore`
pub fn type_comment(comment: &str) -> Option<&str> {
    let body = comment.trim_start_matches('#').trim_start();
    let annotation = body.strip_prefix("type:")?.trim();
    let ignored = annotation
        .strip_prefix("ignore")
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'));
    if annotation.is_empty() || ignored {
        None
    } else {
        Some(annotation)
    }
}

/// Comment starting on the row where `node` ends
pub fn trailing_comment<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let next = node.next_sibling()?;
    (next.kind() == "comment" && next.start_position().row == node.end_position().row)
        .then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::{Parser, Tree};

    fn parse(source: &str) -> Tree {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::language()).unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn test_visitor_context() {
        let mut ctx = VisitorContext::for_module("pkg.mod");
        assert!(ctx.is_top_level());
        assert_eq!(ctx.full_name("f"), "pkg.mod.f");

        ctx.enter_class("Outer");
        ctx.enter_class("Inner");
        assert!(!ctx.is_top_level());
        assert_eq!(ctx.qual_name("m"), "Outer.Inner.m");
        assert_eq!(ctx.full_name("m"), "pkg.mod.Outer.Inner.m");

        ctx.exit_class();
        ctx.exit_class();
        assert!(ctx.is_top_level());
        assert_eq!(ctx.qual_name("x"), "x");
    }

    #[test]
    fn test_extract_docstring() {
        let source = "\"\"\"Module doc.\n\n    More.\n\"\"\"\nx = 1\n";
        let tree = parse(source);
        assert_eq!(
            extract_docstring(source.as_bytes(), tree.root_node()).as_deref(),
            Some("Module doc.\n\nMore.")
        );

        let source = "x = 1\n\"\"\"Not a docstring.\"\"\"\n";
        let tree = parse(source);
        assert_eq!(extract_docstring(source.as_bytes(), tree.root_node()), None);
    }

    #[test]
    fn test_following_docstring() {
        let source = "X = 1\n\"\"\"About X.\"\"\"\nY = 2\n";
        let tree = parse(source);
        let first = tree.root_node().named_child(0).unwrap();
        let third = tree.root_node().named_child(2).unwrap();
        assert_eq!(
            following_docstring(source.as_bytes(), first).as_deref(),
            Some("About X.")
        );
        assert_eq!(following_docstring(source.as_bytes(), third), None);
    }

    #[test]
    fn test_decorators_and_async() {
        let source = "@property\n@functools.wraps(f)\nasync def g():\n    pass\n";
        let tree = parse(source);
        let decorated = tree.root_node().named_child(0).unwrap();
        let definition = decorated.child_by_field_name("definition").unwrap();
        let names: Vec<&str> = decorators(definition)
            .into_iter()
            .map(|d| node_text(d, source.as_bytes()))
            .collect();
        assert_eq!(names, vec!["property", "functools.wraps(f)"]);
        assert!(is_async(definition));
    }

    #[test]
    fn test_type_comment() {
        assert_eq!(type_comment("# type: int"), Some("int"));
        assert_eq!(type_comment("#type:List[str]"), Some("List[str]"));
        assert_eq!(type_comment("# type: ignore"), None);
        assert_eq!(type_comment("# type: ignore[attr]"), None);
        assert_eq!(type_comment("# type: ignored_type"), Some("ignored_type"));
        assert_eq!(type_comment("# a comment"), None);
    }
}
