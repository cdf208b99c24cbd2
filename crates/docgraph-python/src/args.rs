//! Function signature decomposition
//!
//! Turns a `function_definition` node into the ordered [`ArgInfo`] list used
//! by entity records. Each argument's annotation comes from, in priority
//! order: the inline annotation, a `# type:` comment trailing the argument,
//! and the function-level `# type: (...) -> ...` comment.

use crate::annotations::{AnnotationFormatter, FunctionTypeComment};
use crate::scope::ScopeId;
use crate::visitor::{named_children, node_text, statements, type_comment};
use docgraph::{ArgInfo, ArgPrefix};
use tree_sitter::Node;

/// Arguments and return annotation of one function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub args: Vec<ArgInfo>,
    pub return_annotation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    PositionalOnly,
    Positional,
    VarArgs,
    KeywordOnly,
    KwArgs,
}

#[derive(Debug)]
struct Param<'t> {
    slot: Slot,
    name: String,
    annotation: Option<Node<'t>>,
    default: Option<Node<'t>>,
    comment: Option<String>,
    end_row: usize,
}

/// Decompose the signature of a function definition.
///
/// `drop_first` removes the leading slot of methods and classmethods (`self`
/// or `cls`); the function-level type comment does not list that slot, so a
/// placeholder is aligned with it before merging. `scope` is the scope the
/// definition appears in; names in type comments are resolved there.
pub fn get_signature(
    definition: Node,
    source: &[u8],
    formatter: &AnnotationFormatter,
    scope: ScopeId,
    drop_first: bool,
) -> Signature {
    let function_comment = function_comment(definition, source)
        .and_then(|text| formatter.function_type_comment(text, scope))
        .unwrap_or_default();

    let args = match definition.child_by_field_name("parameters") {
        Some(parameters) => {
            let params = collect_params(parameters, source);
            emit_args(params, &function_comment, source, formatter, scope, drop_first)
        }
        None => Vec::new(),
    };

    let return_annotation = formatter
        .format(definition.child_by_field_name("return_type"), source)
        .or(function_comment.returns);

    Signature {
        args,
        return_annotation,
    }
}

fn emit_args(
    params: Vec<Param>,
    function_comment: &FunctionTypeComment,
    source: &[u8],
    formatter: &AnnotationFormatter,
    scope: ScopeId,
    drop_first: bool,
) -> Vec<ArgInfo> {
    let mut comment_args: Vec<Option<String>> = Vec::new();
    if drop_first {
        comment_args.push(None);
    }
    comment_args.extend(function_comment.args.iter().cloned());

    let mut result = Vec::new();
    let mut previous: Option<Slot> = None;
    let has_varargs = params.iter().any(|param| param.slot == Slot::VarArgs);

    for (position, param) in params.iter().enumerate() {
        if previous == Some(Slot::PositionalOnly) && param.slot != Slot::PositionalOnly {
            result.push(ArgInfo::sentinel(ArgPrefix::Slash));
        }
        if param.slot == Slot::KeywordOnly
            && previous != Some(Slot::KeywordOnly)
            && !has_varargs
        {
            result.push(ArgInfo::sentinel(ArgPrefix::Star));
        }
        previous = Some(param.slot);

        let inline = param
            .annotation
            .map(|node| formatter.format_in_scope(node, source, scope))
            .filter(|annotation| annotation != "...");
        let per_arg = param
            .comment
            .as_deref()
            .and_then(|text| formatter.format_text(text, scope))
            .filter(|annotation| annotation != "...");
        let from_function = comment_args.get(position).cloned().flatten();
        let annotation = inline.or(per_arg).or(from_function);

        let mut arg = match param.slot {
            Slot::VarArgs => ArgInfo::variadic(ArgPrefix::Star, &param.name),
            Slot::KwArgs => ArgInfo::variadic(ArgPrefix::DoubleStar, &param.name),
            _ => ArgInfo::named(&param.name),
        };
        arg.annotation = annotation;
        arg.default_value = param
            .default
            .map(|node| node_text(node, source).trim().to_string());
        result.push(arg);
    }
    if previous == Some(Slot::PositionalOnly) {
        result.push(ArgInfo::sentinel(ArgPrefix::Slash));
    }

    if drop_first && !result.is_empty() {
        result.remove(0);
    }
    result
}

fn collect_params<'t>(parameters: Node<'t>, source: &[u8]) -> Vec<Param<'t>> {
    let mut params: Vec<Param<'t>> = Vec::new();
    let mut keyword_only = false;

    for child in named_children(parameters) {
        let plain_slot = if keyword_only {
            Slot::KeywordOnly
        } else {
            Slot::Positional
        };
        let end_row = child.end_position().row;
        match child.kind() {
            "comment" => {
                if let Some(last) = params.last_mut() {
                    if last.end_row == child.start_position().row && last.comment.is_none() {
                        last.comment = type_comment(node_text(child, source)).map(str::to_string);
                    }
                }
            }
            "positional_separator" => {
                for param in params.iter_mut() {
                    if param.slot == Slot::Positional {
                        param.slot = Slot::PositionalOnly;
                    }
                }
            }
            "keyword_separator" => keyword_only = true,
            "identifier" | "tuple_pattern" => params.push(Param {
                slot: plain_slot,
                name: param_name(child, source),
                annotation: None,
                default: None,
                comment: None,
                end_row,
            }),
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let slot = splat_slot(child);
                keyword_only |= slot == Slot::VarArgs;
                params.push(Param {
                    slot,
                    name: splat_name(child, source),
                    annotation: None,
                    default: None,
                    comment: None,
                    end_row,
                });
            }
            "typed_parameter" => {
                let Some(target) = statements(child).into_iter().next() else {
                    continue;
                };
                let (slot, name) = match target.kind() {
                    "list_splat_pattern" | "dictionary_splat_pattern" => {
                        (splat_slot(target), splat_name(target, source))
                    }
                    _ => (plain_slot, param_name(target, source)),
                };
                keyword_only |= slot == Slot::VarArgs;
                params.push(Param {
                    slot,
                    name,
                    annotation: child.child_by_field_name("type"),
                    default: None,
                    comment: None,
                    end_row,
                });
            }
            "default_parameter" | "typed_default_parameter" => {
                let Some(target) = child.child_by_field_name("name") else {
                    continue;
                };
                params.push(Param {
                    slot: plain_slot,
                    name: param_name(target, source),
                    annotation: child.child_by_field_name("type"),
                    default: child.child_by_field_name("value"),
                    comment: None,
                    end_row,
                });
            }
            _ => {}
        }
    }
    params
}

fn splat_slot(node: Node) -> Slot {
    if node.kind() == "list_splat_pattern" {
        Slot::VarArgs
    } else {
        Slot::KwArgs
    }
}

fn splat_name(node: Node, source: &[u8]) -> String {
    statements(node)
        .into_iter()
        .next()
        .map(|name| node_text(name, source).to_string())
        .unwrap_or_default()
}

fn param_name(node: Node, source: &[u8]) -> String {
    if matches!(node.kind(), "tuple_pattern" | "list_pattern") {
        let names: Vec<String> = statements(node)
            .into_iter()
            .map(|element| param_name(element, source))
            .collect();
        format!("({})", names.join(", "))
    } else {
        node_text(node, source).to_string()
    }
}

/// Text of the function-level type comment: the first `# type:` comment
/// with an arrow between the header colon and the first body statement
fn function_comment<'a>(definition: Node, source: &'a [u8]) -> Option<&'a str> {
    let mut candidates = Vec::new();
    let mut cursor = definition.walk();
    let mut after_colon = false;
    for child in definition.children(&mut cursor) {
        match child.kind() {
            ":" => after_colon = true,
            "comment" if after_colon => candidates.push(child),
            _ => {}
        }
    }
    if let Some(body) = definition.child_by_field_name("body") {
        candidates.extend(
            named_children(body)
                .into_iter()
                .take_while(|child| child.kind() == "comment"),
        );
    }

    candidates
        .into_iter()
        .filter_map(|comment| type_comment(node_text(comment, source)))
        .find(|text| text.contains("->"))
}
