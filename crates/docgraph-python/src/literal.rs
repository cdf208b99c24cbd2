//! Evaluation of Python literal constants
//!
//! Only literals are evaluated: strings, bytes, numbers, `True`/`False`/`None`,
//! `...` and flat lists or tuples of those. Anything else is "not a constant"
//! and yields `None`, which callers render as an absent value.

use crate::visitor::{named_children, node_text};
use tree_sitter::Node;

/// A constant Python value
#[derive(Debug, Clone, PartialEq)]
pub enum PyConst {
    Str(String),
    Bytes(Vec<u8>),
    /// Decimal digits, possibly with a leading `-`
    Int(String),
    Float(f64),
    /// Imaginary part of a complex literal
    Imaginary(f64),
    Bool(bool),
    None,
    Ellipsis,
    List(Vec<PyConst>),
    Tuple(Vec<PyConst>),
}

impl PyConst {
    /// Python's `repr()` of the value
    pub fn repr(&self) -> String {
        match self {
            PyConst::Str(value) => str_repr(value),
            PyConst::Bytes(value) => bytes_repr(value),
            PyConst::Int(digits) => digits.clone(),
            PyConst::Float(value) => float_repr(*value),
            PyConst::Imaginary(value) => {
                let repr = float_repr(*value);
                format!("{}j", repr.strip_suffix(".0").unwrap_or(&repr))
            }
            PyConst::Bool(true) => "True".to_string(),
            PyConst::Bool(false) => "False".to_string(),
            PyConst::None => "None".to_string(),
            PyConst::Ellipsis => "Ellipsis".to_string(),
            PyConst::List(items) => {
                let items: Vec<String> = items.iter().map(PyConst::repr).collect();
                format!("[{}]", items.join(", "))
            }
            PyConst::Tuple(items) => match items.as_slice() {
                [single] => format!("({},)", single.repr()),
                _ => {
                    let items: Vec<String> = items.iter().map(PyConst::repr).collect();
                    format!("({})", items.join(", "))
                }
            },
        }
    }

    /// Python's `str()` of the value
    pub fn to_display_string(&self) -> String {
        match self {
            PyConst::Str(value) => value.clone(),
            other => other.repr(),
        }
    }

    fn is_multiline_str(&self) -> bool {
        matches!(self, PyConst::Str(value) if value.contains('\n'))
    }
}

/// Evaluate a literal expression node
pub fn eval_node(node: Node, source: &[u8]) -> Option<PyConst> {
    match node.kind() {
        "string" => eval_string(node_text(node, source)),
        "concatenated_string" => {
            let parts = named_children(node)
                .into_iter()
                .filter(|part| part.kind() == "string")
                .map(|part| eval_string(node_text(part, source)))
                .collect::<Option<Vec<_>>>()?;
            concatenate(parts)
        }
        "integer" => eval_number(node_text(node, source)),
        "float" => eval_number(node_text(node, source)),
        "true" => Some(PyConst::Bool(true)),
        "false" => Some(PyConst::Bool(false)),
        "none" => Some(PyConst::None),
        "ellipsis" => Some(PyConst::Ellipsis),
        "parenthesized_expression" => {
            let inner = named_children(node)
                .into_iter()
                .find(|child| child.kind() != "comment")?;
            eval_node(inner, source)
        }
        "list" | "tuple" => {
            let items = named_children(node)
                .into_iter()
                .filter(|child| child.kind() != "comment")
                .map(|child| eval_node(child, source))
                .collect::<Option<Vec<_>>>()?;
            if node.kind() == "list" {
                Some(PyConst::List(items))
            } else {
                Some(PyConst::Tuple(items))
            }
        }
        _ => None,
    }
}

/// Render the value assigned to a data or attribute record.
///
/// A multi-line string renders in triple quotes. Lists and tuples render only
/// when every element is a constant and no element is a multi-line string.
pub fn const_value(node: Node, source: &[u8]) -> Option<String> {
    let value = eval_node(node, source)?;
    if let PyConst::Str(text) = &value {
        if text.contains('\n') {
            return Some(format!("\"\"\"{text}\"\"\""));
        }
    }
    if contains_nested_multiline(&value) {
        return None;
    }
    Some(value.repr())
}

fn contains_nested_multiline(value: &PyConst) -> bool {
    match value {
        PyConst::List(items) | PyConst::Tuple(items) => items
            .iter()
            .any(|item| item.is_multiline_str() || contains_nested_multiline(item)),
        _ => false,
    }
}

fn concatenate(parts: Vec<PyConst>) -> Option<PyConst> {
    let mut parts = parts.into_iter();
    let first = parts.next()?;
    parts.try_fold(first, |acc, part| match (acc, part) {
        (PyConst::Str(mut a), PyConst::Str(b)) => {
            a.push_str(&b);
            Some(PyConst::Str(a))
        }
        (PyConst::Bytes(mut a), PyConst::Bytes(b)) => {
            a.extend(b);
            Some(PyConst::Bytes(a))
        }
        _ => None,
    })
}

/// Evaluate the source text of one string literal, prefix and quotes included.
///
/// f-strings are not constants.
pub fn eval_string(text: &str) -> Option<PyConst> {
    let quote_start = text.find(['\'', '"'])?;
    let prefix = text[..quote_start].to_ascii_lowercase();
    if prefix.contains('f') {
        return None;
    }
    let raw = prefix.contains('r');
    let bytes = prefix.contains('b');

    let body = &text[quote_start..];
    let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        3
    } else {
        1
    };
    if body.len() < quote_len * 2 {
        return None;
    }
    let inner = &body[quote_len..body.len() - quote_len];

    let value = if raw {
        inner.to_string()
    } else {
        unescape(inner, bytes)
    };
    if bytes {
        Some(PyConst::Bytes(value.chars().map(|c| c as u32 as u8).collect()))
    } else {
        Some(PyConst::Str(value))
    }
}

fn unescape(inner: &str, bytes: bool) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' | '\'' | '"' => out.push(escaped),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut digits = String::from(escaped);
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            digits.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                match u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
            }
            'x' => push_hex_escape(&mut out, &mut chars, 'x', 2),
            'u' if !bytes => push_hex_escape(&mut out, &mut chars, 'u', 4),
            'U' if !bytes => push_hex_escape(&mut out, &mut chars, 'U', 8),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

fn push_hex_escape(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    marker: char,
    width: usize,
) {
    let mut digits = String::new();
    while digits.len() < width {
        match chars.peek() {
            Some(d) if d.is_ascii_hexdigit() => {
                digits.push(*d);
                chars.next();
            }
            _ => break,
        }
    }
    let decoded = (digits.len() == width)
        .then(|| u32::from_str_radix(&digits, 16).ok())
        .flatten()
        .and_then(char::from_u32);
    match decoded {
        Some(decoded) => out.push(decoded),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(&digits);
        }
    }
}

fn eval_number(text: &str) -> Option<PyConst> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();

    if let Some(imaginary) = lower.strip_suffix('j') {
        return imaginary.parse::<f64>().ok().map(PyConst::Imaginary);
    }

    let radix = match lower.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return match u128::from_str_radix(&lower[2..], radix) {
            Ok(value) => Some(PyConst::Int(value.to_string())),
            Err(_) => Some(PyConst::Int(lower)),
        };
    }

    if lower.chars().all(|c| c.is_ascii_digit()) && !lower.is_empty() {
        let trimmed = lower.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        return Some(PyConst::Int(digits.to_string()));
    }

    lower.parse::<f64>().ok().map(PyConst::Float)
}

/// Python's `repr()` of a float: shortest round-trip digits, positional
/// notation for exponents in `-4..16`, scientific otherwise.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let body = if (-4..16).contains(&exponent) {
        let point = exponent + 1;
        if point <= 0 {
            format!("0.{}{}", "0".repeat((-point) as usize), digits)
        } else if point as usize >= digits.len() {
            format!("{}{}.0", digits, "0".repeat(point as usize - digits.len()))
        } else {
            let (int_part, frac_part) = digits.split_at(point as usize);
            format!("{int_part}.{frac_part}")
        }
    } else {
        let mantissa = if digits.len() == 1 {
            digits
        } else {
            format!("{}.{}", &digits[..1], &digits[1..])
        };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, exp_sign, exponent.abs())
    };
    format!("{sign}{body}")
}

/// Python's `repr()` of a `str`
pub fn str_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || (0x7f..=0xa0).contains(&(c as u32)) => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn bytes_repr(value: &[u8]) -> String {
    let quote = if value.contains(&b'\'') && !value.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::from("b");
    out.push(quote as char);
    for &byte in value {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\x{b:02x}")),
            b => out.push(b as char),
        }
    }
    out.push(quote as char);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn eval_expr(expr: &str) -> Option<PyConst> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::language()).unwrap();
        let source = format!("x = {expr}\n");
        let tree = parser.parse(&source, None).unwrap();
        let statement = tree.root_node().named_child(0).unwrap();
        let assignment = statement.named_child(0).unwrap();
        let right = assignment.child_by_field_name("right").unwrap();
        eval_node(right, source.as_bytes())
    }

    fn value_of(expr: &str) -> Option<String> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::language()).unwrap();
        let source = format!("x = {expr}\n");
        let tree = parser.parse(&source, None).unwrap();
        let statement = tree.root_node().named_child(0).unwrap();
        let assignment = statement.named_child(0).unwrap();
        let right = assignment.child_by_field_name("right").unwrap();
        const_value(right, source.as_bytes())
    }

    #[test]
    fn test_string_reprs() {
        assert_eq!(value_of("\"x\"").as_deref(), Some("'x'"));
        assert_eq!(value_of("'it''s'").as_deref(), Some("'its'"));
        assert_eq!(value_of("\"it's\"").as_deref(), Some("\"it's\""));
        assert_eq!(value_of("'a\\tb'").as_deref(), Some("'a\\tb'"));
        assert_eq!(value_of("r'\\d+'").as_deref(), Some("'\\\\d+'"));
        assert_eq!(value_of("b'ab\\x00'").as_deref(), Some("b'ab\\x00'"));
    }

    #[test]
    fn test_fstring_is_not_constant() {
        assert_eq!(value_of("f'{x}'"), None);
    }

    #[test]
    fn test_implicit_concatenation() {
        assert_eq!(value_of("'a' 'b'").as_deref(), Some("'ab'"));
    }

    #[test]
    fn test_multiline_string_uses_triple_quotes() {
        assert_eq!(
            value_of("\"\"\"one\ntwo\"\"\"").as_deref(),
            Some("\"\"\"one\ntwo\"\"\"")
        );
        assert_eq!(value_of("[\"\"\"one\ntwo\"\"\"]"), None);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(value_of("0x10").as_deref(), Some("16"));
        assert_eq!(value_of("1_000").as_deref(), Some("1000"));
        assert_eq!(value_of("1.5").as_deref(), Some("1.5"));
        assert_eq!(value_of("1e16").as_deref(), Some("1e+16"));
        assert_eq!(value_of("0.00001").as_deref(), Some("1e-05"));
        assert_eq!(value_of("2.0j").as_deref(), Some("2j"));
        assert_eq!(value_of("-1"), None);
    }

    #[test]
    fn test_containers() {
        assert_eq!(value_of("[1, 'a', None]").as_deref(), Some("[1, 'a', None]"));
        assert_eq!(value_of("(1,)").as_deref(), Some("(1,)"));
        assert_eq!(value_of("(True, False)").as_deref(), Some("(True, False)"));
        assert_eq!(value_of("[1, x]"), None);
        assert_eq!(value_of("{'a': 1}"), None);
    }

    #[test]
    fn test_eval_ellipsis_and_parens() {
        assert_eq!(eval_expr("..."), Some(PyConst::Ellipsis));
        assert_eq!(eval_expr("(3)"), Some(PyConst::Int("3".into())));
    }

    #[test]
    fn test_float_repr_boundaries() {
        assert_eq!(float_repr(123.0), "123.0");
        assert_eq!(float_repr(0.5), "0.5");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(1e22), "1e+22");
        assert_eq!(float_repr(-2.5e-7), "-2.5e-07");
    }
}
