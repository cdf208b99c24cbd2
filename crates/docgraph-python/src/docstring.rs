//! Docstring preparation

/// Normalize a raw docstring the way documentation tools expect it.
///
/// Tabs expand to 8 columns, the first line loses its leading whitespace,
/// the remaining lines lose their common indentation, and leading and
/// trailing blank lines are removed.
pub fn prepare_docstring(raw: &str) -> String {
    let expanded = expand_tabs(raw, 8);
    let lines: Vec<&str> = expanded.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines[1..]
        .iter()
        .filter_map(|line| {
            let content = line.trim_start();
            if content.is_empty() {
                None
            } else {
                Some(line.chars().count() - content.chars().count())
            }
        })
        .min();

    let mut prepared: Vec<String> = Vec::with_capacity(lines.len());
    prepared.push(lines[0].trim_start().to_string());
    for line in &lines[1..] {
        let dedented: String = match margin {
            Some(margin) => line.chars().skip(margin).collect(),
            None => String::new(),
        };
        prepared.push(dedented);
    }

    while prepared.first().is_some_and(|line| line.trim().is_empty()) {
        prepared.remove(0);
    }
    while prepared.last().is_some_and(|line| line.trim().is_empty()) {
        prepared.pop();
    }

    prepared.join("\n")
}

fn expand_tabs(text: &str, tab_size: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for c in text.chars() {
        match c {
            '\t' => {
                let spaces = tab_size - (column % tab_size);
                out.extend(std::iter::repeat(' ').take(spaces));
                column += spaces;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            c => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        assert_eq!(prepare_docstring("doc"), "doc");
        assert_eq!(prepare_docstring("  padded  "), "padded  ");
    }

    #[test]
    fn test_dedent_ignores_first_line() {
        let raw = "Summary line.\n\n    Details here.\n      Indented more.\n    ";
        assert_eq!(
            prepare_docstring(raw),
            "Summary line.\n\nDetails here.\n  Indented more."
        );
    }

    #[test]
    fn test_strips_leading_blank_lines() {
        let raw = "\n    First.\n    Second.\n";
        assert_eq!(prepare_docstring(raw), "First.\nSecond.");
    }

    #[test]
    fn test_tabs_expand_before_dedent() {
        let raw = "Title\n\tbody";
        assert_eq!(prepare_docstring(raw), "Title\nbody");
    }

    #[test]
    fn test_empty() {
        assert_eq!(prepare_docstring(""), "");
        assert_eq!(prepare_docstring("\n   \n"), "");
    }
}
