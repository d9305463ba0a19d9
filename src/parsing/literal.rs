//! String literal evaluation and docstring normalization.

use tree_sitter::Node;

/// Evaluate a `string` or `concatenated_string` node to its text value.
///
/// Returns `None` for bytes literals and f-strings, which do not produce a
/// plain string constant.
pub fn evaluate_string(node: Node, bytes: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => evaluate_single(node, bytes),
        "concatenated_string" => {
            let mut value = String::new();
            let mut cursor = node.walk();
            for part in node.named_children(&mut cursor) {
                if part.kind() == "comment" {
                    continue;
                }
                value.push_str(&evaluate_single(part, bytes)?);
            }
            Some(value)
        }
        _ => None,
    }
}

fn evaluate_single(node: Node, bytes: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }

    let mut start = None;
    let mut end = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => start = Some(child),
            "string_end" => end = Some(child),
            "interpolation" => return None,
            _ => {}
        }
    }
    let (start, end) = (start?, end?);

    let opener = std::str::from_utf8(&bytes[start.start_byte()..start.end_byte()]).ok()?;
    let prefix: String = opener
        .chars()
        .take_while(|c| *c != '"' && *c != '\'')
        .flat_map(|c| c.to_lowercase())
        .collect();
    if prefix.contains('b') || prefix.contains('f') || prefix.contains('t') {
        return None;
    }

    let body = std::str::from_utf8(&bytes[start.end_byte()..end.start_byte()]).ok()?;
    let body = body.replace("\r\n", "\n");
    if prefix.contains('r') {
        Some(body)
    } else {
        Some(unescape(&body))
    }
}

/// Apply Python escape-sequence rules to a non-raw string body.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0b}'),
            '0'..='7' => {
                let mut digits = String::from(next);
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            digits.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                push_code_point(&mut out, u32::from_str_radix(&digits, 8).ok(), &format!("\\{digits}"));
            }
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
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
                let code = if digits.len() == width {
                    u32::from_str_radix(&digits, 16).ok()
                } else {
                    None
                };
                push_code_point(&mut out, code, &format!("\\{next}{digits}"));
            }
            // Named escapes need the Unicode name table; keep them verbatim.
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

fn push_code_point(out: &mut String, code: Option<u32>, verbatim: &str) {
    match code.and_then(char::from_u32) {
        Some(ch) => out.push(ch),
        None => out.push_str(verbatim),
    }
}

/// Remove the common leading indentation from every line.
///
/// Lines holding only spaces and tabs are emptied and do not count toward
/// the common margin.
pub fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| {
            if !line.is_empty() && line.chars().all(|c| c == ' ' || c == '\t') {
                ""
            } else {
                line
            }
        })
        .collect();

    let mut margin: Option<&str> = None;
    for line in &lines {
        if line.is_empty() {
            continue;
        }
        let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        let indent = &line[..indent_len];
        margin = Some(match margin {
            None => indent,
            Some(current) => common_prefix(current, indent),
        });
    }

    let margin = margin.unwrap_or("");
    if margin.is_empty() {
        return lines.join("\n");
    }
    lines
        .iter()
        .map(|line| line.strip_prefix(margin).unwrap_or(*line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

/// Dedent a raw docstring and strip surrounding blank lines.
pub fn normalize_docstring(raw: &str) -> String {
    dedent(raw).trim_matches('\n').to_string()
}
