//! Expression rendering for decorators, base classes and annotations.
//!
//! A small recursive-descent printer. Identifiers, attribute paths, calls,
//! literals and lists have dedicated rules; every other expression shape goes
//! through a token-level fallback that normalizes whitespace and comments
//! away while keeping the expression's own text.

use super::literal::evaluate_string;
use tree_sitter::Node;

/// Render an expression node to its canonical single-line text.
pub fn render_expression(node: Node, bytes: &[u8]) -> String {
    match node.kind() {
        "identifier" => node_text(node, bytes).to_string(),
        "attribute" => render_attribute(node, bytes),
        "call" => render_call(node, bytes),
        "string" | "concatenated_string" => match evaluate_string(node, bytes) {
            Some(value) => quote(&value),
            None => render_fallback(node, bytes),
        },
        "integer" | "float" => normalize_number(node_text(node, bytes)),
        "true" => "True".to_string(),
        "false" => "False".to_string(),
        "none" => "None".to_string(),
        "ellipsis" => "Ellipsis".to_string(),
        "list" => {
            let elements: Vec<String> = expression_children(node)
                .into_iter()
                .map(|child| render_expression(child, bytes))
                .collect();
            format!("[{}]", elements.join(", "))
        }
        // Annotations are wrapped in a `type` node holding a single expression.
        "type" => match single_expression_child(node) {
            Some(inner) => render_expression(inner, bytes),
            None => render_fallback(node, bytes),
        },
        _ => render_fallback(node, bytes),
    }
}

fn render_attribute(node: Node, bytes: &[u8]) -> String {
    let object = node.child_by_field_name("object");
    let attribute = node.child_by_field_name("attribute");
    match (object, attribute) {
        (Some(object), Some(attribute)) => format!(
            "{}.{}",
            render_expression(object, bytes),
            node_text(attribute, bytes)
        ),
        _ => render_fallback(node, bytes),
    }
}

fn render_call(node: Node, bytes: &[u8]) -> String {
    let Some(function) = node.child_by_field_name("function") else {
        return render_fallback(node, bytes);
    };
    let callee = render_expression(function, bytes);

    let Some(arguments) = node.child_by_field_name("arguments") else {
        return format!("{callee}()");
    };

    // A bare generator argument: `f(x for x in xs)`
    if arguments.kind() != "argument_list" {
        return format!("{}({})", callee, render_fallback(arguments, bytes));
    }

    let mut positional = Vec::new();
    let mut keywords = Vec::new();
    for arg in expression_children(arguments) {
        match arg.kind() {
            "keyword_argument" => {
                let name = arg.child_by_field_name("name");
                let value = arg.child_by_field_name("value");
                match (name, value) {
                    (Some(name), Some(value)) => keywords.push(format!(
                        "{}={}",
                        node_text(name, bytes),
                        render_expression(value, bytes)
                    )),
                    _ => keywords.push(render_fallback(arg, bytes)),
                }
            }
            "dictionary_splat" => match single_expression_child(arg) {
                Some(inner) => keywords.push(format!("**{}", render_expression(inner, bytes))),
                None => keywords.push(render_fallback(arg, bytes)),
            },
            _ => positional.push(render_expression(arg, bytes)),
        }
    }

    positional.extend(keywords);
    format!("{}({})", callee, positional.join(", "))
}

// ============================================================================
// Fallback Rendering
// ============================================================================

/// How a token is separated from its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spacing {
    /// Follow the source layout.
    Source,
    /// Binary, comparison and boolean operators: one space on each side.
    Around,
    /// Unary operators: nothing between operator and operand.
    TightAfter,
}

/// A source token with its byte span.
struct Token {
    text: String,
    start: usize,
    end: usize,
    spacing: Spacing,
}

/// Generic rendering: the expression's tokens joined with single spaces
/// where the source had whitespace, comments dropped. Operators are spaced
/// the way the interpreter's unparser prints them.
pub fn render_fallback(node: Node, bytes: &[u8]) -> String {
    let mut tokens = Vec::new();
    collect_tokens(node, bytes, Spacing::Source, &mut tokens);

    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in &tokens {
        if let Some(p) = prev {
            let opener = matches!(p.text.as_str(), "(" | "[" | "{");
            let closer = matches!(token.text.as_str(), ")" | "]" | "}" | ",");
            let after_comma = p.text == ",";
            let had_gap = token.start > p.end;
            let space = match (p.spacing, token.spacing) {
                (Spacing::TightAfter, _) => false,
                (Spacing::Around, _) | (_, Spacing::Around) => true,
                _ => !opener && !closer && (had_gap || after_comma),
            };
            if space {
                out.push(' ');
            }
        }
        // Trailing commas carry no meaning inside brackets and braces.
        if matches!(token.text.as_str(), "]" | "}") && out.ends_with(',') {
            out.pop();
        }
        out.push_str(&token.text);
        prev = Some(token);
    }
    out
}

/// Spacing for the unnamed operator tokens directly under `parent`.
fn operator_spacing(parent: &str) -> Spacing {
    match parent {
        "binary_operator" | "comparison_operator" | "boolean_operator" => Spacing::Around,
        "unary_operator" => Spacing::TightAfter,
        _ => Spacing::Source,
    }
}

fn collect_tokens(node: Node, bytes: &[u8], spacing: Spacing, out: &mut Vec<Token>) {
    let text = match node.kind() {
        "comment" => return,
        "string" | "concatenated_string" => match evaluate_string(node, bytes) {
            Some(value) => quote(&value),
            None => collapse_whitespace(node_text(node, bytes)),
        },
        "integer" | "float" => normalize_number(node_text(node, bytes)),
        _ if node.child_count() == 0 => node_text(node, bytes).to_string(),
        parent => {
            // Multi-word operators (`not in`, `is not`) keep their parent's spacing.
            let operators = if node.is_named() {
                operator_spacing(parent)
            } else {
                spacing
            };
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                let child_spacing = if child.is_named() {
                    Spacing::Source
                } else {
                    operators
                };
                collect_tokens(child, bytes, child_spacing, out);
            }
            return;
        }
    };
    if !text.is_empty() {
        out.push(Token {
            text,
            start: node.start_byte(),
            end: node.end_byte(),
            spacing,
        });
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub(crate) fn node_text<'a>(node: Node, bytes: &'a [u8]) -> &'a str {
    std::str::from_utf8(&bytes[node.start_byte()..node.end_byte()]).unwrap_or("")
}

fn quote(value: &str) -> String {
    format!("'{}'", value)
}

/// Named children that are not comments.
fn expression_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    children
}

fn single_expression_child(node: Node) -> Option<Node> {
    let children = expression_children(node);
    match children.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render a numeric literal the way the interpreter prints its value.
fn normalize_number(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    if let Some(imaginary) = lower.strip_suffix('j') {
        // Complex values print without a forced `.0`: `1e3j` is `1000j`.
        return match python_float(imaginary) {
            Some(value) => format!("{}j", value.strip_suffix(".0").unwrap_or(&value)),
            None => text.to_string(),
        };
    }
    let is_float = !lower.starts_with("0x")
        && !lower.starts_with("0o")
        && !lower.starts_with("0b")
        && (lower.contains('.') || lower.contains('e'));
    if is_float {
        python_float(&lower).unwrap_or_else(|| text.to_string())
    } else {
        normalize_integer(text)
    }
}

/// Shortest round-trip float text, fixed notation for decimal exponents in
/// `-4..16` and scientific (`1e+16`, `1e-05`) outside.
fn python_float(text: &str) -> Option<String> {
    let value: f64 = text.replace('_', "").parse().ok()?;
    if value.is_infinite() {
        return Some("inf".to_string());
    }

    // `{:e}` yields the shortest digits that round-trip, as `d.ddde<exp>`.
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e')?;
    let exponent: i32 = exponent.parse().ok()?;
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let point = exponent + 1;
    let len = digits.len() as i32;

    if !(-4 < point && point <= 16) {
        let (head, tail) = digits.split_at(1);
        let sign = if exponent < 0 { '-' } else { '+' };
        let mantissa = if tail.is_empty() {
            head.to_string()
        } else {
            format!("{head}.{tail}")
        };
        return Some(format!("{mantissa}e{sign}{:02}", exponent.abs()));
    }

    Some(if point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else if point >= len {
        format!("{}{}.0", digits, "0".repeat((point - len) as usize))
    } else {
        let (whole, frac) = digits.split_at(point as usize);
        format!("{whole}.{frac}")
    })
}

/// Render an integer literal in decimal, as the interpreter would print it.
fn normalize_integer(text: &str) -> String {
    let cleaned = text.replace('_', "").to_ascii_lowercase();
    let parsed = if let Some(hex) = cleaned.strip_prefix("0x") {
        u128::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = cleaned.strip_prefix("0o") {
        u128::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        u128::from_str_radix(bin, 2).ok()
    } else {
        cleaned.parse::<u128>().ok()
    };
    match parsed {
        Some(value) => value.to_string(),
        None => text.to_string(),
    }
}
