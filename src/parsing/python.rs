//! Python declaration extractor using tree-sitter.

use super::LanguageParser;
use super::literal::{evaluate_string, normalize_docstring};
use super::render::{node_text, render_expression};
use crate::error::ExtractError;
use crate::types::*;
use std::path::Path;
use tree_sitter::{Language, Node, Tree};

/// Node kinds that only exist in Python 2 and are rejected as invalid syntax.
const LEGACY_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

const NON_DEFAULT_AFTER_DEFAULT: &str = "non-default argument follows default argument";
const BARE_STAR_WITHOUT_NAMES: &str = "named arguments must follow bare *";
const POSITIONAL_AFTER_KEYWORD: &str = "positional argument follows keyword argument";
const POSITIONAL_AFTER_UNPACKING: &str =
    "positional argument follows keyword argument unpacking";
const ITERABLE_AFTER_UNPACKING: &str =
    "iterable argument unpacking follows keyword argument unpacking";

/// Python source code parser.
pub struct PythonParser {
    // Parser instance is created per-use since it's not Send
}

impl PythonParser {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn extract_declarations(
        &self,
        tree: &Tree,
        source: &str,
        file: &Path,
    ) -> Result<Vec<DeclarationRecord>, ExtractError> {
        let bytes = source.as_bytes();
        let root = tree.root_node();

        if let Some(invalid) = find_node(root, |n| grammar_violation(n, bytes).is_some()) {
            return Err(ExtractError::Parse {
                path: file.to_path_buf(),
                line: invalid.start_position().row + 1,
                message: grammar_violation(invalid, bytes).unwrap_or_default(),
            });
        }

        let lines: Vec<&str> = source.lines().collect();
        let mut records = Vec::new();

        // Only direct children of the module are visited.
        let mut cursor = root.walk();
        for stmt in root.named_children(&mut cursor) {
            let record = match stmt.kind() {
                "function_definition" | "class_definition" => {
                    build_record(stmt, stmt, bytes, &lines)
                }
                "decorated_definition" => match stmt.child_by_field_name("definition") {
                    Some(def) => build_record(def, stmt, bytes, &lines),
                    None => None,
                },
                _ => None,
            };
            if let Some(record) = record {
                records.push(record);
            }
        }

        tracing::debug!(
            "Extracted {} declarations from {}",
            records.len(),
            file.display()
        );

        Ok(records)
    }
}

// ============================================================================
// Record Construction
// ============================================================================

/// Build a record for a definition node.
///
/// `outer` is the `decorated_definition` wrapping `def`, or `def` itself.
fn build_record(
    def: Node,
    outer: Node,
    bytes: &[u8],
    lines: &[&str],
) -> Option<DeclarationRecord> {
    let name = node_text(def.child_by_field_name("name")?, bytes).to_string();
    let decorators = extract_decorators(outer, bytes);
    let is_class = def.kind() == "class_definition";
    let is_async = !is_class && has_async_keyword(def);

    let kind = if is_class {
        DeclarationKind::Class
    } else if is_async {
        DeclarationKind::Coroutine
    } else if contains_yield(def) {
        DeclarationKind::Generator
    } else {
        DeclarationKind::Function
    };

    let shape = if is_class {
        DeclarationShape::Class {
            bases: extract_bases(def, bytes),
        }
    } else {
        DeclarationShape::Callable {
            parameters: extract_parameters(def, bytes),
            returns: def
                .child_by_field_name("return_type")
                .map(|ret| render_expression(ret, bytes)),
        }
    };
    let signature = render_signature(&name, is_async, &shape);

    let start_line = outer.start_position().row + 1;
    let end_line = last_code_row(def) + 1;
    let source = lines
        .get(start_line - 1..end_line.min(lines.len()))
        .map(|span| span.join("\n"))
        .unwrap_or_default();

    Some(DeclarationRecord {
        name,
        kind,
        shape,
        signature,
        docstring: extract_docstring(def, bytes),
        source,
        start_line,
        end_line,
        is_async,
        decorators,
        nested: false,
    })
}

/// Render the canonical single-line signature.
pub fn render_signature(name: &str, is_async: bool, shape: &DeclarationShape) -> String {
    match shape {
        DeclarationShape::Callable {
            parameters,
            returns,
        } => {
            let params: Vec<String> = parameters.iter().map(Parameter::render).collect();
            let returns = returns
                .as_ref()
                .map(|ret| format!(" -> {ret}"))
                .unwrap_or_default();
            let keyword = if is_async { "async def" } else { "def" };
            format!("{} {}({}){}:", keyword, name, params.join(", "), returns)
        }
        DeclarationShape::Class { bases } if bases.is_empty() => format!("class {name}:"),
        DeclarationShape::Class { bases } => format!("class {}({}):", name, bases.join(", ")),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Rendered decorator expressions, in source order.
fn extract_decorators(outer: Node, bytes: &[u8]) -> Vec<String> {
    if outer.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut decorators = Vec::new();
    let mut cursor = outer.walk();
    for child in outer.named_children(&mut cursor) {
        if child.kind() != "decorator" {
            continue;
        }
        let mut inner = child.walk();
        let expr = child
            .named_children(&mut inner)
            .find(|n| n.kind() != "comment");
        if let Some(expr) = expr {
            decorators.push(render_expression(expr, bytes));
        }
    }
    decorators
}

fn has_async_keyword(def: Node) -> bool {
    let mut cursor = def.walk();
    let found = def.children(&mut cursor).any(|child| child.kind() == "async");
    found
}

/// Whether a `yield` appears anywhere under the definition, nested scopes included.
fn contains_yield(def: Node) -> bool {
    find_node(def, |n| n.kind() == "yield").is_some()
}

/// Message for a construct tree-sitter accepts but Python's parser rejects.
fn grammar_violation(node: Node, bytes: &[u8]) -> Option<String> {
    match node.kind() {
        "print_statement" | "exec_statement" if is_legacy_statement(node, bytes) => {
            let keyword = node.kind().trim_end_matches("_statement");
            Some(format!("Missing parentheses in call to '{keyword}'"))
        }
        "parameters" | "lambda_parameters" => parameter_order_violation(node).map(str::to_string),
        "argument_list" => argument_order_violation(node).map(str::to_string),
        _ => None,
    }
}

/// Splat kind of a parameter node, looking through a type annotation.
fn splat_kind(param: Node) -> Option<&'static str> {
    let target = if param.kind() == "typed_parameter" {
        param.named_child(0)?
    } else {
        param
    };
    match target.kind() {
        "list_splat_pattern" => Some("list_splat_pattern"),
        "dictionary_splat_pattern" => Some("dictionary_splat_pattern"),
        _ => None,
    }
}

/// Defaults must run to the end of the positional parameters, and a bare
/// `*` needs at least one keyword-only parameter after it.
fn parameter_order_violation(params: Node) -> Option<&'static str> {
    let mut cursor = params.walk();
    let children: Vec<Node> = params
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();

    let mut seen_default = false;
    for (i, child) in children.iter().enumerate() {
        if child.kind() == "keyword_separator" {
            let next = children.get(i + 1);
            let named_follows =
                next.is_some_and(|n| splat_kind(*n) != Some("dictionary_splat_pattern"));
            return (!named_follows).then_some(BARE_STAR_WITHOUT_NAMES);
        }
        if splat_kind(*child).is_some() {
            return None;
        }
        match child.kind() {
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "identifier" | "typed_parameter" if seen_default => {
                return Some(NON_DEFAULT_AFTER_DEFAULT);
            }
            _ => {}
        }
    }
    None
}

/// Positional arguments precede keywords; `*args` precedes `**kwargs`.
fn argument_order_violation(args: Node) -> Option<&'static str> {
    let mut seen_keyword = false;
    let mut seen_unpacking = false;
    let mut cursor = args.walk();
    for arg in args.named_children(&mut cursor) {
        match arg.kind() {
            "comment" => {}
            "keyword_argument" => seen_keyword = true,
            "dictionary_splat" => seen_unpacking = true,
            "list_splat" if seen_unpacking => return Some(ITERABLE_AFTER_UNPACKING),
            "list_splat" => {}
            _ if seen_unpacking => return Some(POSITIONAL_AFTER_UNPACKING),
            _ if seen_keyword => return Some(POSITIONAL_AFTER_KEYWORD),
            _ => {}
        }
    }
    None
}

/// `print x` / `exec code`. The parenthesized forms are ordinary calls.
fn is_legacy_statement(node: Node, bytes: &[u8]) -> bool {
    if !LEGACY_STATEMENTS.contains(&node.kind()) {
        return false;
    }
    let keyword = node.kind().trim_end_matches("_statement");
    let rest = node_text(node, bytes)
        .trim_start_matches(keyword)
        .trim_start();
    !rest.starts_with('(')
}

/// First node in pre-order satisfying `pred`.
fn find_node<'t>(root: Node<'t>, pred: impl Fn(Node<'t>) -> bool) -> Option<Node<'t>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if pred(node) {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Base classes. Keyword arguments such as `metaclass=` are not bases.
fn extract_bases(def: Node, bytes: &[u8]) -> Vec<String> {
    let Some(superclasses) = def.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut bases = Vec::new();
    let mut cursor = superclasses.walk();
    for arg in superclasses.named_children(&mut cursor) {
        match arg.kind() {
            "comment" | "keyword_argument" | "dictionary_splat" => {}
            _ => bases.push(render_expression(arg, bytes)),
        }
    }
    bases
}

/// Parameters in canonical order. Default values are dropped.
fn extract_parameters(def: Node, bytes: &[u8]) -> Vec<Parameter> {
    let Some(params_node) = def.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut params = Vec::new();
    let mut after_star = false;
    let mut cursor = params_node.walk();
    for child in params_node.named_children(&mut cursor) {
        let (target, annotation) = match child.kind() {
            "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => (child, None),
            "typed_parameter" => {
                let mut inner = child.walk();
                let target = child
                    .named_children(&mut inner)
                    .find(|n| n.kind() != "type" && n.kind() != "comment");
                match target {
                    Some(target) => (target, child.child_by_field_name("type")),
                    None => continue,
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                match child.child_by_field_name("name") {
                    Some(name) => (name, child.child_by_field_name("type")),
                    None => continue,
                }
            }
            // Positional-only parameters are not part of the signature.
            "positional_separator" => {
                params.clear();
                continue;
            }
            "keyword_separator" => {
                after_star = true;
                continue;
            }
            _ => continue,
        };

        let annotation = annotation.map(|ty| render_expression(ty, bytes));
        let (name, kind) = match target.kind() {
            "list_splat_pattern" => {
                after_star = true;
                (splat_name(target, bytes), ParameterKind::VarPositional)
            }
            "dictionary_splat_pattern" => (splat_name(target, bytes), ParameterKind::VarKeyword),
            _ if after_star => (node_text(target, bytes).to_string(), ParameterKind::KeywordOnly),
            _ => (node_text(target, bytes).to_string(), ParameterKind::Positional),
        };
        params.push(Parameter {
            name,
            annotation,
            kind,
        });
    }

    params.sort_by_key(|p| match p.kind {
        ParameterKind::Positional => 0,
        ParameterKind::VarPositional => 1,
        ParameterKind::KeywordOnly => 2,
        ParameterKind::VarKeyword => 3,
    });
    params
}

fn splat_name(pattern: Node, bytes: &[u8]) -> String {
    let mut cursor = pattern.walk();
    let ident = pattern
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    match ident {
        Some(ident) => node_text(ident, bytes).to_string(),
        None => node_text(pattern, bytes).trim_start_matches('*').trim().to_string(),
    }
}

/// Docstring: the first body statement, if it is a bare string literal.
fn extract_docstring(def: Node, bytes: &[u8]) -> Option<String> {
    let body = def.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }
    let mut expr = first.named_child(0)?;
    while expr.kind() == "parenthesized_expression" && expr.named_child_count() == 1 {
        expr = expr.named_child(0)?;
    }
    if !matches!(expr.kind(), "string" | "concatenated_string") {
        return None;
    }
    evaluate_string(expr, bytes).map(|raw| normalize_docstring(&raw))
}

/// Row of the last non-comment token under `node`.
fn last_code_row(node: Node) -> usize {
    let mut current = node;
    loop {
        let mut cursor = current.walk();
        let last = current
            .children(&mut cursor)
            .filter(|c| c.kind() != "comment" && c.end_byte() > c.start_byte())
            .last();
        match last {
            Some(child) => current = child,
            None => break,
        }
    }
    let end = current.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    }
}
