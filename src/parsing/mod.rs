//! Parsing module for extracting top-level declarations from source code.
//!
//! Uses tree-sitter for parsing. Unlike a symbol indexer, extraction is
//! all-or-nothing: a file with any syntax error yields no records at all.

pub mod literal;
pub mod python;
pub mod render;

use crate::error::ExtractError;
use crate::types::DeclarationRecord;
use std::path::Path;
use tree_sitter::{Language, Node, Parser, Tree};

/// Trait for language-specific declaration extractors.
pub trait LanguageParser: Send + Sync {
    /// Get the tree-sitter language.
    fn language(&self) -> Language;

    /// File extensions this parser handles.
    fn extensions(&self) -> &[&str];

    /// Extract top-level declaration records from an error-free tree.
    fn extract_declarations(
        &self,
        tree: &Tree,
        source: &str,
        file: &Path,
    ) -> Result<Vec<DeclarationRecord>, ExtractError>;
}

/// Get a parser for a file based on its extension.
pub fn parser_for_file(path: &Path) -> Option<Box<dyn LanguageParser>> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "py" => Some(Box::new(python::PythonParser::new())),
        _ => None,
    }
}

/// Extract declarations from Python source text.
///
/// `file` is only used for diagnostics.
pub fn extract_declarations(
    source: &str,
    file: &Path,
) -> Result<Vec<DeclarationRecord>, ExtractError> {
    extract_with(&python::PythonParser::new(), source, file)
}

/// Parse `source` with the given language and extract its declarations.
pub fn extract_with(
    lang_parser: &dyn LanguageParser,
    source: &str,
    file: &Path,
) -> Result<Vec<DeclarationRecord>, ExtractError> {
    if source.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parser = Parser::new();
    parser
        .set_language(&lang_parser.language())
        .map_err(|e| ExtractError::Language(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ExtractError::Language("parser produced no tree".to_string()))?;

    if let Some((line, message)) = first_syntax_error(tree.root_node()) {
        return Err(ExtractError::Parse {
            path: file.to_path_buf(),
            line,
            message,
        });
    }

    lang_parser.extract_declarations(&tree, source, file)
}

/// Locate the first error or missing node in document order.
///
/// Returns its 1-based line and a short message.
pub fn first_syntax_error(root: Node) -> Option<(usize, String)> {
    if !root.has_error() {
        return None;
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            return Some((
                node.start_position().row + 1,
                format!("expected '{}'", node.kind()),
            ));
        }
        if node.is_error() {
            return Some((node.start_position().row + 1, "invalid syntax".to_string()));
        }

        // Push in reverse so the leftmost child is visited first.
        let mut cursor = node.walk();
        let children: Vec<Node> = node
            .children(&mut cursor)
            .filter(|child| child.has_error())
            .collect();
        stack.extend(children.into_iter().rev());
    }

    // has_error() was set but no node carried it; report the root.
    Some((root.start_position().row + 1, "invalid syntax".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_for_file_by_extension() {
        assert!(parser_for_file(Path::new("pkg/module.py")).is_some());
        assert!(parser_for_file(Path::new("pkg/module.rs")).is_none());
        assert!(parser_for_file(Path::new("Makefile")).is_none());
    }

    #[test]
    fn test_empty_source_yields_no_records() {
        let records = extract_declarations("", Path::new("empty.py")).unwrap();
        assert!(records.is_empty());

        let records = extract_declarations("  \n\t\n", Path::new("blank.py")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let source = "def ok():\n    \"\"\"Fine.\"\"\"\n\ndef broken(:\n    pass\n";
        let err = extract_declarations(source, Path::new("bad.py")).unwrap_err();
        match err {
            ExtractError::Parse { path, line, .. } => {
                assert_eq!(path, Path::new("bad.py"));
                assert_eq!(line, 4);
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }
}
