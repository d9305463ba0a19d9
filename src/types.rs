//! Core types for the declaration catalog.
//!
//! This module defines the data structures shared by every stage:
//! - Extraction (declaration records)
//! - Classification (verdicts)
//! - Assembly (catalog entries)

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Extraction Types
// ============================================================================

/// Kind of top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Class,
    Coroutine,
    Generator,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Coroutine => "coroutine",
            Self::Generator => "generator",
        }
    }

    /// Functions, coroutines and generators take parameters; classes don't.
    pub fn is_callable(&self) -> bool {
        !matches!(self, Self::Class)
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a parameter in a callable's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Regular (including positional-only) parameter.
    Positional,
    /// `*args`
    VarPositional,
    /// Parameter declared after `*` or `*args`.
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

/// A declared parameter. Defaults are never kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<String>,
    pub kind: ParameterKind,
}

impl Parameter {
    /// Render as it appears in a canonical signature.
    pub fn render(&self) -> String {
        let prefix = match self.kind {
            ParameterKind::VarPositional => "*",
            ParameterKind::VarKeyword => "**",
            ParameterKind::Positional | ParameterKind::KeywordOnly => "",
        };
        match &self.annotation {
            Some(annotation) => format!("{}{}: {}", prefix, self.name, annotation),
            None => format!("{}{}", prefix, self.name),
        }
    }
}

/// Structural shape of a declaration.
///
/// Only callables carry parameters and a return annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum DeclarationShape {
    Callable {
        /// Parameters in canonical order: positional, `*args`, keyword-only, `**kwargs`.
        parameters: Vec<Parameter>,
        returns: Option<String>,
    },
    Class {
        bases: Vec<String>,
    },
}

impl DeclarationShape {
    /// First declared parameter, if this is a callable with any.
    pub fn first_parameter(&self) -> Option<&Parameter> {
        match self {
            Self::Callable { parameters, .. } => parameters.first(),
            Self::Class { .. } => None,
        }
    }
}

/// One top-level declaration pulled out of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclarationRecord {
    pub name: String,
    pub kind: DeclarationKind,
    pub shape: DeclarationShape,
    /// Single-line canonical rendering, e.g. `def greet(name: str) -> str:`
    pub signature: String,
    /// Normalized docstring, if the body starts with a bare string literal.
    pub docstring: Option<String>,
    /// Verbatim lines from the first decorator through the end of the body.
    pub source: String,
    /// 1-based line of the first decorator, or of the keyword if undecorated.
    pub start_line: usize,
    /// 1-based last line of the body.
    pub end_line: usize,
    pub is_async: bool,
    /// Rendered decorator expressions, in source order.
    pub decorators: Vec<String>,
    /// Set when the declaration lives inside another scope.
    ///
    /// The extractor only visits module-level statements, so records it
    /// produces always carry `false`.
    pub nested: bool,
}

impl DeclarationRecord {
    /// Docstring text, or the empty string.
    pub fn docstring_or_empty(&self) -> &str {
        self.docstring.as_deref().unwrap_or("")
    }
}

// ============================================================================
// Classification Types
// ============================================================================

/// Why a declaration was not catalogued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotStandalone,
    NoDocstring,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStandalone => "not standalone",
            Self::NoDocstring => "no docstring",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

// ============================================================================
// Catalog Types
// ============================================================================

/// Metadata block stored alongside catalogued code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Interface identifier.
    pub cid: String,
    /// Full-content identifier, same as [`Entry::cid`].
    pub code_cid: String,
    pub code_name: String,
    pub code_type: DeclarationKind,
    pub is_test: bool,
    /// Forward-slash path relative to the working root.
    pub file_path: String,
    /// Sorted, de-duplicated path tags.
    pub tags: Vec<String>,
}

/// A catalogued declaration, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Full-content identifier.
    pub cid: String,
    pub signature: String,
    /// Empty when the declaration had no docstring.
    pub docstring: String,
    pub source: String,
    pub metadata: EntryMetadata,
}
