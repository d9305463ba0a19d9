//! Eligibility classification.
//!
//! Decides whether a declaration is a standalone, documented unit worth
//! cataloguing. Rules are evaluated in order and the first match wins.

use crate::types::{DeclarationKind, DeclarationRecord, RejectReason, Verdict};
use regex::Regex;

/// Name given to anonymous function literals.
pub const LAMBDA_NAME: &str = "<lambda>";

/// Decorators that only make sense on class members.
pub const METHOD_DECORATORS: &[&str] = &["staticmethod", "classmethod", "property"];

/// Classify a declaration record.
pub fn classify(record: &DeclarationRecord) -> Verdict {
    if record.name == LAMBDA_NAME {
        return Verdict::Rejected(RejectReason::NotStandalone);
    }

    let documented = record
        .docstring
        .as_deref()
        .is_some_and(|doc| !doc.trim().is_empty());
    if !documented {
        return Verdict::Rejected(RejectReason::NoDocstring);
    }

    if record
        .decorators
        .iter()
        .any(|d| METHOD_DECORATORS.contains(&d.as_str()))
    {
        return Verdict::Rejected(RejectReason::NotStandalone);
    }

    if record.kind.is_callable()
        && record
            .shape
            .first_parameter()
            .is_some_and(|p| p.name == "self" || p.name == "cls")
    {
        return Verdict::Rejected(RejectReason::NotStandalone);
    }

    if record.nested || definition_line_indented(record) {
        return Verdict::Rejected(RejectReason::NotStandalone);
    }

    Verdict::Accepted
}

/// Whether the line declaring `record.name` inside its own source is indented.
///
/// Returns false when no declaring line can be found.
pub fn definition_line_indented(record: &DeclarationRecord) -> bool {
    let Some(pattern) = definition_pattern(record.kind, &record.name) else {
        return false;
    };
    record
        .source
        .split('\n')
        .find(|line| pattern.is_match(line))
        .is_some_and(|line| line.starts_with(' ') || line.starts_with('\t'))
}

fn definition_pattern(kind: DeclarationKind, name: &str) -> Option<Regex> {
    let name = regex::escape(name);
    let pattern = match kind {
        DeclarationKind::Class => format!(r"class\s+{name}\s*[:(]"),
        _ => format!(r"(async\s+)?def\s+{name}\s*\("),
    };
    Regex::new(&pattern).ok()
}
