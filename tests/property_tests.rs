//! Property-based tests for extraction, classification and identifiers.
//!
//! Uses proptest to generate random inputs and verify invariants hold.

use cidex::cid::{docstring_headline, strip_name};
use cidex::*;
use proptest::prelude::*;
use std::path::{Path, PathBuf};

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// Generate valid Python identifiers that are not keywords
fn python_identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}".prop_filter("must not be a keyword", |s| {
        ![
            "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
            "elif", "else", "except", "exec", "finally", "for", "from", "global", "if", "import",
            "in", "is", "lambda", "nonlocal", "not", "or", "pass", "print", "raise", "return",
            "try", "while", "with", "yield", "match", "case", "type",
        ]
        .contains(&s.as_str())
    })
}

/// Generate simple annotations
fn annotation() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        Just("int".to_string()),
        Just("str".to_string()),
        Just("List[int]".to_string()),
        Just("Optional[str]".to_string()),
        Just("typing.Any".to_string()),
    ])
}

/// Docstring text without quotes or backslashes
fn doc_text() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ,.]{0,30}"
}

#[derive(Debug, Clone)]
struct GeneratedFunction {
    name: String,
    params: Vec<(String, Option<String>)>,
    returns: Option<String>,
    doc: Option<String>,
    is_async: bool,
}

impl GeneratedFunction {
    fn render(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, ann)| match ann {
                Some(ann) => format!("{name}: {ann}"),
                None => name.clone(),
            })
            .collect();
        let mut header = format!(
            "{}def {}({})",
            if self.is_async { "async " } else { "" },
            self.name,
            params.join(", ")
        );
        if let Some(ret) = &self.returns {
            header.push_str(&format!(" -> {ret}"));
        }
        header.push(':');

        let mut out = header;
        out.push('\n');
        if let Some(doc) = &self.doc {
            out.push_str(&format!("    \"\"\"{doc}\"\"\"\n"));
        }
        out.push_str("    return None\n");
        out
    }

    fn expected_signature(&self) -> String {
        self.render().lines().next().unwrap_or_default().to_string()
    }
}

fn generated_function() -> impl Strategy<Value = GeneratedFunction> {
    (
        python_identifier(),
        prop::collection::vec((python_identifier(), annotation()), 0..4),
        annotation(),
        prop::option::of(doc_text()),
        any::<bool>(),
    )
        .prop_map(|(name, mut params, returns, doc, is_async)| {
            // Parameter names must be unique within one signature.
            let mut seen = std::collections::HashSet::new();
            params.retain(|(p, _)| seen.insert(p.clone()));
            GeneratedFunction {
                name,
                params,
                returns,
                doc,
                is_async,
            }
        })
}

fn record_strategy() -> impl Strategy<Value = DeclarationRecord> {
    (
        python_identifier(),
        prop::option::of("[ \\t]{0,2}[A-Za-z ]{0,10}"),
        prop::collection::vec(
            prop_oneof![
                Just("staticmethod".to_string()),
                Just("classmethod".to_string()),
                Just("property".to_string()),
                Just("functools.wraps(f)".to_string()),
            ],
            0..2,
        ),
        prop::option::of(prop_oneof![
            Just("self".to_string()),
            Just("cls".to_string()),
            Just("value".to_string()),
        ]),
        "[ \\t]{0,4}",
    )
        .prop_map(|(name, docstring, decorators, first, indent)| {
            let params: Vec<Parameter> = first
                .iter()
                .map(|p| Parameter {
                    name: p.clone(),
                    annotation: None,
                    kind: ParameterKind::Positional,
                })
                .collect();
            let first = first.unwrap_or_default();
            DeclarationRecord {
                signature: format!("def {name}({first}):"),
                source: format!("{indent}def {name}({first}):\n{indent}    pass"),
                name,
                kind: DeclarationKind::Function,
                shape: DeclarationShape::Callable {
                    parameters: params,
                    returns: None,
                },
                docstring,
                start_line: 1,
                end_line: 2,
                is_async: false,
                decorators,
                nested: false,
            }
        })
}

// ============================================================================
// Extraction Properties
// ============================================================================

proptest! {
    /// Every generated top-level function is extracted with its exact header.
    #[test]
    fn prop_extraction_complete(functions in prop::collection::vec(generated_function(), 1..5)) {
        let source: String = functions
            .iter()
            .map(|f| f.render())
            .collect::<Vec<_>>()
            .join("\n");
        let records = extract_declarations(&source, Path::new("gen.py")).unwrap();

        prop_assert_eq!(records.len(), functions.len());
        for (record, function) in records.iter().zip(&functions) {
            prop_assert_eq!(&record.name, &function.name);
            prop_assert_eq!(record.signature.clone(), function.expected_signature());
            prop_assert_eq!(record.is_async, function.is_async);
            prop_assert_eq!(record.docstring.clone(), function.doc.as_ref().map(|d| d.trim_matches('\n').to_string()));
            let expected_kind = if function.is_async {
                DeclarationKind::Coroutine
            } else {
                DeclarationKind::Function
            };
            prop_assert_eq!(record.kind, expected_kind);
        }
    }

    /// Extraction is a pure function of the source text.
    #[test]
    fn prop_extraction_deterministic(function in generated_function()) {
        let source = function.render();
        let first = extract_declarations(&source, Path::new("a.py")).unwrap();
        let second = extract_declarations(&source, Path::new("b.py")).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ============================================================================
// Classification Properties
// ============================================================================

proptest! {
    /// Classification always yields a verdict, and acceptance implies every
    /// eligibility condition holds.
    #[test]
    fn prop_classification_total(record in record_strategy()) {
        let verdict = classify(&record);
        if verdict.is_accepted() {
            prop_assert!(record.docstring.as_deref().is_some_and(|d| !d.trim().is_empty()));
            prop_assert!(!record.decorators.iter().any(|d| d == "staticmethod" || d == "classmethod" || d == "property"));
            prop_assert!(record
                .shape
                .first_parameter()
                .is_none_or(|p| p.name != "self" && p.name != "cls"));
            prop_assert!(!record.source.starts_with(' ') && !record.source.starts_with('\t'));
        }
        prop_assert_eq!(classify(&record), verdict);
    }

    /// A missing or blank docstring always wins over other rejections.
    #[test]
    fn prop_blank_docstring_rejected(mut record in record_strategy(), blank in "[ \\t\\n]{0,4}") {
        record.docstring = Some(blank);
        prop_assert_eq!(classify(&record), Verdict::Rejected(RejectReason::NoDocstring));
    }
}

// ============================================================================
// Identifier Properties
// ============================================================================

proptest! {
    /// Identifiers are deterministic and well-formed.
    #[test]
    fn prop_cid_deterministic(content in ".{0,200}") {
        let engine = CidEngine::new();
        let a = engine.cid_for(&content).unwrap();
        let b = engine.cid_for(&content).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert!(a.starts_with("bafkrei"));
        prop_assert_eq!(a.len(), 59);
    }

    /// The full CID ignores location; the interface CID doesn't.
    #[test]
    fn prop_location_feeds_interface_only(
        function in generated_function(),
        dir_a in python_identifier(),
        dir_b in python_identifier(),
    ) {
        prop_assume!(dir_a != dir_b);
        let record = &extract_declarations(&function.render(), Path::new("m.py")).unwrap()[0];
        let root = PathBuf::from("/work");
        let assembler = EntryAssembler::new(&root).with_tagger(None);

        let a = assembler.assemble(record, &root.join(&dir_a).join("m.py")).unwrap();
        let b = assembler.assemble(record, &root.join(&dir_b).join("m.py")).unwrap();
        prop_assert_eq!(&a.cid, &b.cid);
        prop_assert_ne!(&a.metadata.cid, &b.metadata.cid);
    }

    /// Assembling the same record at the same path twice gives byte-identical
    /// entries, even from separately built assemblers.
    #[test]
    fn prop_assembly_idempotent(
        function in generated_function(),
        dirs in prop::collection::vec(python_identifier(), 0..3),
        file in python_identifier(),
    ) {
        let records = extract_declarations(&function.render(), Path::new("m.py")).unwrap();
        let record = &records[0];
        let root = PathBuf::from("/work");
        let mut path = root.clone();
        path.extend(&dirs);
        path.push(format!("{file}.py"));

        let first = EntryAssembler::new(&root).assemble(record, &path).unwrap();
        let second = EntryAssembler::new(&root).assemble(record, &path).unwrap();
        prop_assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );

        let assembler = EntryAssembler::new(&root);
        let again = assembler.assemble(record, &path).unwrap();
        prop_assert_eq!(&again, &assembler.assemble(record, &path).unwrap());
        prop_assert_eq!(&again, &first);
    }

    /// The interface CID only sees the first docstring line.
    #[test]
    fn prop_interface_ignores_docstring_body(head in doc_text(), tail_a in doc_text(), tail_b in doc_text()) {
        let engine = CidEngine::new();
        let doc_a = format!("{head}\n\n{tail_a}");
        let doc_b = format!("{head}\n\n{tail_b}");
        prop_assert_eq!(docstring_headline(&doc_a), head.trim());
        let a = engine.interface_cid("def f(x):", &doc_a, DeclarationKind::Function, "p/m.py").unwrap();
        let b = engine.interface_cid("def f(x):", &doc_b, DeclarationKind::Function, "p/m.py").unwrap();
        prop_assert_eq!(a, b);
    }

    /// Renaming a function leaves its interface shape unchanged.
    #[test]
    fn prop_strip_name_drops_only_the_name(a in python_identifier(), b in python_identifier(), params in "[a-z, ]{0,10}") {
        let sig_a = format!("def {a}({params}):");
        let sig_b = format!("def {b}({params}):");
        prop_assert_eq!(strip_name(&sig_a), strip_name(&sig_b));
        prop_assert!(strip_name(&sig_a).starts_with('('));
    }
}
