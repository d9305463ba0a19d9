//! End-to-end tests for extraction, classification and entry assembly.

use cidex::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};

fn extract(source: &str) -> Vec<DeclarationRecord> {
    extract_declarations(source, Path::new("scenario.py")).expect("source should parse")
}

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, content).expect("write fixture");
    path
}

const GREET: &str = r#"def greet(name: str) -> str:
    """Hi."""
    return f"hi {name}"
"#;

#[test]
fn scenario_a_plain_function() {
    let records = extract(GREET);
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.name, "greet");
    assert_eq!(record.kind, DeclarationKind::Function);
    assert_eq!(record.signature, "def greet(name: str) -> str:");
    assert_eq!(record.docstring.as_deref(), Some("Hi."));
    assert!(!record.is_async);
    assert_eq!(
        record.source,
        "def greet(name: str) -> str:\n    \"\"\"Hi.\"\"\"\n    return f\"hi {name}\""
    );
    assert_eq!((record.start_line, record.end_line), (1, 3));
    assert_eq!(classify(record), Verdict::Accepted);
}

#[test]
fn scenario_b_coroutine() {
    let source = "async def fetch(u: str) -> dict:\n    \"\"\"Fetch.\"\"\"\n    return {}\n";
    let records = extract(source);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, DeclarationKind::Coroutine);
    assert!(records[0].is_async);
    assert!(records[0].signature.starts_with("async def fetch("));
    assert_eq!(records[0].signature, "async def fetch(u: str) -> dict:");
}

#[test]
fn scenario_c_generator() {
    let source = "def gen(n):\n    \"\"\"G.\"\"\"\n    for i in range(n):\n        yield i\n";
    let records = extract(source);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, DeclarationKind::Generator);
    assert_eq!(records[0].signature, "def gen(n):");
}

#[test]
fn scenario_d_rejections() {
    let source = "def bare(x):\n    return x\n\ndef method(self):\n    \"\"\"Looks like a method.\"\"\"\n";
    let records = extract(source);
    assert_eq!(records.len(), 2);
    assert_eq!(
        classify(&records[0]),
        Verdict::Rejected(RejectReason::NoDocstring)
    );
    assert_eq!(
        classify(&records[1]),
        Verdict::Rejected(RejectReason::NotStandalone)
    );

    let mut indented = records[1].clone();
    indented.source = "    def method(self):\n        \"\"\"Looks like a method.\"\"\"".to_string();
    assert_eq!(
        classify(&indented),
        Verdict::Rejected(RejectReason::NotStandalone)
    );
}

#[test]
fn scenario_e_same_code_two_locations() {
    let root = PathBuf::from("/work");
    let assembler = EntryAssembler::new(&root);
    let record = &extract(GREET)[0];

    let first = assembler
        .assemble(record, &root.join("alpha/hello.py"))
        .expect("assemble");
    let second = assembler
        .assemble(record, &root.join("beta/hello.py"))
        .expect("assemble");

    assert_eq!(first.cid, second.cid);
    assert_ne!(first.metadata.cid, second.metadata.cid);
    assert_eq!(first.metadata.file_path, "alpha/hello.py");
    assert_eq!(second.metadata.file_path, "beta/hello.py");
}

#[test]
fn methods_and_nested_definitions_are_not_extracted() {
    let source = r#"
class Greeter(object):
    """Greets people."""

    def greet(self, name):
        """Say hello."""
        def inner():
            """Inner."""
        return name

    @staticmethod
    def helper():
        """Static."""
"#;
    let records = extract(source);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Greeter");
    assert_eq!(records[0].signature, "class Greeter(object):");
    assert_eq!(classify(&records[0]), Verdict::Accepted);
}

#[test]
fn property_decorator_is_rejected() {
    let source = "@property\ndef value():\n    \"\"\"Value.\"\"\"\n    return 1\n";
    let records = extract(source);
    assert_eq!(records[0].decorators, vec!["property"]);
    assert_eq!(records[0].start_line, 1);
    assert!(records[0].source.starts_with("@property\n"));
    assert_eq!(
        classify(&records[0]),
        Verdict::Rejected(RejectReason::NotStandalone)
    );
}

#[test]
fn syntax_error_yields_no_records() {
    let source = "def ok():\n    \"\"\"Fine.\"\"\"\n\nclass Broken(\n";
    let err = extract_declarations(source, Path::new("broken.py")).unwrap_err();
    assert!(matches!(err, ExtractError::Parse { .. }));
    assert!(err.to_string().contains("broken.py"));
}

#[tokio::test]
async fn index_directory_into_json_catalog() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().canonicalize().expect("canonical root");

    write(&root, "greetings/hello.py", GREET);
    write(
        &root,
        "greetings/tests/test_hello.py",
        "def test_greet():\n    \"\"\"Greets.\"\"\"\n    assert True\n",
    );
    write(&root, "greetings/broken.py", "def nope(:\n");
    write(&root, "venv/lib/site.py", GREET);

    let config = IndexConfig::load_with_env(
        ConfigOverrides {
            root: Some(root.clone()),
            recursive: Some(true),
            ..Default::default()
        },
        |_| None,
    )
    .expect("config");

    let catalog = JsonCatalog::open(config.catalog_file()).expect("catalog");
    let indexer = Indexer::new(EntryAssembler::new(&root)).with_jobs(2);
    let stats = indexer.index(&config, &catalog).await.expect("index");

    assert_eq!(stats.files_scanned, 3);
    assert_eq!(stats.callables_found, 2);
    assert_eq!(stats.new_uploads, 2);
    assert_eq!(stats.parse_errors.len(), 1);
    assert_eq!(stats.exit_code(), 1);
    assert_eq!(catalog.len(), 2);

    let reopened = JsonCatalog::open(config.catalog_file()).expect("reopen");
    assert_eq!(reopened.len(), 2);

    let again = indexer.index(&config, &reopened).await.expect("reindex");
    assert_eq!(again.new_uploads, 0);
    assert_eq!(again.skipped_duplicates, 2);
}

#[test]
fn entry_metadata_for_test_file() {
    let root = PathBuf::from("/work");
    let source = "def check_sum():\n    \"\"\"Checks.\"\"\"\n";
    let record = &extract(source)[0];
    let entry = EntryAssembler::new(&root)
        .assemble(record, &root.join("src/tests/math_checks.py"))
        .expect("assemble");

    assert!(entry.metadata.is_test);
    assert_eq!(entry.metadata.code_type, DeclarationKind::Function);
    assert_eq!(entry.metadata.code_cid, entry.cid);
    assert_eq!(entry.metadata.tags, vec!["math_checks.py", "tests"]);
}

#[tokio::test]
async fn non_canonical_root_yields_root_relative_paths() {
    let temp = tempfile::tempdir().expect("tempdir");
    let canonical = temp.path().canonicalize().expect("canonical root");
    write(&canonical, "pkg/m.py", GREET);

    // Same directory, spelled so that it is not a prefix of discovered paths.
    let indirect = canonical.join("pkg").join("..");
    let config = IndexConfig::load_with_env(
        ConfigOverrides {
            root: Some(indirect.clone()),
            recursive: Some(true),
            ..Default::default()
        },
        |_| None,
    )
    .expect("config");
    assert_eq!(config.root, canonical);

    let catalog = MemoryCatalog::new();
    let stats = Indexer::new(EntryAssembler::new(&indirect))
        .index(&config, &catalog)
        .await
        .expect("index");
    assert_eq!(stats.new_uploads, 1);

    let metadata = catalog.metadata();
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata[0].file_path, "pkg/m.py");
    assert_eq!(metadata[0].tags, vec!["m.py", "pkg"]);

    let expected = EntryAssembler::new(&canonical)
        .assemble(&extract(GREET)[0], &canonical.join("pkg/m.py"))
        .expect("assemble");
    assert_eq!(metadata[0].cid, expected.metadata.cid);
}
