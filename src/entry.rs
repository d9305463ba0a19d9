//! Entry assembly.
//!
//! Turns an accepted declaration record into a catalog entry: identifiers,
//! root-relative location, test detection and path tags.

use crate::cid::CidEngine;
use crate::error::CidError;
use crate::tags::{PosTagger, derive_tags, shared_tagger};
use crate::types::{DeclarationRecord, Entry, EntryMetadata};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Builds entries relative to a fixed working root.
#[derive(Clone)]
pub struct EntryAssembler {
    root: PathBuf,
    cids: CidEngine,
    tagger: Option<Arc<dyn PosTagger>>,
}

impl EntryAssembler {
    /// Assembler using the process-wide default tagger.
    ///
    /// An existing `root` is canonicalized so it lines up with discovered
    /// paths; a missing one is used as given.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root,
            cids: CidEngine::new(),
            tagger: Some(shared_tagger()),
        }
    }

    /// Replace the part-of-speech tagger. `None` keeps every path token.
    pub fn with_tagger(mut self, tagger: Option<Arc<dyn PosTagger>>) -> Self {
        self.tagger = tagger;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Assemble an entry for an accepted record found in `path`.
    pub fn assemble(&self, record: &DeclarationRecord, path: &Path) -> Result<Entry, CidError> {
        let code_cid = self.cids.full_cid(record)?;

        let file_path = relative_path(path, &self.root);
        let docstring = record.docstring_or_empty().to_string();
        let interface_cid =
            self.cids
                .interface_cid(&record.signature, &docstring, record.kind, &file_path)?;

        let metadata = EntryMetadata {
            cid: interface_cid,
            code_cid: code_cid.clone(),
            code_name: record.name.clone(),
            code_type: record.kind,
            is_test: is_test(&record.name, path),
            file_path,
            tags: derive_tags(path, &self.root, self.tagger.as_deref()),
        };

        Ok(Entry {
            cid: code_cid,
            signature: record.signature.clone(),
            docstring,
            source: record.source.clone(),
            metadata,
        })
    }
}

impl std::fmt::Debug for EntryAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryAssembler")
            .field("root", &self.root)
            .field("tagger", &self.tagger.is_some())
            .finish()
    }
}

/// `path` relative to `root`, with forward slashes.
///
/// A path outside `root` loses its root or drive prefix instead.
pub fn relative_path(path: &Path, root: &Path) -> String {
    let relative: PathBuf = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path
            .components()
            .filter(|c| !matches!(c, Component::Prefix(_) | Component::RootDir))
            .collect(),
    };
    relative.to_string_lossy().replace('\\', "/")
}

/// Whether a declaration looks like test code, by name or location.
pub fn is_test(name: &str, path: &Path) -> bool {
    if name.starts_with("test_") || name.ends_with("_test") {
        return true;
    }
    path.components().any(|component| match component {
        Component::Normal(part) => part == "test" || part == "tests",
        _ => false,
    })
}
