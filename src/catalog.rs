//! Entry persistence.
//!
//! A catalog keeps two tables:
//! - content records keyed by full CID (one per distinct implementation)
//! - metadata records keyed by interface CID (one per contract and location)
//!
//! An insert writes both or neither. File-backed catalogs buffer inserts
//! in memory until [`Catalog::flush`].

use crate::error::CatalogError;
use crate::types::{Entry, EntryMetadata};
use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CATALOG_DIR: &str = ".cidex";
pub const CATALOG_FILE: &str = "catalog.json";

/// Default catalog location under a working root.
pub fn default_catalog_path(root: &Path) -> PathBuf {
    root.join(CATALOG_DIR).join(CATALOG_FILE)
}

/// Result of [`Catalog::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    /// The interface CID was already present; nothing was written.
    Duplicate,
}

/// Storage for catalog entries.
pub trait Catalog: Send + Sync {
    /// Whether a metadata record exists for this interface CID.
    fn contains(&self, interface_cid: &str) -> Result<bool, CatalogError>;

    /// Store an entry's content and metadata records together.
    fn insert(&self, entry: &Entry) -> Result<InsertOutcome, CatalogError>;

    /// Number of stored content records.
    fn len(&self) -> usize;

    /// Make buffered inserts durable.
    fn flush(&self) -> Result<(), CatalogError> {
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Content record: the code itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub cid: String,
    pub signature: String,
    pub docstring: String,
    pub source: String,
}

impl From<&Entry> for CodeRecord {
    fn from(entry: &Entry) -> Self {
        Self {
            cid: entry.cid.clone(),
            signature: entry.signature.clone(),
            docstring: entry.docstring.clone(),
            source: entry.source.clone(),
        }
    }
}

/// Both tables, as held in memory and serialized to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogTables {
    pub codes: BTreeMap<String, CodeRecord>,
    pub metadata: BTreeMap<String, EntryMetadata>,
}

impl CatalogTables {
    /// Insert both records in place.
    ///
    /// All checks run before either table is touched, so a rejected insert
    /// leaves the tables unchanged.
    fn insert(&mut self, entry: &Entry) -> Result<InsertOutcome, CatalogError> {
        if self.metadata.contains_key(&entry.metadata.cid) {
            return Ok(InsertOutcome::Duplicate);
        }

        match self.codes.get(&entry.cid) {
            Some(existing) => {
                if existing.signature != entry.signature
                    || existing.docstring != entry.docstring
                    || existing.source != entry.source
                {
                    return Err(CatalogError::Conflict(entry.cid.clone()));
                }
            }
            None => {
                self.codes.insert(entry.cid.clone(), CodeRecord::from(entry));
            }
        }
        self.metadata
            .insert(entry.metadata.cid.clone(), entry.metadata.clone());
        Ok(InsertOutcome::Inserted)
    }
}

// ============================================================================
// In-memory catalog
// ============================================================================

/// Catalog held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<CatalogTables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored metadata records.
    pub fn metadata(&self) -> Vec<EntryMetadata> {
        self.tables.read().metadata.values().cloned().collect()
    }
}

impl Catalog for MemoryCatalog {
    fn contains(&self, interface_cid: &str) -> Result<bool, CatalogError> {
        Ok(self.tables.read().metadata.contains_key(interface_cid))
    }

    fn insert(&self, entry: &Entry) -> Result<InsertOutcome, CatalogError> {
        self.tables.write().insert(entry)
    }

    fn len(&self) -> usize {
        self.tables.read().codes.len()
    }
}

// ============================================================================
// JSON file catalog
// ============================================================================

/// Catalog persisted as a single JSON document.
///
/// Inserts only touch memory. [`Catalog::flush`] rewrites the file through a
/// temporary sibling and a rename, so readers see either the old or the new
/// document.
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    state: RwLock<JsonState>,
}

#[derive(Debug, Default)]
struct JsonState {
    tables: CatalogTables,
    dirty: bool,
}

impl JsonCatalog {
    /// Open the catalog at `path`, starting empty if the file doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let tables = if path.exists() {
            let data = fs::read(&path)
                .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
            serde_json::from_slice(&data)
                .with_context(|| format!("Failed to parse catalog: {}", path.display()))?
        } else {
            CatalogTables::default()
        };

        tracing::debug!(
            "Opened catalog {} ({} code entries)",
            path.display(),
            tables.codes.len()
        );
        Ok(Self {
            path,
            state: RwLock::new(JsonState {
                tables,
                dirty: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are inserts not yet written to disk.
    pub fn has_pending(&self) -> bool {
        self.state.read().dirty
    }

    fn persist(&self, tables: &CatalogTables) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(tables)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Catalog for JsonCatalog {
    fn contains(&self, interface_cid: &str) -> Result<bool, CatalogError> {
        Ok(self.state.read().tables.metadata.contains_key(interface_cid))
    }

    fn insert(&self, entry: &Entry) -> Result<InsertOutcome, CatalogError> {
        let mut state = self.state.write();
        let outcome = state.tables.insert(entry)?;
        if outcome == InsertOutcome::Inserted {
            state.dirty = true;
        }
        Ok(outcome)
    }

    fn len(&self) -> usize {
        self.state.read().tables.codes.len()
    }

    fn flush(&self) -> Result<(), CatalogError> {
        let mut state = self.state.write();
        if !state.dirty {
            return Ok(());
        }
        self.persist(&state.tables)?;
        state.dirty = false;
        tracing::debug!(
            "Wrote catalog {} ({} code entries)",
            self.path.display(),
            state.tables.codes.len()
        );
        Ok(())
    }
}
