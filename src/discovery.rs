//! File discovery module.
//!
//! Finds Python source files under a root, skipping virtual environments,
//! build output and any user-supplied exclusion patterns.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Patterns excluded unless discovery is built without defaults.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "__pycache__",
    ".git",
    "venv",
    ".venv",
    "node_modules",
    ".pytest_cache",
    "build",
    "dist",
    ".env*",
    "python_embeded",
    "python_embedded",
    ".vscode",
    ".vs",
];

/// Discovers Python files under a root directory.
pub struct FileDiscovery {
    /// Scan subdirectories
    recursive: bool,
    /// Additional exclude patterns
    exclude_patterns: Vec<String>,
    /// Whether to apply default excludes
    default_excludes: bool,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self {
            recursive: false,
            exclude_patterns: Vec::new(),
            default_excludes: true,
        }
    }
}

impl FileDiscovery {
    /// Non-recursive discovery with the default excludes.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Add an exclude pattern.
    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.exclude_patterns.push(pattern.to_string());
        self
    }

    /// Add several exclude patterns.
    pub fn with_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Disable default excludes.
    pub fn without_default_excludes(mut self) -> Self {
        self.default_excludes = false;
        self
    }

    /// Effective exclusion patterns: defaults first, then user patterns,
    /// without duplicates.
    pub fn exclude_patterns(&self) -> Vec<String> {
        let defaults = if self.default_excludes {
            DEFAULT_EXCLUDES
        } else {
            &[]
        };
        let mut seen = BTreeSet::new();
        defaults
            .iter()
            .map(|p| p.to_string())
            .chain(self.exclude_patterns.iter().cloned())
            .filter(|p| !p.trim().is_empty() && seen.insert(p.clone()))
            .collect()
    }

    /// Discover all Python files under `root`.
    ///
    /// Paths are absolute, symlink-free and sorted. Symlinks are followed;
    /// a link is kept as its target, and only if that target lies under
    /// `root` and is not excluded. A missing root yields no files.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            tracing::warn!("Not a directory: {}", root.display());
            return Ok(Vec::new());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", root.display()))?;

        let excludes = Arc::new(ExcludeSet::new(&self.exclude_patterns())?);

        let filter_root = root.clone();
        let filter_excludes = Arc::clone(&excludes);
        let walker = WalkBuilder::new(&root)
            .max_depth(if self.recursive { None } else { Some(1) })
            .standard_filters(false)
            .follow_links(true)
            .filter_entry(move |entry| {
                let rel = entry.path().strip_prefix(&filter_root).unwrap_or(entry.path());
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                rel.as_os_str().is_empty() || !filter_excludes.is_match(rel, is_dir)
            })
            .build();

        let mut files = BTreeSet::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let is_file = entry.file_type().is_some_and(|t| t.is_file());
            if !is_file || !self.should_include(entry.path()) {
                continue;
            }
            let resolved = match entry.path().canonicalize() {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::debug!("Skipping unresolvable {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            // Links may point outside the root or into an excluded directory.
            match resolved.strip_prefix(&root) {
                Ok(rel) if !excludes.is_match(rel, false) && !excludes.excludes_parent(rel) => {
                    files.insert(resolved);
                }
                _ => tracing::debug!("Skipping link target {}", resolved.display()),
            }
        }

        tracing::debug!("Discovered {} Python files under {}", files.len(), root.display());
        Ok(files.into_iter().collect())
    }

    /// Check if a file should be included based on extension.
    pub fn should_include(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "py")
    }
}

/// Compiled exclusion patterns, gitignore style.
///
/// A pattern with no `/` except a trailing one matches at any depth; any
/// other `/` anchors it at the root. A trailing `/` restricts it to
/// directories.
struct ExcludeSet {
    any: GlobSet,
    dirs: GlobSet,
}

impl ExcludeSet {
    fn new(patterns: &[String]) -> Result<Self> {
        let mut any = GlobSetBuilder::new();
        let mut dirs = GlobSetBuilder::new();
        for pattern in patterns {
            let dir_only = pattern.ends_with('/');
            let body = pattern.trim_end_matches('/');
            let glob = if body.contains('/') {
                body.trim_start_matches('/').to_string()
            } else {
                format!("**/{body}")
            };
            let compiled = GlobBuilder::new(&glob)
                .literal_separator(true)
                .build()
                .with_context(|| format!("Invalid exclude pattern: {pattern}"))?;
            if dir_only {
                dirs.add(compiled);
            } else {
                any.add(compiled);
            }
        }
        Ok(Self {
            any: any.build()?,
            dirs: dirs.build()?,
        })
    }

    fn is_match(&self, rel: &Path, is_dir: bool) -> bool {
        self.any.is_match(rel) || (is_dir && self.dirs.is_match(rel))
    }

    /// Whether any directory above `rel` is excluded.
    fn excludes_parent(&self, rel: &Path) -> bool {
        rel.ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .any(|dir| self.is_match(dir, true))
    }
}
