//! Run configuration.
//!
//! Layers, lowest precedence first: built-in defaults, the optional
//! `.cidex/config.json` under the working root, `CIDEX_*` environment
//! variables, then command-line flags.

use crate::catalog::{CATALOG_DIR, default_catalog_path};
use crate::discovery::FileDiscovery;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

pub const ENV_WORKSPACE: &str = "CIDEX_WORKSPACE";
pub const ENV_CATALOG: &str = "CIDEX_CATALOG";
pub const ENV_JOBS: &str = "CIDEX_JOBS";

/// Settings for one indexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory to scan; also the base for relative paths and tags
    pub root: PathBuf,

    #[serde(default)]
    pub recursive: bool,

    #[serde(default)]
    pub dry_run: bool,

    /// Exclusion patterns added to the discovery defaults
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Catalog file; defaults to `.cidex/catalog.json` under the root
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Files processed concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            recursive: false,
            dry_run: false,
            exclude: Vec::new(),
            catalog_path: None,
            jobs: default_jobs(),
        }
    }
}

/// The subset of settings a config file may provide.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLayer {
    recursive: Option<bool>,
    exclude: Option<Vec<String>>,
    catalog_path: Option<PathBuf>,
    jobs: Option<usize>,
}

/// Command-line values; `None` leaves the lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub recursive: Option<bool>,
    pub dry_run: Option<bool>,
    pub exclude: Vec<String>,
    pub catalog_path: Option<PathBuf>,
    pub jobs: Option<usize>,
}

impl IndexConfig {
    /// Resolve configuration from every layer using the process environment.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        Self::load_with_env(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn load_with_env(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let root = match overrides.root.clone().or_else(|| env(ENV_WORKSPACE).map(PathBuf::from)) {
            Some(root) => root,
            None => std::env::current_dir().context("Failed to determine working directory")?,
        };
        let root = resolve_root(&root)?;

        let mut config = Self {
            root,
            ..Self::default()
        };

        if let Some(layer) = read_file_layer(&config.root)? {
            config.apply_file(layer);
        }
        config.apply_env(&env)?;
        config.apply_overrides(overrides);

        if config.jobs == 0 {
            config.jobs = 1;
        }
        Ok(config)
    }

    fn apply_file(&mut self, layer: FileLayer) {
        if let Some(recursive) = layer.recursive {
            self.recursive = recursive;
        }
        if let Some(exclude) = layer.exclude {
            self.add_excludes(exclude);
        }
        if layer.catalog_path.is_some() {
            self.catalog_path = layer.catalog_path;
        }
        if let Some(jobs) = layer.jobs {
            self.jobs = jobs;
        }
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(catalog) = env(ENV_CATALOG).filter(|v| !v.is_empty()) {
            self.catalog_path = Some(PathBuf::from(catalog));
        }
        if let Some(jobs) = env(ENV_JOBS).filter(|v| !v.is_empty()) {
            self.jobs = jobs
                .trim()
                .parse()
                .with_context(|| format!("Invalid {ENV_JOBS}: {jobs}"))?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(recursive) = overrides.recursive {
            self.recursive = recursive;
        }
        if let Some(dry_run) = overrides.dry_run {
            self.dry_run = dry_run;
        }
        self.add_excludes(overrides.exclude);
        if overrides.catalog_path.is_some() {
            self.catalog_path = overrides.catalog_path;
        }
        if let Some(jobs) = overrides.jobs {
            self.jobs = jobs;
        }
    }

    /// Append patterns, skipping ones already present.
    fn add_excludes(&mut self, patterns: impl IntoIterator<Item = String>) {
        for pattern in patterns {
            if !self.exclude.contains(&pattern) {
                self.exclude.push(pattern);
            }
        }
    }

    /// Catalog file for this run.
    pub fn catalog_file(&self) -> PathBuf {
        match &self.catalog_path {
            Some(path) => path.clone(),
            None => default_catalog_path(&self.root),
        }
    }

    /// File discovery configured for this run.
    pub fn discovery(&self) -> FileDiscovery {
        FileDiscovery::new()
            .recursive(self.recursive)
            .with_excludes(self.exclude.iter().cloned())
            .with_exclude(CATALOG_DIR)
    }
}

/// Absolute, symlink-free form of `root`, matching the paths discovery yields.
///
/// A root that does not exist is made absolute but otherwise kept.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    match root.canonicalize() {
        Ok(canonical) => Ok(canonical),
        Err(_) => std::path::absolute(root)
            .with_context(|| format!("Failed to resolve root: {}", root.display())),
    }
}

/// Path of the optional config file under `root`.
pub fn config_file(root: &Path) -> PathBuf {
    root.join(CATALOG_DIR).join(CONFIG_FILE)
}

fn read_file_layer(root: &Path) -> Result<Option<FileLayer>> {
    let path = config_file(root);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let layer = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(layer))
}
