use crate::loader::is_declarative;
use crate::{
    build_catalog, load_records_file, ConfigurationError, RegisterCatalog, SourcedRecord,
    UnknownStrategyError,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Strategy used when none is named.
pub const DEFAULT_STRATEGY: &str = "directory";

/// A catalog together with every per-entry problem met while building it.
pub type CatalogBuild = (RegisterCatalog, Vec<ConfigurationError>);

/// Produces register records from one kind of source.
///
/// Implementations must not fail as a whole: each unreadable or malformed piece of a
/// source becomes one error and the rest is still returned.
pub trait CatalogStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self, source: &Path) -> (Vec<SourcedRecord>, Vec<ConfigurationError>);

    /// Load every source and resolve the records into a catalog.
    fn build(&self, sources: &[PathBuf]) -> CatalogBuild {
        let mut records = Vec::new();
        let mut errors = Vec::new();
        for source in sources {
            let (mut r, mut e) = self.load(source);
            records.append(&mut r);
            errors.append(&mut e);
        }
        let (catalog, mut build_errors) = build_catalog(records);
        errors.append(&mut build_errors);
        info!(
            strategy = self.name(),
            registers = catalog.len(),
            errors = errors.len(),
            "register catalog built"
        );
        (catalog, errors)
    }
}

/// Every `.json`, `.yaml` and `.yml` file directly inside a directory, in name order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryStrategy;

impl CatalogStrategy for DirectoryStrategy {
    fn name(&self) -> &str {
        "directory"
    }

    fn load(&self, dir: &Path) -> (Vec<SourcedRecord>, Vec<ConfigurationError>) {
        let mut records = Vec::new();
        let mut errors = Vec::new();
        let read = match fs::read_dir(dir) {
            Ok(read) => read,
            Err(e) => {
                errors.push(ConfigurationError::unreadable(
                    dir.display().to_string(),
                    format!("reading directory: {e}"),
                ));
                return (records, errors);
            }
        };

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in read {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && is_declarative(&path) {
                        files.push(path);
                    } else {
                        debug!(path = %path.display(), "ignoring non-declarative entry");
                    }
                }
                Err(e) => errors.push(ConfigurationError::unreadable(
                    dir.display().to_string(),
                    format!("listing directory: {e}"),
                )),
            }
        }
        files.sort();

        for path in files {
            let (mut r, mut e) = load_records_file(&path);
            records.append(&mut r);
            errors.append(&mut e);
        }
        (records, errors)
    }
}

/// A single declarative file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStrategy;

impl CatalogStrategy for FileStrategy {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, file: &Path) -> (Vec<SourcedRecord>, Vec<ConfigurationError>) {
        load_records_file(file)
    }
}

/// Maps strategy names to strategies.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn CatalogStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `directory` (also reachable as `ftp`) and `file`.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register("directory", DirectoryStrategy);
        reg.register("ftp", DirectoryStrategy);
        reg.register("file", FileStrategy);
        reg
    }

    /// Add or replace the strategy stored under `name`.
    pub fn register(&mut self, name: &str, strategy: impl CatalogStrategy + 'static) {
        self.strategies.insert(name.to_string(), Arc::new(strategy));
    }

    pub fn get(&self, name: &str) -> Result<&dyn CatalogStrategy, UnknownStrategyError> {
        self.strategies
            .get(name)
            .map(|s| &**s)
            .ok_or_else(|| UnknownStrategyError(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn build(
        &self,
        strategy: &str,
        sources: &[PathBuf],
    ) -> Result<CatalogBuild, UnknownStrategyError> {
        Ok(self.get(strategy)?.build(sources))
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

/// Load a catalog from one directory with the default strategy.
pub fn load_catalog_dir(dir: impl AsRef<Path>) -> CatalogBuild {
    DirectoryStrategy.build(&[dir.as_ref().to_path_buf()])
}
