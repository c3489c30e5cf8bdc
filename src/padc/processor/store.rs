//! Named boundary configurations kept between runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::boundary::BoundaryConfiguration;
use crate::error::{ProcessorError, Result};

/// Loads and stores boundary configurations by name.
pub trait ConfigStore {
    /// Loads the configuration saved under `name`. Unknown names are an error.
    fn load(&self, name: &str) -> Result<BoundaryConfiguration>;

    /// Saves `config` under its name, replacing any previous version.
    fn save(&mut self, config: &BoundaryConfiguration) -> Result<()>;

    /// Names of every stored configuration, sorted.
    fn names(&self) -> Result<Vec<String>>;
}

fn required_name(config: &BoundaryConfiguration) -> Result<&str> {
    config
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .ok_or(ProcessorError::UnnamedConfiguration)
}

/// Store keeping one JSON file per configuration in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|ch| {
                if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ' ') {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }
}

impl DirectoryStore {
    /// Reads the file at `path` and the name it was saved under. Files
    /// written without a name answer to their file stem.
    fn read_file(path: &Path) -> Result<(String, BoundaryConfiguration)> {
        let source = fs::read_to_string(path)?;
        let mut config: BoundaryConfiguration = serde_json::from_str(&source)?;
        let stored = match &config.name {
            Some(name) => name.clone(),
            None => path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string(),
        };
        config.name = Some(stored.clone());
        Ok((stored, config))
    }
}

impl ConfigStore for DirectoryStore {
    #[instrument(level = "debug", skip(self), fields(root = %self.root.display()))]
    fn load(&self, name: &str) -> Result<BoundaryConfiguration> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(ProcessorError::UnknownConfiguration(name.to_string()));
        }
        let (stored, config) = Self::read_file(&path)?;
        // Distinct names can share a file name once sanitised.
        if stored != name {
            return Err(ProcessorError::UnknownConfiguration(name.to_string()));
        }
        debug!(ranges = config.ranges().len(), "configuration loaded");
        Ok(config)
    }

    #[instrument(level = "debug", skip_all, fields(root = %self.root.display()))]
    fn save(&mut self, config: &BoundaryConfiguration) -> Result<()> {
        let name = required_name(config)?;
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(name);
        if path.is_file() {
            let (existing, _) = Self::read_file(&path)?;
            if existing != name {
                return Err(ProcessorError::ConfigurationNameClash {
                    name: name.to_string(),
                    existing,
                });
            }
        }
        fs::write(&path, serde_json::to_string_pretty(config)?)?;
        info!(name, path = %path.display(), "configuration saved");
        Ok(())
    }

    fn names(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let (stored, _) = Self::read_file(&path)?;
                names.push(stored);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Store holding configurations in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl ConfigStore for MemoryStore {
    fn load(&self, name: &str) -> Result<BoundaryConfiguration> {
        let source = self
            .entries
            .get(name)
            .ok_or_else(|| ProcessorError::UnknownConfiguration(name.to_string()))?;
        Ok(serde_json::from_str(source)?)
    }

    fn save(&mut self, config: &BoundaryConfiguration) -> Result<()> {
        let name = required_name(config)?.to_string();
        self.entries.insert(name, serde_json::to_string(config)?);
        Ok(())
    }

    fn names(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}
