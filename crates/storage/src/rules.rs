use sift_core::{Category, CategoryError, CategoryMap};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleStoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Rule file {path} is corrupt: {source}")]
    ConfigCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Rules(#[from] CategoryError),
}

impl RuleStoreError {
    pub fn is_unknown_category(&self) -> bool {
        matches!(self, RuleStoreError::Rules(CategoryError::UnknownCategory(_)))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, RuleStoreError::Rules(CategoryError::AlreadyExists(_)))
    }

    fn io(path: &Path, source: io::Error) -> Self {
        RuleStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reads the rule file. A missing file yields the default `{"General": []}`.
pub fn load(path: &Path) -> Result<CategoryMap, RuleStoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No rule file at {}, using defaults", path.display());
            return Ok(CategoryMap::default());
        }
        Err(e) => return Err(RuleStoreError::io(path, e)),
    };

    let rules: CategoryMap =
        serde_json::from_slice(&bytes).map_err(|source| RuleStoreError::ConfigCorrupt {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("Loaded {} categories from {}", rules.len(), path.display());
    Ok(rules)
}

/// Overwrites the rule file with the full mapping.
///
/// The JSON goes to a sibling `.tmp` file first and is renamed into place,
/// so an interrupted save leaves either the old or the new file.
pub fn save(path: &Path, rules: &CategoryMap) -> Result<(), RuleStoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| RuleStoreError::io(parent, e))?;
    }

    let json = serde_json::to_vec_pretty(rules).map_err(|source| RuleStoreError::ConfigCorrupt {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path(path);
    fs::write(&tmp, json).map_err(|e| RuleStoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| RuleStoreError::io(path, e))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// The category → keyword rules for a session, flushed to disk after every
/// change.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: Option<PathBuf>,
    rules: CategoryMap,
}

impl RuleStore {
    /// Loads the rule file at `path`; a corrupt file is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RuleStoreError> {
        let path = path.into();
        let rules = load(&path)?;
        Ok(RuleStore {
            path: Some(path),
            rules,
        })
    }

    /// Like [`RuleStore::open`], but an unreadable or corrupt file falls back
    /// to the default rules. The next mutation overwrites that file.
    pub fn open_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let rules = load(&path).unwrap_or_else(|e| {
            tracing::warn!("{e}; starting from default categories");
            CategoryMap::default()
        });
        RuleStore {
            path: Some(path),
            rules,
        }
    }

    /// A store with no backing file.
    pub fn in_memory() -> Self {
        RuleStore {
            path: None,
            rules: CategoryMap::default(),
        }
    }

    pub fn from_rules(rules: CategoryMap) -> Self {
        RuleStore { path: None, rules }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rules(&self) -> &CategoryMap {
        &self.rules
    }

    /// Categories in the order they were added, `"General"` first.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.rules.contains(category)
    }

    pub fn keywords(&self, category: &str) -> Option<&[String]> {
        self.rules.keywords(category)
    }

    pub fn category_names(&self) -> Vec<String> {
        self.rules.names().map(str::to_string).collect()
    }

    pub fn ambiguous_keywords(&self) -> Vec<(String, Vec<String>)> {
        self.rules.ambiguous_keywords()
    }

    /// Adds an empty category and persists it. If the write fails the
    /// category is not kept in memory either.
    pub fn add_category(&mut self, name: &str) -> Result<(), RuleStoreError> {
        let before = self.rules.clone();
        self.rules.add_category(name)?;
        self.save_or_restore(before)?;
        tracing::info!(category = name.trim(), "category added");
        Ok(())
    }

    /// Returns whether the keyword was new. Only changes are persisted, and
    /// a change whose write fails is dropped from memory too.
    pub fn add_keyword(&mut self, category: &str, keyword: &str) -> Result<bool, RuleStoreError> {
        let before = self.rules.clone();
        let added = self.rules.add_keyword(category, keyword)?;
        if added {
            self.save_or_restore(before)?;
            tracing::info!(category, keyword = keyword.trim(), "keyword added");
        }
        Ok(added)
    }

    fn save_or_restore(&mut self, before: CategoryMap) -> Result<(), RuleStoreError> {
        if let Err(e) = self.save() {
            self.rules = before;
            return Err(e);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), RuleStoreError> {
        match &self.path {
            Some(path) => save(path, &self.rules),
            None => Ok(()),
        }
    }
}
