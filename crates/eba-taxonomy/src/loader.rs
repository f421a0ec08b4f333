//! Loader for the on-disk taxonomy catalog.
//!
//! A catalog directory holds `index.json` (entry-point URL → relative module file
//! name) plus one JSON document per module. The loader memoises the last-loaded
//! module by identity so sibling subsystems within one job share a single
//! in-memory module, per the spec's single-slot identity cache requirement.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::Module;

#[derive(Debug, Deserialize)]
struct IndexFile {
    #[serde(flatten)]
    entries: HashMap<String, PathBuf>,
}

/// Maps taxonomy entry-point URLs to the relative path of their serialised module.
#[derive(Debug, Clone)]
pub struct TaxonomyIndex {
    catalog_dir: PathBuf,
    entries: HashMap<String, PathBuf>,
}

impl TaxonomyIndex {
    /// Loads `index.json` from `catalog_dir`.
    ///
    /// Per the spec's tolerant-loader contract, a missing index is *not* treated
    /// as fatal by this constructor — callers that can proceed without a taxonomy
    /// should match on [`Error::MissingIndex`] and continue with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIndex`] if `index.json` does not exist, or
    /// [`Error::Json`] if it exists but fails to parse.
    pub fn load(catalog_dir: impl Into<PathBuf>) -> Result<Self> {
        let catalog_dir = catalog_dir.into();
        let index_path = catalog_dir.join("index.json");
        let content = fs::read_to_string(&index_path)
            .map_err(|_| Error::MissingIndex(index_path.clone()))?;
        let index: IndexFile = serde_json::from_str(&content)?;
        Ok(Self {
            catalog_dir,
            entries: index.entries,
        })
    }

    /// Returns the on-disk path of the module for `entry_point_url`, if indexed.
    #[must_use]
    pub fn module_path(&self, entry_point_url: &str) -> Option<PathBuf> {
        self.entries
            .get(entry_point_url)
            .map(|rel| self.catalog_dir.join(rel))
    }
}

/// Loads and memoises taxonomy modules for one conversion or validation job.
///
/// The loader's identity cache holds at most one module at a time: loading a
/// second module evicts the first. This matches the spec's single-threaded,
/// single-slot cache policy (§5) — it is not a process-wide cache, one instance
/// lives for the duration of one job.
pub struct ModuleLoader {
    index: Option<TaxonomyIndex>,
    cached: RefCell<Option<(String, Rc<Module>)>>,
}

impl ModuleLoader {
    /// Creates a loader backed by `index`, or with no taxonomy available.
    #[must_use]
    pub fn new(index: Option<TaxonomyIndex>) -> Self {
        Self {
            index,
            cached: RefCell::new(None),
        }
    }

    /// Creates a loader by reading `index.json` from `catalog_dir`.
    ///
    /// A missing index file is tolerated: the loader is constructed with no
    /// taxonomy available, matching "missing index file → no taxonomy available".
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `index.json` exists but is malformed.
    pub fn from_catalog_dir(catalog_dir: impl AsRef<Path>) -> Result<Self> {
        match TaxonomyIndex::load(catalog_dir.as_ref()) {
            Ok(index) => Ok(Self::new(Some(index))),
            Err(Error::MissingIndex(_)) => Ok(Self::new(None)),
            Err(other) => Err(other),
        }
    }

    /// Loads the module for `entry_point_url`, or `None` if no taxonomy is
    /// available or the URL is not indexed.
    ///
    /// A missing module file for a known URL is tolerated and returns `None`.
    /// A module file that exists but fails to parse is a fatal [`Error::CorruptModule`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptModule`] if the module file exists but its JSON
    /// is malformed.
    pub fn load(&self, entry_point_url: &str) -> Result<Option<Rc<Module>>> {
        if let Some((cached_url, module)) = self.cached.borrow().as_ref() {
            if cached_url == entry_point_url {
                return Ok(Some(Rc::clone(module)));
            }
        }

        let Some(index) = &self.index else {
            return Ok(None);
        };
        let Some(path) = index.module_path(entry_point_url) else {
            return Ok(None);
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return Ok(None),
        };
        let module: Module = serde_json::from_str(&content).map_err(|e| Error::CorruptModule {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let module = Rc::new(module);
        *self.cached.borrow_mut() = Some((entry_point_url.to_string(), Rc::clone(&module)));
        Ok(Some(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_catalog(dir: &Path) {
        fs::write(
            dir.join("index.json"),
            r#"{"https://example.org/mod/foo.xsd": "foo.json"}"#,
        )
        .unwrap();
        fs::write(
            dir.join("foo.json"),
            r#"{"url": "https://example.org/mod/foo.xsd", "code": "FOO", "tables": []}"#,
        )
        .unwrap();
    }

    #[test]
    fn missing_index_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModuleLoader::from_catalog_dir(dir.path()).unwrap();
        assert!(loader.load("https://example.org/mod/foo.xsd").unwrap().is_none());
    }

    #[test]
    fn loads_and_caches_by_url() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path());
        let loader = ModuleLoader::from_catalog_dir(dir.path()).unwrap();

        let first = loader.load("https://example.org/mod/foo.xsd").unwrap().unwrap();
        assert_eq!(first.code, "FOO");

        let second = loader.load("https://example.org/mod/foo.xsd").unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &second), "second load should hit the identity cache");
    }

    #[test]
    fn unknown_url_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path());
        let loader = ModuleLoader::from_catalog_dir(dir.path()).unwrap();
        assert!(loader.load("https://example.org/mod/unknown.xsd").unwrap().is_none());
    }

    #[test]
    fn missing_module_file_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("index.json"),
            r#"{"https://example.org/mod/foo.xsd": "missing.json"}"#,
        )
        .unwrap();
        let loader = ModuleLoader::from_catalog_dir(dir.path()).unwrap();
        assert!(loader.load("https://example.org/mod/foo.xsd").unwrap().is_none());
    }

    #[test]
    fn corrupt_module_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("index.json"),
            r#"{"https://example.org/mod/foo.xsd": "foo.json"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("foo.json"), "{not json").unwrap();
        let loader = ModuleLoader::from_catalog_dir(dir.path()).unwrap();
        assert!(matches!(
            loader.load("https://example.org/mod/foo.xsd"),
            Err(Error::CorruptModule { .. })
        ));
    }
}
