//! Storage for completed analysis results.
//!
//! The orchestrator is handed a [`ResultStore`] at construction and writes
//! every result it produces into it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use deploylens_core::{DeployLensError, Result};

use crate::pipeline::AnalysisResult;

/// Where finished analysis results are kept, keyed by result id.
pub trait ResultStore {
    /// Store `result`, replacing any result with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the result could not be persisted.
    fn put(&mut self, result: &AnalysisResult) -> Result<()>;

    /// Look up a result by id. `Ok(None)` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored result exists but cannot be read.
    fn get(&self, id: &str) -> Result<Option<AnalysisResult>>;
}

impl<S: ResultStore + ?Sized> ResultStore for &mut S {
    fn put(&mut self, result: &AnalysisResult) -> Result<()> {
        (**self).put(result)
    }

    fn get(&self, id: &str) -> Result<Option<AnalysisResult>> {
        (**self).get(id)
    }
}

/// In-process store.
///
/// # Examples
///
/// ```
/// use deploylens_review::state::{MemoryStore, ResultStore};
///
/// let store = MemoryStore::new();
/// assert!(store.is_empty());
/// assert!(store.get("missing").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    results: HashMap<String, AnalysisResult>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl ResultStore for MemoryStore {
    fn put(&mut self, result: &AnalysisResult) -> Result<()> {
        self.results.insert(result.id.clone(), result.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<AnalysisResult>> {
        Ok(self.results.get(id).cloned())
    }
}

/// Stores each result as pretty JSON under `<root>/.deploylens/results/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store results beneath the repository at `repo_root`.
    pub fn new(repo_root: &Path) -> Self {
        Self {
            dir: repo_root.join(".deploylens").join("results"),
        }
    }

    /// Directory result files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(DeployLensError::Config(format!("invalid result id: {id}")));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl ResultStore for FileStore {
    fn put(&mut self, result: &AnalysisResult) -> Result<()> {
        let path = self.path_for(&result.id)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            DeployLensError::Config(format!(
                "failed to create {}: {e}",
                self.dir.display()
            ))
        })?;

        let content = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, content).map_err(|e| {
            DeployLensError::Config(format!(
                "failed to write analysis result to {}: {e}",
                path.display()
            ))
        })?;
        tracing::debug!(path = %path.display(), "stored analysis result");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<AnalysisResult>> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            DeployLensError::Config(format!(
                "failed to read analysis result from {}: {e}",
                path.display()
            ))
        })?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}
