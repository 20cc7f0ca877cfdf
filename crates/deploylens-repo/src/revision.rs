use std::path::PathBuf;

use crate::runner::GitRunner;

/// Reads file content from the working tree, the index, or a revision.
///
/// A file that is absent and a read that fails both come back as `None`;
/// the cause is logged at debug level.
///
/// Paths are relative to the repository top level, as `git diff` prints them.
/// Working-tree reads resolve against the runner's working directory unless a
/// root is set with [`RevisionReader::with_root`].
#[derive(Debug, Clone)]
pub struct RevisionReader<R: GitRunner> {
    runner: R,
    root: Option<PathBuf>,
}

impl<R: GitRunner> RevisionReader<R> {
    /// Wrap a runner.
    pub fn new(runner: R) -> Self {
        Self { runner, root: None }
    }

    /// Resolve working-tree reads against `root` (the repository top level).
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Content of `path` on disk.
    pub fn read_working_tree(&self, path: &str) -> Option<String> {
        let root = self.root.as_deref().unwrap_or_else(|| self.runner.workdir());
        let full = root.join(path);
        match std::fs::read_to_string(&full) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path, error = %e, "working tree read failed");
                None
            }
        }
    }

    /// Content of `path` as staged in the index.
    pub fn read_index(&self, path: &str) -> Option<String> {
        self.show(&format!(":{path}"), path)
    }

    /// Content of `path` at `revision`.
    pub fn read_at(&self, revision: &str, path: &str) -> Option<String> {
        if revision.starts_with('-') {
            tracing::debug!(revision, "refusing option-like revision");
            return None;
        }
        self.show(&format!("{revision}:{path}"), path)
    }

    fn show(&self, object: &str, path: &str) -> Option<String> {
        match self.runner.run(&["show", object]) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path, object, error = %e, "revision read failed");
                None
            }
        }
    }
}
