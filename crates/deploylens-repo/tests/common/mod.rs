#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use deploylens_core::{DeployLensError, Result};
use deploylens_repo::runner::GitRunner;

/// A [`GitRunner`] that answers from a fixed table of `args -> output`.
///
/// Commands missing from the table fail the way git does for unknown refs.
pub struct FakeGit {
    workdir: PathBuf,
    responses: HashMap<String, std::result::Result<String, String>>,
    calls: RefCell<Vec<String>>,
}

impl FakeGit {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            responses: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// A repository on branch `feature` whose remote default is `main`,
    /// with `workdir` as its top level.
    pub fn repository(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        let toplevel = workdir.clone();
        Self::repository_at(workdir, &toplevel)
    }

    /// Like [`FakeGit::repository`], run from `workdir` inside `toplevel`.
    pub fn repository_at(workdir: impl Into<PathBuf>, toplevel: &Path) -> Self {
        Self::new(workdir)
            .ok("rev-parse --is-inside-work-tree", "true\n")
            .ok(
                "rev-parse --show-toplevel",
                &format!("{}\n", toplevel.display()),
            )
            .ok("rev-parse --abbrev-ref HEAD", "feature\n")
            .ok("rev-parse HEAD", "0123456789abcdef0123456789abcdef01234567\n")
            .ok("rev-parse --abbrev-ref origin/HEAD", "origin/main\n")
            .ok("rev-parse --verify --quiet main^{commit}", "aaaa\n")
    }

    pub fn ok(mut self, args: &str, output: &str) -> Self {
        self.responses.insert(args.to_string(), Ok(output.to_string()));
        self
    }

    pub fn fail(mut self, args: &str, stderr: &str) -> Self {
        self.responses.insert(args.to_string(), Err(stderr.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl GitRunner for FakeGit {
    fn run(&self, args: &[&str]) -> Result<String> {
        let key = args.join(" ");
        self.calls.borrow_mut().push(key.clone());
        match self.responses.get(&key) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(stderr)) => Err(DeployLensError::Git {
                command: format!("git {key}"),
                stderr: stderr.clone(),
            }),
            None => Err(DeployLensError::Git {
                command: format!("git {key}"),
                stderr: format!("fatal: unexpected command `{key}`"),
            }),
        }
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}
