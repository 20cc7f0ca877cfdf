use std::path::PathBuf;

use deploylens_core::{DeployLensError, DiffResult, Result};
use deploylens_difflens::parser::parse_unified_diff;
use serde::Serialize;

use crate::runner::GitRunner;

/// Branch used when no default branch can be detected.
const FALLBACK_BRANCH: &str = "main";

/// Summary of the repository a context was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInfo {
    /// Top-level directory of the working tree.
    pub root: PathBuf,
    /// Checked-out branch, or the short commit hash when detached.
    pub current_branch: String,
    /// Full hash of `HEAD`.
    pub head_commit: String,
    /// Detected default branch.
    pub default_branch: String,
}

/// Typed queries against one git repository.
///
/// Metadata results are trimmed; file content from [`Repository::show`] is
/// returned exactly as git printed it.
#[derive(Debug, Clone)]
pub struct Repository<R: GitRunner> {
    runner: R,
}

impl<R: GitRunner> Repository<R> {
    /// Wrap a runner.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// The underlying runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn query(&self, args: &[&str]) -> Result<String> {
        Ok(self.runner.run(args)?.trim().to_string())
    }

    /// Returns `true` if the working directory is inside a git work tree.
    pub fn is_repository(&self) -> bool {
        self.query(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out == "true")
            .unwrap_or(false)
    }

    /// Top-level directory of the working tree.
    pub fn root(&self) -> Result<PathBuf> {
        self.query(&["rev-parse", "--show-toplevel"]).map(PathBuf::from)
    }

    /// Checked-out branch name, or the short `HEAD` hash when detached.
    pub fn current_branch(&self) -> Result<String> {
        let branch = self.query(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if branch == "HEAD" {
            return self.query(&["rev-parse", "--short", "HEAD"]);
        }
        Ok(branch)
    }

    /// Full hash of `HEAD`.
    pub fn head_commit(&self) -> Result<String> {
        self.query(&["rev-parse", "HEAD"])
    }

    /// Detect the default branch.
    ///
    /// Uses the remote's `HEAD` when set, then a local `main` or `master`,
    /// and otherwise assumes `main`.
    pub fn default_branch(&self) -> String {
        if let Ok(remote_head) = self.query(&["rev-parse", "--abbrev-ref", "origin/HEAD"]) {
            if let Some(branch) = strip_remote(&remote_head) {
                return branch.to_string();
            }
        }

        for candidate in ["main", "master"] {
            if self.ref_exists(candidate) {
                return candidate.to_string();
            }
        }
        FALLBACK_BRANCH.to_string()
    }

    /// Returns `true` if `reference` resolves to a commit.
    pub fn ref_exists(&self, reference: &str) -> bool {
        if validate_ref(reference).is_err() {
            return false;
        }
        let spec = format!("{reference}^{{commit}}");
        self.runner
            .run(&["rev-parse", "--verify", "--quiet", &spec])
            .is_ok()
    }

    /// Best common ancestor of two revisions.
    pub fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        validate_ref(a)?;
        validate_ref(b)?;
        self.query(&["merge-base", a, b])
    }

    /// Diff between revisions, parsed.
    ///
    /// With both refs the diff is `base...head`; with only `base` it is the
    /// working tree (or the index when `staged`) against `base`.
    pub fn diff(
        &self,
        base: Option<&str>,
        head: Option<&str>,
        staged: bool,
        paths: &[String],
    ) -> Result<DiffResult> {
        let args = diff_args(&["diff", "--no-color", "-U3"], base, head, staged, paths)?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let raw = self.runner.run(&args)?;
        Ok(parse_unified_diff(
            &raw,
            base.unwrap_or_default(),
            head.unwrap_or_default(),
        ))
    }

    /// Paths changed over the same range as [`Repository::diff`].
    pub fn changed_files(
        &self,
        base: Option<&str>,
        head: Option<&str>,
        staged: bool,
        paths: &[String],
    ) -> Result<Vec<String>> {
        let args = diff_args(&["diff", "--name-only"], base, head, staged, paths)?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Ok(lines(&self.query(&args)?))
    }

    /// Every tracked path at `reference`.
    pub fn list_files(&self, reference: &str) -> Result<Vec<String>> {
        validate_ref(reference)?;
        Ok(lines(&self.query(&["ls-tree", "-r", "--full-tree", "--name-only", reference])?))
    }

    /// Returns `true` if `path` exists at `reference`.
    pub fn file_exists_at(&self, reference: &str, path: &str) -> bool {
        let object = format!("{reference}:{path}");
        validate_ref(reference).is_ok() && self.runner.run(&["cat-file", "-e", &object]).is_ok()
    }

    /// Size in bytes of `path` at `reference`.
    pub fn file_size_at(&self, reference: &str, path: &str) -> Result<u64> {
        validate_ref(reference)?;
        let object = format!("{reference}:{path}");
        let size = self.query(&["cat-file", "-s", &object])?;
        size.parse().map_err(|_| {
            DeployLensError::Parse(format!("unexpected `git cat-file -s` output: {size}"))
        })
    }

    /// Content of `path` at `reference`, verbatim.
    pub fn show(&self, reference: &str, path: &str) -> Result<String> {
        validate_ref(reference)?;
        let object = format!("{reference}:{path}");
        self.runner.run(&["show", &object])
    }

    /// Collect root, branch, commit, and default branch.
    pub fn info(&self) -> Result<RepoInfo> {
        Ok(RepoInfo {
            root: self.root()?,
            current_branch: self.current_branch()?,
            head_commit: self.head_commit()?,
            default_branch: self.default_branch(),
        })
    }
}

/// `origin/main` -> `main`. `None` when there is no remote prefix.
fn strip_remote(reference: &str) -> Option<&str> {
    let (_, branch) = reference.split_once('/')?;
    (!branch.is_empty()).then_some(branch)
}

/// Reject refs git would read as options or that contain control characters.
pub(crate) fn validate_ref(reference: &str) -> Result<()> {
    if reference.is_empty() || reference.starts_with('-') {
        return Err(DeployLensError::RefNotFound(reference.to_string()));
    }
    if reference.contains(['\0', '\n', '\r']) {
        return Err(DeployLensError::RefNotFound(reference.escape_debug().to_string()));
    }
    Ok(())
}

fn diff_args(
    prefix: &[&str],
    base: Option<&str>,
    head: Option<&str>,
    staged: bool,
    paths: &[String],
) -> Result<Vec<String>> {
    let mut args: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
    if staged {
        args.push("--cached".into());
    }

    match (base, head) {
        (Some(base), Some(head)) => {
            validate_ref(base)?;
            validate_ref(head)?;
            args.push(format!("{base}...{head}"));
        }
        (Some(single), None) | (None, Some(single)) => {
            validate_ref(single)?;
            args.push(single.to_string());
        }
        (None, None) => {}
    }

    if !paths.is_empty() {
        args.push("--".into());
        args.extend(paths.iter().cloned());
    }
    Ok(args)
}

fn lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
