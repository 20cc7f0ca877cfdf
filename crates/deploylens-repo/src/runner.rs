//! The git subprocess seam.
//!
//! Everything that talks to git goes through [`GitRunner`], so the repository
//! client and revision reader can be driven by an in-memory fake in tests.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use deploylens_core::{DeployLensError, Result};

/// Maximum number of stdout bytes captured from a single git invocation.
pub const DEFAULT_OUTPUT_LIMIT: usize = 32 * 1024 * 1024;

/// Runs git commands inside one repository working directory.
pub trait GitRunner {
    /// Run `git <args>` and return its stdout unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`DeployLensError::Git`] on a non-zero exit status and
    /// [`DeployLensError::OutputTooLarge`] when stdout exceeds the capture limit.
    fn run(&self, args: &[&str]) -> Result<String>;

    /// The working directory commands run in.
    fn workdir(&self) -> &Path;
}

impl<R: GitRunner + ?Sized> GitRunner for &R {
    fn run(&self, args: &[&str]) -> Result<String> {
        (**self).run(args)
    }

    fn workdir(&self) -> &Path {
        (**self).workdir()
    }
}

/// [`GitRunner`] backed by the `git` executable on `PATH`.
///
/// # Examples
///
/// ```
/// use deploylens_repo::runner::{GitRunner, SystemGit, DEFAULT_OUTPUT_LIMIT};
///
/// let git = SystemGit::new(".");
/// assert_eq!(git.output_limit(), DEFAULT_OUTPUT_LIMIT);
/// assert_eq!(git.workdir(), std::path::Path::new("."));
/// ```
#[derive(Debug, Clone)]
pub struct SystemGit {
    workdir: PathBuf,
    output_limit: usize,
}

impl SystemGit {
    /// Run git inside `workdir` with the default output limit.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }

    /// Override the stdout capture limit.
    pub fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    /// The stdout capture limit in bytes.
    pub fn output_limit(&self) -> usize {
        self.output_limit
    }
}

impl GitRunner for SystemGit {
    fn run(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        tracing::debug!(%command, workdir = %self.workdir.display(), "running git");

        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        let stdout = match child.stdout.take() {
            Some(stdout) => read_limited(stdout, self.output_limit)?,
            None => Some(Vec::new()),
        };

        let Some(stdout) = stdout else {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!(%command, limit = self.output_limit, "git output over limit");
            return Err(DeployLensError::OutputTooLarge {
                command,
                limit: self.output_limit,
            });
        };

        let status = child.wait()?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(DeployLensError::Git {
                command,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// Read at most `limit` bytes. Returns `None` if the reader had more.
fn read_limited<R: Read>(reader: R, limit: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf)?;
    if buf.len() > limit {
        Ok(None)
    } else {
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_limited_accepts_output_at_limit() {
        let data = vec![b'x'; 16];
        let out = read_limited(Cursor::new(data.clone()), 16).unwrap();
        assert_eq!(out, Some(data));
    }

    #[test]
    fn read_limited_rejects_output_over_limit() {
        let out = read_limited(Cursor::new(vec![b'x'; 17]), 16).unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn read_limited_empty() {
        assert_eq!(read_limited(Cursor::new(Vec::new()), 0).unwrap(), Some(vec![]));
    }

    #[test]
    fn system_git_fails_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let git = SystemGit::new(dir.path());
        // Either git is missing (Io) or it reports no repository (Git).
        let err = git.run(&["rev-parse", "--show-toplevel"]).unwrap_err();
        assert!(matches!(
            err,
            DeployLensError::Git { .. } | DeployLensError::Io(_)
        ));
    }

    fn workdir_of<R: GitRunner>(runner: R) -> PathBuf {
        runner.workdir().to_path_buf()
    }

    #[test]
    fn reference_runner_forwards() {
        let git = SystemGit::new("/tmp").with_output_limit(8);
        assert_eq!(workdir_of(&git), PathBuf::from("/tmp"));
        assert_eq!(git.output_limit(), 8);
    }
}
