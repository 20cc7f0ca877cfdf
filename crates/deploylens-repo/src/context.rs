use deploylens_core::{
    AnalysisContext, DeployLensError, DiffFile, DiffResult, FileChange, FileStatus, RepoConfig,
    Result,
};
use deploylens_difflens::filter::PathFilter;

use crate::client::{RepoInfo, Repository};
use crate::revision::RevisionReader;
use crate::runner::GitRunner;

/// What to diff and how to filter it.
///
/// # Examples
///
/// ```
/// use deploylens_repo::context::BuildOptions;
///
/// let options = BuildOptions {
///     base: Some("main".into()),
///     staged: true,
///     ..BuildOptions::default()
/// };
/// assert!(options.head.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Base revision; the detected default branch when `None`.
    pub base: Option<String>,
    /// Head revision; the working tree (or index) when `None`.
    pub head: Option<String>,
    /// Read new content from the index instead of the working tree.
    pub staged: bool,
    /// Restrict the diff to these paths.
    pub paths: Vec<String>,
    /// Ignore patterns and analyzer settings.
    pub repo_config: RepoConfig,
}

/// The assembled analysis context together with what it was built from.
#[derive(Debug, Clone)]
pub struct BuiltContext {
    /// Per-file before/after content for analyzers.
    pub context: AnalysisContext,
    /// Repository the context came from.
    pub repo_info: RepoInfo,
    /// Full parsed diff, before filtering.
    pub diff_result: DiffResult,
}

/// Assembles an [`AnalysisContext`] from a repository.
///
/// # Examples
///
/// ```no_run
/// use deploylens_repo::context::{BuildOptions, ContextBuilder};
/// use deploylens_repo::runner::SystemGit;
///
/// let builder = ContextBuilder::new(SystemGit::new("."));
/// let built = builder.build(&BuildOptions::default()).unwrap();
/// println!("{} files changed", built.context.files.len());
/// ```
#[derive(Debug, Clone)]
pub struct ContextBuilder<R: GitRunner> {
    runner: R,
}

impl<R: GitRunner> ContextBuilder<R> {
    /// Build contexts using `runner`.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Diff the repository and read before/after content for every kept file.
    ///
    /// Binary files and files matching `repo_config.ignore_patterns` are left out.
    ///
    /// # Errors
    ///
    /// Returns [`DeployLensError::NotARepository`] outside a work tree,
    /// [`DeployLensError::RefNotFound`] when the base or head does not resolve,
    /// and any git failure from the diff itself.
    pub fn build(&self, options: &BuildOptions) -> Result<BuiltContext> {
        let repo = Repository::new(&self.runner);

        if !repo.is_repository() {
            return Err(DeployLensError::NotARepository(
                self.runner.workdir().to_path_buf(),
            ));
        }

        let base = match &options.base {
            Some(base) => base.clone(),
            None => repo.default_branch(),
        };
        if !repo.ref_exists(&base) {
            return Err(DeployLensError::RefNotFound(base));
        }
        if let Some(head) = &options.head {
            if !repo.ref_exists(head) {
                return Err(DeployLensError::RefNotFound(head.clone()));
            }
        }

        let repo_info = repo.info()?;
        let reader = RevisionReader::new(&self.runner).with_root(&repo_info.root);
        let diff_result = repo.diff(
            Some(&base),
            options.head.as_deref(),
            options.staged,
            &options.paths,
        )?;

        let filter = PathFilter::new(&options.repo_config.ignore_patterns)?;
        let filtered = filter.filter(diff_result.files.clone());
        for skipped in &filtered.skipped {
            tracing::debug!(path = %skipped.path, reason = %skipped.reason, "skipping file");
        }

        let files: Vec<FileChange> = filtered
            .kept
            .into_iter()
            .map(|file| read_change(&reader, &base, options, file))
            .collect();

        tracing::info!(
            base = %base,
            files = files.len(),
            skipped = filtered.skipped.len(),
            "built analysis context"
        );

        Ok(BuiltContext {
            context: AnalysisContext {
                files,
                diff: diff_result.raw_diff.clone(),
                repo_config: options.repo_config.clone(),
            },
            repo_info,
            diff_result,
        })
    }
}

fn read_change<R: GitRunner>(
    reader: &RevisionReader<R>,
    base: &str,
    options: &BuildOptions,
    file: DiffFile,
) -> FileChange {
    let old_content = match file.status {
        FileStatus::Added => None,
        _ => reader.read_at(base, file.old_path.as_deref().unwrap_or(&file.path)),
    };

    let new_content = match (file.status, &options.head) {
        (FileStatus::Deleted, _) => None,
        (_, Some(head)) => reader.read_at(head, &file.path),
        (_, None) if options.staged => reader.read_index(&file.path),
        (_, None) => reader.read_working_tree(&file.path),
    };

    FileChange {
        path: file.path,
        old_content,
        new_content,
        hunks: file.hunks,
    }
}
