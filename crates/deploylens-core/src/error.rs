use std::path::PathBuf;

/// Errors that can occur across the deploylens pipeline.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use deploylens_core::DeployLensError;
///
/// let err = DeployLensError::RefNotFound("release/1.2".into());
/// assert!(err.to_string().contains("release/1.2"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DeployLensError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(deploylens::config))]
    Config(String),

    /// A git subprocess exited with a non-zero status.
    #[error("git command `{command}` failed: {stderr}")]
    #[diagnostic(code(deploylens::git))]
    Git {
        /// The command line that was run.
        command: String,
        /// Diagnostic output captured from stderr.
        stderr: String,
    },

    /// The working directory is not inside a git repository.
    #[error("not a git repository: {}", .0.display())]
    #[diagnostic(
        code(deploylens::not_a_repository),
        help("run deploylens from inside a git repository, or pass --repo")
    )]
    NotARepository(PathBuf),

    /// A revision could not be resolved to a commit.
    #[error("reference does not exist: {0}")]
    #[diagnostic(
        code(deploylens::ref_not_found),
        help("fetch the reference first, or pass an existing one with --base")
    )]
    RefNotFound(String),

    /// A git subprocess produced more output than the capture limit.
    #[error("git command `{command}` produced more than {limit} bytes of output")]
    #[diagnostic(code(deploylens::output_too_large))]
    OutputTooLarge {
        /// The command line that was run.
        command: String,
        /// Capture limit in bytes.
        limit: usize,
    },

    /// An analyzer failed while inspecting the change.
    #[error("analyzer error: {0}")]
    Analyzer(String),

    /// Malformed input that could not be recovered.
    #[error("parse error: {0}")]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
