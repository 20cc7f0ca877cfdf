//! Core types, configuration, and error handling for deploylens.
//!
//! This crate provides the shared foundation used by all other deploylens crates:
//! - [`DeployLensError`]: unified error type using `thiserror` and `miette`
//! - [`DeployLensConfig`]: configuration loaded from `.deploylens.toml`
//! - The change data model: [`DiffHunk`], [`DiffFile`], [`DiffResult`],
//!   [`FileChange`], [`AnalysisContext`]
//! - The finding model: [`Finding`], [`FindingType`], [`Severity`], [`AnalyzerError`]

mod config;
mod error;
mod types;

pub use config::{DeployLensConfig, RepoConfig, Rule, RunbookConfig, ScoringConfig};
pub use error::DeployLensError;
pub use types::{
    AnalysisContext, AnalyzerError, DiffFile, DiffHunk, DiffResult, FileChange, FileStatus,
    Finding, FindingType, OutputFormat, Severity,
};

/// A convenience `Result` type for deploylens operations.
pub type Result<T> = std::result::Result<T, DeployLensError>;
