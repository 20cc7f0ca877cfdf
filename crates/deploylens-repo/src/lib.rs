//! Git access and analysis context assembly.
//!
//! - [`runner`]: the [`GitRunner`](runner::GitRunner) subprocess seam and its
//!   `git` executable implementation
//! - [`client`]: typed repository queries ([`Repository`](client::Repository))
//! - [`revision`]: file content at the working tree, index, or a revision
//! - [`context`]: builds the per-file before/after [`AnalysisContext`](deploylens_core::AnalysisContext)

pub mod client;
pub mod context;
pub mod revision;
pub mod runner;
