//! Analyzer orchestration, result storage, and deployment runbooks.
//!
//! An [`Orchestrator`](pipeline::Orchestrator) runs every registered
//! [`Analyzer`](analyzer::Analyzer) over an analysis context, isolating
//! failures, and scores the combined findings. A
//! [`RunbookGenerator`](runbook::RunbookGenerator) turns those findings into a
//! deployment procedure.

pub mod analyzer;
pub mod pipeline;
pub mod rules;
pub mod runbook;
pub mod state;
