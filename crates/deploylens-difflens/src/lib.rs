//! Diff parsing, path filtering, and risk scoring.
//!
//! Turns `git diff` output into structured per-file hunks, decides which
//! changed paths are worth analyzing, and converts findings into a numeric
//! risk score and level.

pub mod filter;
pub mod parser;
pub mod risk;
