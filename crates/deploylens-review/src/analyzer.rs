use deploylens_core::{AnalysisContext, FileChange, Finding, Result};

/// A pluggable detection unit run over an [`AnalysisContext`].
///
/// Analyzers see the whole context and decide for themselves which files to
/// inspect. Returning `Err` (or panicking) only fails this analyzer; the
/// orchestrator records the error and keeps running the rest.
///
/// # Examples
///
/// ```
/// use deploylens_core::{AnalysisContext, Finding, FindingType, Result, Severity};
/// use deploylens_review::analyzer::Analyzer;
///
/// struct LockfileAnalyzer {
///     extensions: Vec<String>,
/// }
///
/// impl Analyzer for LockfileAnalyzer {
///     fn name(&self) -> &str {
///         "lockfile"
///     }
///
///     fn supported_extensions(&self) -> &[String] {
///         &self.extensions
///     }
///
///     fn analyze(&self, context: &AnalysisContext) -> Result<Vec<Finding>> {
///         Ok(context
///             .files
///             .iter()
///             .filter(|f| self.supports(f))
///             .map(|f| {
///                 Finding::new(
///                     FindingType::DependencyChange,
///                     Severity::Low,
///                     "Lockfile changed",
///                     format!("{} was modified", f.path),
///                 )
///             })
///             .collect())
///     }
/// }
///
/// let analyzer = LockfileAnalyzer { extensions: vec!["lock".into()] };
/// assert!(analyzer.analyze(&AnalysisContext::default()).unwrap().is_empty());
/// ```
pub trait Analyzer {
    /// Unique name, used in error records and logs.
    fn name(&self) -> &str;

    /// Lowercase file extensions this analyzer looks at; empty means all files.
    fn supported_extensions(&self) -> &[String];

    /// Inspect the context and report findings.
    ///
    /// # Errors
    ///
    /// Any error is recorded against this analyzer by the orchestrator.
    fn analyze(&self, context: &AnalysisContext) -> Result<Vec<Finding>>;

    /// Returns `true` if `change` has one of the supported extensions.
    fn supports(&self, change: &FileChange) -> bool {
        let extensions = self.supported_extensions();
        if extensions.is_empty() {
            return true;
        }
        change
            .extension()
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }
}
