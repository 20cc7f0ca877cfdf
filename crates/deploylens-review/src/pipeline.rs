use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use deploylens_core::{
    AnalysisContext, AnalyzerError, Finding, FindingType, Result, Severity,
};
use deploylens_difflens::risk::RiskScorer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analyzer::Analyzer;
use crate::state::ResultStore;

/// Outcome of one orchestrated analysis run.
///
/// # Examples
///
/// ```
/// use deploylens_core::AnalysisContext;
/// use deploylens_review::pipeline::Orchestrator;
/// use deploylens_review::state::MemoryStore;
///
/// let mut orchestrator = Orchestrator::new(MemoryStore::new());
/// let result = orchestrator.analyze(&AnalysisContext::default()).unwrap();
/// assert!(result.findings.is_empty());
/// assert_eq!(result.risk_score, 0);
/// assert!(!result.is_partial());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Random UUID v4.
    pub id: String,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// All findings, in analyzer registration order then emission order.
    pub findings: Vec<Finding>,
    /// Weighted sum over all findings.
    pub risk_score: u32,
    /// Classified `risk_score`.
    pub risk_level: Severity,
    /// Finding counts.
    pub summary: FindingSummary,
    /// One recommended action per finding, most urgent first.
    pub solutions: Vec<Solution>,
    /// Analyzers that failed during this run.
    pub errors: Vec<AnalyzerError>,
}

impl AnalysisResult {
    /// Returns `true` if at least one analyzer failed.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if any finding is at least as severe as `threshold`.
    pub fn has_findings_at(&self, threshold: Severity) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity.meets_threshold(threshold))
    }
}

/// Finding counts by severity and by type.
///
/// # Examples
///
/// ```
/// use deploylens_core::{Finding, FindingType, Severity};
/// use deploylens_review::pipeline::FindingSummary;
///
/// let findings = vec![
///     Finding::new(FindingType::ConfigChange, Severity::Low, "a", "b"),
///     Finding::new(FindingType::ConfigChange, Severity::High, "c", "d"),
/// ];
/// let summary = FindingSummary::from_findings(&findings);
/// assert_eq!(summary.total, 2);
/// assert_eq!(summary.by_type[&FindingType::ConfigChange], 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingSummary {
    /// Number of findings.
    pub total: usize,
    /// Count per severity present.
    pub by_severity: BTreeMap<Severity, usize>,
    /// Count per finding type present.
    pub by_type: BTreeMap<FindingType, usize>,
}

impl FindingSummary {
    /// Count `findings`.
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self {
            total: findings.len(),
            ..Self::default()
        };
        for finding in findings {
            *summary.by_severity.entry(finding.severity).or_insert(0) += 1;
            *summary.by_type.entry(finding.finding_type).or_insert(0) += 1;
        }
        summary
    }
}

/// How soon a solution should be acted on. Ordered most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    /// Block the deploy until done.
    Immediate,
    /// Do before deploying.
    High,
    /// Do during the deploy window.
    Medium,
    /// Follow up later.
    Low,
}

impl From<Severity> for Urgency {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Urgency::Immediate,
            Severity::High => Urgency::High,
            Severity::Medium => Urgency::Medium,
            Severity::Low => Urgency::Low,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Immediate => write!(f, "IMMEDIATE"),
            Urgency::High => write!(f, "HIGH"),
            Urgency::Medium => write!(f, "MEDIUM"),
            Urgency::Low => write!(f, "LOW"),
        }
    }
}

/// Recommended action for one finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    /// Title of the finding this addresses.
    pub finding_title: String,
    /// File the finding points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// How soon to act.
    pub urgency: Urgency,
    /// The finding's remediation, or its type's default mitigation.
    pub action: String,
}

/// One solution per finding, stably sorted by urgency.
///
/// # Examples
///
/// ```
/// use deploylens_core::{Finding, FindingType, Severity};
/// use deploylens_review::pipeline::{solutions_for, Urgency};
///
/// let findings = vec![
///     Finding::new(FindingType::DependencyChange, Severity::Low, "bump", "x"),
///     Finding::new(FindingType::DestructiveMigration, Severity::Critical, "drop", "y")
///         .with_remediation("Archive the table first"),
/// ];
/// let solutions = solutions_for(&findings);
/// assert_eq!(solutions[0].urgency, Urgency::Immediate);
/// assert_eq!(solutions[0].action, "Archive the table first");
/// ```
pub fn solutions_for(findings: &[Finding]) -> Vec<Solution> {
    let mut solutions: Vec<Solution> = findings
        .iter()
        .map(|f| Solution {
            finding_title: f.title.clone(),
            file_path: f.file_path.clone(),
            urgency: Urgency::from(f.severity),
            action: f
                .remediation
                .clone()
                .unwrap_or_else(|| f.finding_type.default_mitigation().to_string()),
        })
        .collect();
    solutions.sort_by_key(|s| s.urgency);
    solutions
}

/// Runs registered analyzers over a context and aggregates their findings.
///
/// Analyzers run one after another in registration order. An analyzer that
/// returns an error or panics is recorded in [`AnalysisResult::errors`] and
/// the run continues with the next one. Every result is written to the store.
pub struct Orchestrator<S: ResultStore> {
    analyzers: Vec<Box<dyn Analyzer>>,
    scorer: RiskScorer,
    store: S,
    errors: Vec<AnalyzerError>,
}

impl<S: ResultStore> Orchestrator<S> {
    /// Create an orchestrator that writes results to `store`, using default thresholds.
    pub fn new(store: S) -> Self {
        Self {
            analyzers: Vec::new(),
            scorer: RiskScorer::default(),
            store,
            errors: Vec::new(),
        }
    }

    /// Replace the risk scorer.
    pub fn with_scorer(mut self, scorer: RiskScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Append an analyzer.
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        tracing::debug!(analyzer = analyzer.name(), "registered analyzer");
        self.analyzers.push(analyzer);
    }

    /// Names of registered analyzers, in registration order.
    pub fn analyzers(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Errors recorded during the most recent completed run.
    pub fn errors(&self) -> &[AnalyzerError] {
        &self.errors
    }

    /// The result store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the orchestrator and return its store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Run every analyzer over `context`, score the findings, and store the result.
    ///
    /// # Errors
    ///
    /// Only a failure to store the result is returned; analyzer failures are
    /// recorded in the result instead.
    pub fn analyze(&mut self, context: &AnalysisContext) -> Result<AnalysisResult> {
        self.errors.clear();

        let mut findings: Vec<Finding> = Vec::new();
        let mut errors: Vec<AnalyzerError> = Vec::new();

        for analyzer in &self.analyzers {
            let name = analyzer.name().to_string();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(context)));

            match outcome {
                Ok(Ok(found)) => {
                    tracing::debug!(analyzer = %name, findings = found.len(), "analyzer finished");
                    findings.extend(found);
                }
                Ok(Err(e)) => {
                    tracing::warn!(analyzer = %name, error = %e, "analyzer failed");
                    errors.push(AnalyzerError {
                        analyzer_name: name,
                        error: e.to_string(),
                    });
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(analyzer = %name, error = %message, "analyzer panicked");
                    errors.push(AnalyzerError {
                        analyzer_name: name,
                        error: format!("analyzer panicked: {message}"),
                    });
                }
            }
        }

        let risk_score = self.scorer.score(&findings);
        let result = AnalysisResult {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            risk_score,
            risk_level: self.scorer.classify(risk_score),
            summary: FindingSummary::from_findings(&findings),
            solutions: solutions_for(&findings),
            findings,
            errors: errors.clone(),
        };

        self.store.put(&result)?;
        self.errors = errors;
        tracing::info!(
            id = %result.id,
            findings = result.findings.len(),
            errors = result.errors.len(),
            score = result.risk_score,
            level = %result.risk_level,
            "analysis complete"
        );
        Ok(result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn location(finding: &Finding) -> Option<String> {
    let path = finding.file_path.as_deref()?;
    Some(match finding.line_start {
        Some(line) => format!("{path}:{line}"),
        None => path.to_string(),
    })
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis Results")?;
        writeln!(f, "================")?;
        writeln!(
            f,
            "Risk: {} (score {}) | Findings: {} | Failed analyzers: {}\n",
            self.risk_level,
            self.risk_score,
            self.findings.len(),
            self.errors.len(),
        )?;

        if self.findings.is_empty() {
            writeln!(f, "No risks found.")?;
        } else {
            for finding in &self.findings {
                write!(f, "[{}] {}", finding.severity, finding.title)?;
                if let Some(loc) = location(finding) {
                    write!(f, " ({loc})")?;
                }
                writeln!(f)?;
                writeln!(f, "  {}: {}", finding.finding_type, finding.description)?;
                if let Some(snippet) = &finding.code_snippet {
                    writeln!(f, "  > {snippet}")?;
                }
                writeln!(f)?;
            }
        }

        if !self.solutions.is_empty() {
            writeln!(f, "Solutions")?;
            writeln!(f, "---------")?;
            for s in &self.solutions {
                writeln!(f, "[{}] {}: {}", s.urgency, s.finding_title, s.action)?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f, "\nPartial result, analyzers failed:")?;
            for e in &self.errors {
                writeln!(f, "  {}: {}", e.analyzer_name, e.error)?;
            }
        }
        Ok(())
    }
}

impl AnalysisResult {
    /// Render the result as markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use deploylens_core::AnalysisContext;
    /// use deploylens_review::pipeline::Orchestrator;
    /// use deploylens_review::state::MemoryStore;
    ///
    /// let result = Orchestrator::new(MemoryStore::new())
    ///     .analyze(&AnalysisContext::default())
    ///     .unwrap();
    /// let md = result.to_markdown();
    /// assert!(md.contains("# Analysis Results"));
    /// assert!(md.contains("No risks found."));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Analysis Results\n\n");
        out.push_str(&format!(
            "**Risk:** {} (score {}) | **Findings:** {} | **Failed analyzers:** {}\n\n",
            self.risk_level,
            self.risk_score,
            self.findings.len(),
            self.errors.len(),
        ));

        if self.findings.is_empty() {
            out.push_str("No risks found.\n");
        } else {
            for finding in &self.findings {
                out.push_str(&format!("## {} {}", finding.severity, finding.title));
                if let Some(loc) = location(finding) {
                    out.push_str(&format!(" (`{loc}`)"));
                }
                out.push_str("\n\n");
                out.push_str(&format!(
                    "**{}:** {}\n\n",
                    finding.finding_type, finding.description
                ));
                if let Some(snippet) = &finding.code_snippet {
                    out.push_str(&format!("```\n{snippet}\n```\n\n"));
                }
            }
        }

        if !self.solutions.is_empty() {
            out.push_str("## Solutions\n\n");
            for s in &self.solutions {
                out.push_str(&format!(
                    "- **{}** {}: {}\n",
                    s.urgency, s.finding_title, s.action
                ));
            }
        }

        if !self.errors.is_empty() {
            out.push_str("\n> **Partial result.** Failed analyzers:\n");
            for e in &self.errors {
                out.push_str(&format!("> - `{}`: {}\n", e.analyzer_name, e.error));
            }
        }
        out
    }
}
