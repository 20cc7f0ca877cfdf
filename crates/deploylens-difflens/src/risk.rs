use std::collections::BTreeMap;
use std::fmt;

use deploylens_core::{Finding, FindingType, ScoringConfig, Severity};
use serde::{Deserialize, Serialize};

/// Turns findings into a numeric risk score and a risk level.
///
/// The score is the sum of the fixed weight of each finding's type, so it is
/// additive over any split of the findings. Severity does not affect the score.
///
/// # Examples
///
/// ```
/// use deploylens_core::{Finding, FindingType, Severity};
/// use deploylens_difflens::risk::RiskScorer;
///
/// let scorer = RiskScorer::default();
/// let findings = vec![Finding::new(
///     FindingType::DestructiveMigration,
///     Severity::Critical,
///     "DROP TABLE",
///     "drops the orders table",
/// )];
/// assert_eq!(scorer.score(&findings), 50);
/// assert_eq!(scorer.classify(50), Severity::High);
/// assert_eq!(scorer.score(&[]), 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer {
    thresholds: ScoringConfig,
}

impl RiskScorer {
    /// Create a scorer with the given level thresholds.
    pub fn new(thresholds: ScoringConfig) -> Self {
        Self { thresholds }
    }

    /// The thresholds this scorer classifies with.
    pub fn thresholds(&self) -> ScoringConfig {
        self.thresholds
    }

    /// Sum of the weights of every finding.
    pub fn score(&self, findings: &[Finding]) -> u32 {
        findings.iter().map(|f| f.finding_type.weight()).sum()
    }

    /// Map a score to a level. A score equal to a threshold lands in the higher band.
    ///
    /// # Examples
    ///
    /// ```
    /// use deploylens_core::Severity;
    /// use deploylens_difflens::risk::RiskScorer;
    ///
    /// let scorer = RiskScorer::default();
    /// assert_eq!(scorer.classify(0), Severity::Low);
    /// assert_eq!(scorer.classify(24), Severity::Low);
    /// assert_eq!(scorer.classify(25), Severity::Medium);
    /// assert_eq!(scorer.classify(80), Severity::Critical);
    /// ```
    pub fn classify(&self, score: u32) -> Severity {
        if score < self.thresholds.medium {
            Severity::Low
        } else if score < self.thresholds.high {
            Severity::Medium
        } else if score < self.thresholds.critical {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    /// Score the findings and report each type's contribution.
    ///
    /// Entries appear in [`FindingType`] declaration order, one per type present.
    pub fn score_with_breakdown(&self, findings: &[Finding]) -> RiskScoreBreakdown {
        let mut counts: BTreeMap<FindingType, u32> = BTreeMap::new();
        for finding in findings {
            *counts.entry(finding.finding_type).or_insert(0) += 1;
        }

        let breakdown: Vec<BreakdownEntry> = counts
            .into_iter()
            .map(|(finding_type, count)| BreakdownEntry {
                finding_type,
                count,
                base_score: finding_type.weight(),
                subtotal: finding_type.weight() * count,
            })
            .collect();

        let total_score = breakdown.iter().map(|e| e.subtotal).sum();
        RiskScoreBreakdown {
            total_score,
            risk_level: self.classify(total_score),
            breakdown,
        }
    }
}

/// Total score with the contribution of each finding type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScoreBreakdown {
    /// Sum of every entry's subtotal.
    pub total_score: u32,
    /// Classified level of `total_score`.
    pub risk_level: Severity,
    /// One entry per finding type present.
    pub breakdown: Vec<BreakdownEntry>,
}

/// Contribution of one finding type to the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    /// The finding type.
    pub finding_type: FindingType,
    /// Number of findings of this type.
    pub count: u32,
    /// Weight of one finding.
    pub base_score: u32,
    /// `count * base_score`.
    pub subtotal: u32,
}

impl fmt::Display for RiskScoreBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Risk Score: {} ({})", self.total_score, self.risk_level)?;

        if !self.breakdown.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "{:<24} {:>6} {:>8} {:>9}",
                "Type", "Count", "Weight", "Subtotal"
            )?;
            writeln!(f, "{}", "-".repeat(50))?;
            for entry in &self.breakdown {
                writeln!(
                    f,
                    "{:<24} {:>6} {:>8} {:>9}",
                    entry.finding_type.to_string(),
                    entry.count,
                    entry.base_score,
                    entry.subtotal,
                )?;
            }
        }
        Ok(())
    }
}

impl RiskScoreBreakdown {
    /// Render the breakdown as a markdown table.
    ///
    /// # Examples
    ///
    /// ```
    /// use deploylens_difflens::risk::RiskScorer;
    ///
    /// let md = RiskScorer::default().score_with_breakdown(&[]).to_markdown();
    /// assert!(md.contains("**Risk Score:** 0 (LOW)"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "**Risk Score:** {} ({})\n\n",
            self.total_score, self.risk_level
        ));

        if !self.breakdown.is_empty() {
            out.push_str("| Type | Count | Weight | Subtotal |\n");
            out.push_str("|------|-------|--------|----------|\n");
            for entry in &self.breakdown {
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    entry.finding_type, entry.count, entry.base_score, entry.subtotal
                ));
            }
        }
        out
    }
}
