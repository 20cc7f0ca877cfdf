//! Pattern rules from `[[rules]]` in `.deploylens.toml`, each run as an analyzer.

use deploylens_core::{AnalysisContext, DeployLensError, Finding, Result, Rule};
use deploylens_difflens::parser::{added_line_numbers, added_lines};
use regex::Regex;

use crate::analyzer::Analyzer;

/// Matches one rule's regex against every added line.
///
/// # Examples
///
/// ```
/// use deploylens_core::{FindingType, Rule, Severity};
/// use deploylens_review::analyzer::Analyzer;
/// use deploylens_review::rules::RuleAnalyzer;
///
/// let rule = Rule {
///     name: "drop-table".into(),
///     finding_type: FindingType::DestructiveMigration,
///     severity: Severity::Critical,
///     pattern: r"(?i)\bdrop\s+table\b".into(),
///     title: "Table dropped".into(),
///     description: None,
///     remediation: None,
///     extensions: vec!["sql".into()],
/// };
/// let analyzer = RuleAnalyzer::from_rule(&rule).unwrap();
/// assert_eq!(analyzer.name(), "drop-table");
/// assert_eq!(analyzer.supported_extensions(), ["sql"]);
/// ```
#[derive(Debug, Clone)]
pub struct RuleAnalyzer {
    rule: Rule,
    regex: Regex,
    extensions: Vec<String>,
}

impl RuleAnalyzer {
    /// Compile a rule.
    ///
    /// # Errors
    ///
    /// Returns [`DeployLensError::Config`] if the pattern is not a valid regex.
    pub fn from_rule(rule: &Rule) -> Result<Self> {
        let regex = Regex::new(&rule.pattern).map_err(|e| {
            DeployLensError::Config(format!("rule `{}` has an invalid pattern: {e}", rule.name))
        })?;
        let extensions = rule
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        Ok(Self {
            rule: rule.clone(),
            regex,
            extensions,
        })
    }

    /// The rule this analyzer was built from.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    fn finding(&self, path: &str, line_no: u32, line: &str) -> Finding {
        let description = self
            .rule
            .description
            .clone()
            .unwrap_or_else(|| self.rule.title.clone());

        let mut finding = Finding::new(
            self.rule.finding_type,
            self.rule.severity,
            self.rule.title.clone(),
            description,
        )
        .with_location(path, line_no, line_no)
        .with_snippet(line.trim())
        .with_metadata("rule", serde_json::Value::String(self.rule.name.clone()));

        if let Some(remediation) = &self.rule.remediation {
            finding = finding.with_remediation(remediation.clone());
        }
        finding
    }
}

impl Analyzer for RuleAnalyzer {
    fn name(&self) -> &str {
        &self.rule.name
    }

    fn supported_extensions(&self) -> &[String] {
        &self.extensions
    }

    fn analyze(&self, context: &AnalysisContext) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for file in context.files.iter().filter(|f| self.supports(f)) {
            for hunk in &file.hunks {
                let lines = added_lines(&hunk.content);
                let numbers = added_line_numbers(&hunk.content);
                for (line, line_no) in lines.into_iter().zip(numbers) {
                    if self.regex.is_match(line) {
                        findings.push(self.finding(&file.path, line_no, line));
                    }
                }
            }
        }
        Ok(findings)
    }
}

/// Build one analyzer per rule, in order.
///
/// # Errors
///
/// Returns the first invalid pattern as [`DeployLensError::Config`].
pub fn rule_analyzers(rules: &[Rule]) -> Result<Vec<Box<dyn Analyzer>>> {
    rules
        .iter()
        .map(|rule| RuleAnalyzer::from_rule(rule).map(|a| Box::new(a) as Box<dyn Analyzer>))
        .collect()
}
