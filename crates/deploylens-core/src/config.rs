use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DeployLensError;
use crate::types::{FindingType, Severity};

/// Top-level configuration loaded from `.deploylens.toml`.
///
/// Every section is optional; missing sections and fields fall back to defaults.
///
/// # Examples
///
/// ```
/// use deploylens_core::DeployLensConfig;
///
/// let config = DeployLensConfig::default();
/// assert_eq!(config.scoring.critical, 80);
/// assert!(config.rules.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployLensConfig {
    /// Settings handed to every analyzer.
    #[serde(default)]
    pub analysis: RepoConfig,
    /// Risk level thresholds.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Commands substituted into generated runbooks.
    #[serde(default)]
    pub runbook: RunbookConfig,
    /// Pattern rules, each run as its own analyzer.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl DeployLensConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployLensError::Io`] if the file cannot be read,
    /// [`DeployLensError::Toml`] if the content is not valid TOML, or
    /// [`DeployLensError::Config`] if the values are inconsistent.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deploylens_core::DeployLensConfig;
    /// use std::path::Path;
    ///
    /// let config = DeployLensConfig::from_file(Path::new(".deploylens.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, DeployLensError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`DeployLensError::Toml`] if parsing fails, or
    /// [`DeployLensError::Config`] if the scoring thresholds are not ascending.
    ///
    /// # Examples
    ///
    /// ```
    /// use deploylens_core::DeployLensConfig;
    ///
    /// let toml = r#"
    /// [analysis]
    /// ignore_patterns = ["docs/", "*.lock"]
    /// "#;
    /// let config = DeployLensConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.ignore_patterns.len(), 2);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, DeployLensError> {
        let config: Self = toml::from_str(content)?;
        config.scoring.validate()?;
        Ok(config)
    }
}

/// Repository-level analysis settings, passed to analyzers inside the
/// analysis context.
///
/// # Examples
///
/// ```
/// use deploylens_core::RepoConfig;
///
/// let config = RepoConfig::default();
/// assert!(config.ignore_patterns.is_empty());
/// assert!(config.analyzer_settings("migrations").is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Paths to leave out of the analysis context. Plain entries match by
    /// equality or prefix; `*` and `?` act as wildcards.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Free-form settings tables keyed by analyzer name.
    #[serde(default)]
    pub analyzers: toml::Table,
}

impl RepoConfig {
    /// Settings table for the analyzer called `name`, if configured.
    pub fn analyzer_settings(&self, name: &str) -> Option<&toml::Table> {
        self.analyzers.get(name).and_then(toml::Value::as_table)
    }
}

/// Score cut points for the risk level bands.
///
/// A score below `medium` is LOW, below `high` is MEDIUM, below `critical`
/// is HIGH, anything else is CRITICAL.
///
/// # Examples
///
/// ```
/// use deploylens_core::ScoringConfig;
///
/// let config = ScoringConfig::default();
/// assert_eq!((config.medium, config.high, config.critical), (25, 50, 80));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Lowest MEDIUM score (default: 25).
    #[serde(default = "default_medium")]
    pub medium: u32,
    /// Lowest HIGH score (default: 50).
    #[serde(default = "default_high")]
    pub high: u32,
    /// Lowest CRITICAL score (default: 80).
    #[serde(default = "default_critical")]
    pub critical: u32,
}

fn default_medium() -> u32 {
    25
}

fn default_high() -> u32 {
    50
}

fn default_critical() -> u32 {
    80
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            medium: default_medium(),
            high: default_high(),
            critical: default_critical(),
        }
    }
}

impl ScoringConfig {
    /// Check that the cut points are strictly ascending.
    ///
    /// # Errors
    ///
    /// Returns [`DeployLensError::Config`] when the bands would overlap or leave a gap.
    pub fn validate(&self) -> Result<(), DeployLensError> {
        if self.medium < self.high && self.high < self.critical {
            Ok(())
        } else {
            Err(DeployLensError::Config(format!(
                "scoring thresholds must be ascending (medium < high < critical), got {}/{}/{}",
                self.medium, self.high, self.critical
            )))
        }
    }
}

/// Commands referenced by generated runbook steps.
///
/// # Examples
///
/// ```
/// use deploylens_core::RunbookConfig;
///
/// let config = RunbookConfig::default();
/// assert_eq!(config.migrate_command, "make db-migrate");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunbookConfig {
    /// Command that applies pending migrations.
    #[serde(default = "default_migrate_command")]
    pub migrate_command: String,
    /// Command that reverts the last applied migration.
    #[serde(default = "default_rollback_command")]
    pub rollback_command: String,
}

fn default_migrate_command() -> String {
    "make db-migrate".into()
}

fn default_rollback_command() -> String {
    "make db-rollback".into()
}

impl Default for RunbookConfig {
    fn default() -> Self {
        Self {
            migrate_command: default_migrate_command(),
            rollback_command: default_rollback_command(),
        }
    }
}

/// A pattern rule matched against added lines.
///
/// # Examples
///
/// ```
/// use deploylens_core::{FindingType, Rule, Severity};
///
/// let toml = r#"
/// name = "drop-table"
/// finding_type = "DESTRUCTIVE_MIGRATION"
/// severity = "critical"
/// pattern = "(?i)drop\\s+table"
/// title = "Table dropped"
/// extensions = ["sql"]
/// "#;
/// let rule: Rule = toml::from_str(toml).unwrap();
/// assert_eq!(rule.finding_type, FindingType::DestructiveMigration);
/// assert_eq!(rule.severity, Severity::Critical);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule name; also the analyzer name.
    pub name: String,
    /// Category of the emitted findings.
    pub finding_type: FindingType,
    /// Severity of the emitted findings.
    pub severity: Severity,
    /// Regular expression matched against each added line.
    pub pattern: String,
    /// Finding title.
    pub title: String,
    /// Finding description (defaults to the title).
    pub description: Option<String>,
    /// Suggested fix attached to each finding.
    pub remediation: Option<String>,
    /// File extensions the rule applies to; empty means every file.
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = DeployLensConfig::default();
        assert!(config.analysis.ignore_patterns.is_empty());
        assert!(config.analysis.analyzers.is_empty());
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(config.runbook.rollback_command, "make db-rollback");
        assert!(config.rules.is_empty());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = DeployLensConfig::from_toml("").unwrap();
        assert_eq!(config.scoring.medium, 25);
        assert_eq!(config.runbook.migrate_command, "make db-migrate");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[analysis]
ignore_patterns = ["vendor/", "*.min.js"]

[analysis.analyzers.coverage]
threshold = 80

[scoring]
medium = 35
high = 60
critical = 90

[runbook]
migrate_command = "npm run migrate"
rollback_command = "npm run migrate:down"

[[rules]]
name = "drop-column"
finding_type = "destructive_migration"
severity = "HIGH"
pattern = "DROP COLUMN"
title = "Column dropped"
remediation = "Deprecate the column first"
extensions = ["sql"]
"#;
        let config = DeployLensConfig::from_toml(toml).unwrap();
        assert_eq!(config.analysis.ignore_patterns, vec!["vendor/", "*.min.js"]);
        let coverage = config.analysis.analyzer_settings("coverage").unwrap();
        assert_eq!(coverage["threshold"].as_integer(), Some(80));
        assert_eq!(config.scoring.high, 60);
        assert_eq!(config.runbook.migrate_command, "npm run migrate");
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].finding_type, FindingType::DestructiveMigration);
        assert_eq!(config.rules[0].severity, Severity::High);
        assert_eq!(config.rules[0].description, None);
    }

    #[test]
    fn partial_scoring_section_keeps_other_defaults() {
        let config = DeployLensConfig::from_toml("[scoring]\ncritical = 120\n").unwrap();
        assert_eq!(config.scoring.medium, 25);
        assert_eq!(config.scoring.high, 50);
        assert_eq!(config.scoring.critical, 120);
    }

    #[test]
    fn non_ascending_thresholds_rejected() {
        let err = DeployLensConfig::from_toml("[scoring]\nmedium = 60\nhigh = 50\n").unwrap_err();
        assert!(matches!(err, DeployLensError::Config(_)));
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = DeployLensConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(DeployLensError::Toml(_))));
    }

    #[test]
    fn unknown_finding_type_in_rule_rejected() {
        let toml = r#"
[[rules]]
name = "x"
finding_type = "SQL_INJECTION"
severity = "low"
pattern = "x"
title = "x"
"#;
        assert!(DeployLensConfig::from_toml(toml).is_err());
    }

    #[test]
    fn analyzer_settings_ignores_non_tables() {
        let config = DeployLensConfig::from_toml("[analysis.analyzers]\nflag = true\n").unwrap();
        assert!(config.analysis.analyzer_settings("flag").is_none());
    }
}
