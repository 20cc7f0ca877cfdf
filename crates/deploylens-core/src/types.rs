use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::RepoConfig;

/// A single hunk from a unified diff.
///
/// `content` holds the hunk verbatim: the `@@` header line followed by every
/// context, added, and removed line, each terminated by `\n`.
///
/// # Examples
///
/// ```
/// use deploylens_core::DiffHunk;
///
/// let hunk = DiffHunk {
///     old_start: 10,
///     old_lines: 5,
///     new_start: 10,
///     new_lines: 6,
///     content: "@@ -10,5 +10,6 @@\n+ new line\n".into(),
/// };
/// assert_eq!(hunk.new_lines, 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version (1 when the header omits it).
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version (1 when the header omits it).
    pub new_lines: u32,
    /// Header line plus raw hunk lines.
    pub content: String,
}

impl DiffHunk {
    /// Number of added lines in this hunk.
    pub fn additions(&self) -> usize {
        self.content
            .lines()
            .filter(|l| l.starts_with('+') && !l.starts_with("+++"))
            .count()
    }

    /// Number of removed lines in this hunk.
    pub fn deletions(&self) -> usize {
        self.content
            .lines()
            .filter(|l| l.starts_with('-') && !l.starts_with("---"))
            .count()
    }
}

/// How a file changed between the two revisions.
///
/// # Examples
///
/// ```
/// use deploylens_core::FileStatus;
///
/// assert_eq!(FileStatus::Renamed.to_string(), "renamed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// File did not exist at the base revision.
    Added,
    /// File exists at both revisions.
    Modified,
    /// File does not exist at the head revision.
    Deleted,
    /// File moved from another path.
    Renamed,
    /// File copied from another path.
    Copied,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "added"),
            FileStatus::Modified => write!(f, "modified"),
            FileStatus::Deleted => write!(f, "deleted"),
            FileStatus::Renamed => write!(f, "renamed"),
            FileStatus::Copied => write!(f, "copied"),
        }
    }
}

/// One file entry of a parsed diff.
///
/// # Examples
///
/// ```
/// use deploylens_core::{DiffFile, FileStatus};
///
/// let file = DiffFile {
///     path: "assets/logo.png".into(),
///     old_path: None,
///     status: FileStatus::Modified,
///     hunks: vec![],
///     is_binary: true,
/// };
/// assert!(file.hunks.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffFile {
    /// Path at the head revision.
    pub path: String,
    /// Previous path, set only for renames where the path actually changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    /// Change classification.
    pub status: FileStatus,
    /// Parsed hunks; always empty for binary files.
    pub hunks: Vec<DiffHunk>,
    /// Whether git reported the file as binary.
    pub is_binary: bool,
}

impl DiffFile {
    /// Total added lines across all hunks.
    pub fn added_lines(&self) -> usize {
        self.hunks.iter().map(DiffHunk::additions).sum()
    }

    /// Total removed lines across all hunks.
    pub fn removed_lines(&self) -> usize {
        self.hunks.iter().map(DiffHunk::deletions).sum()
    }
}

impl fmt::Display for DiffFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_path {
            Some(old) => write!(f, "{old} -> {} ({})", self.path, self.status),
            None => write!(f, "{} ({})", self.path, self.status),
        }
    }
}

/// The full parse of one diff invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// Base revision the diff was taken against.
    pub base: String,
    /// Head revision (empty when diffing the working tree or index).
    pub head: String,
    /// Files in the order they appear in the diff.
    pub files: Vec<DiffFile>,
    /// The unparsed diff text, kept for display and audit.
    pub raw_diff: String,
}

/// Before/after content for a single changed file.
///
/// # Examples
///
/// ```
/// use deploylens_core::FileChange;
///
/// let change = FileChange {
///     path: "db/migrate/001_init.sql".into(),
///     old_content: None,
///     new_content: Some("CREATE TABLE users (id INT);\n".into()),
///     hunks: vec![],
/// };
/// assert!(change.is_new());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// Path at the head revision.
    pub path: String,
    /// Content at the base revision; `None` when the file was added.
    pub old_content: Option<String>,
    /// Content at the head revision; `None` when the file was deleted.
    pub new_content: Option<String>,
    /// Hunks from the diff for this file.
    pub hunks: Vec<DiffHunk>,
}

impl FileChange {
    /// Returns `true` if the file did not exist at the base revision.
    pub fn is_new(&self) -> bool {
        self.old_content.is_none()
    }

    /// Returns `true` if the file no longer exists at the head revision.
    pub fn is_deleted(&self) -> bool {
        self.new_content.is_none()
    }

    /// Lowercased file extension, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use deploylens_core::FileChange;
    ///
    /// let change = FileChange {
    ///     path: "api/openapi.YAML".into(),
    ///     old_content: None,
    ///     new_content: None,
    ///     hunks: vec![],
    /// };
    /// assert_eq!(change.extension().as_deref(), Some("yaml"));
    /// ```
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// Everything an analyzer gets to look at for one run.
///
/// Built once by the context builder and shared read-only with every analyzer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisContext {
    /// Non-binary, non-ignored changed files with their content.
    pub files: Vec<FileChange>,
    /// Raw unified diff text.
    pub diff: String,
    /// Repository-level analysis configuration.
    pub repo_config: RepoConfig,
}

/// Category of a detected deployment risk.
///
/// The set is closed: every type has a fixed weight used by the risk scorer.
///
/// # Examples
///
/// ```
/// use deploylens_core::FindingType;
///
/// assert_eq!(FindingType::DestructiveMigration.weight(), 50);
/// assert_eq!(FindingType::DestructiveMigration.to_string(), "DESTRUCTIVE_MIGRATION");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingType {
    /// Schema migration that drops or rewrites data.
    #[serde(alias = "destructive_migration")]
    DestructiveMigration,
    /// Change that breaks existing API consumers.
    #[serde(alias = "breaking_api_change")]
    BreakingApiChange,
    /// Change to roles, scopes, or access policies.
    #[serde(alias = "permission_change")]
    PermissionChange,
    /// Changed code without adequate test coverage.
    #[serde(alias = "low_coverage")]
    LowCoverage,
    /// Change to runtime or deployment configuration.
    #[serde(alias = "config_change")]
    ConfigChange,
    /// Added, removed, or upgraded dependency.
    #[serde(alias = "dependency_change")]
    DependencyChange,
}

impl FindingType {
    /// Every finding type, in declaration order.
    pub const ALL: [FindingType; 6] = [
        FindingType::DestructiveMigration,
        FindingType::BreakingApiChange,
        FindingType::PermissionChange,
        FindingType::LowCoverage,
        FindingType::ConfigChange,
        FindingType::DependencyChange,
    ];

    /// Fixed score contribution of one finding of this type.
    pub fn weight(self) -> u32 {
        match self {
            FindingType::DestructiveMigration => 50,
            FindingType::BreakingApiChange => 40,
            FindingType::PermissionChange => 35,
            FindingType::LowCoverage => 20,
            FindingType::ConfigChange => 15,
            FindingType::DependencyChange => 10,
        }
    }

    /// Mitigation recommended when a finding carries no remediation of its own.
    pub fn default_mitigation(self) -> &'static str {
        match self {
            FindingType::DestructiveMigration => {
                "Back up affected tables and split the migration into an additive step and a later cleanup step"
            }
            FindingType::BreakingApiChange => {
                "Version the endpoint or keep the old contract until all consumers have migrated"
            }
            FindingType::PermissionChange => {
                "Have the permission change reviewed by a security owner before release"
            }
            FindingType::LowCoverage => "Add tests that exercise the changed code paths",
            FindingType::ConfigChange => {
                "Confirm the new configuration exists in every target environment"
            }
            FindingType::DependencyChange => {
                "Review the dependency changelog and scan the new version for advisories"
            }
        }
    }
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FindingType::DestructiveMigration => "DESTRUCTIVE_MIGRATION",
            FindingType::BreakingApiChange => "BREAKING_API_CHANGE",
            FindingType::PermissionChange => "PERMISSION_CHANGE",
            FindingType::LowCoverage => "LOW_COVERAGE",
            FindingType::ConfigChange => "CONFIG_CHANGE",
            FindingType::DependencyChange => "DEPENDENCY_CHANGE",
        };
        f.write_str(s)
    }
}

impl FromStr for FindingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        FindingType::ALL
            .into_iter()
            .find(|t| t.to_string() == normalized)
            .ok_or_else(|| format!("unknown finding type: {s}"))
    }
}

/// Ordinal risk level, used both for individual findings and for the
/// classified total score.
///
/// Ordering: `Low < Medium < High < Critical`.
///
/// # Examples
///
/// ```
/// use deploylens_core::Severity;
///
/// let s: Severity = serde_json::from_str("\"HIGH\"").unwrap();
/// assert_eq!(s, Severity::High);
/// assert!(Severity::Critical > Severity::High);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Routine change.
    #[serde(alias = "low")]
    Low,
    /// Needs attention during deploy.
    #[serde(alias = "medium")]
    Medium,
    /// Needs an explicit plan before deploy.
    #[serde(alias = "high")]
    High,
    /// Should block the deploy until mitigated.
    #[serde(alias = "critical")]
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

impl Severity {
    /// Returns `true` if `self` is at least as severe as `threshold`.
    ///
    /// # Examples
    ///
    /// ```
    /// use deploylens_core::Severity;
    ///
    /// assert!(Severity::Critical.meets_threshold(Severity::High));
    /// assert!(Severity::High.meets_threshold(Severity::High));
    /// assert!(!Severity::Medium.meets_threshold(Severity::High));
    /// ```
    pub fn meets_threshold(self, threshold: Severity) -> bool {
        self >= threshold
    }
}

/// One detected risk instance emitted by an analyzer.
///
/// # Examples
///
/// ```
/// use deploylens_core::{Finding, FindingType, Severity};
///
/// let finding = Finding::new(
///     FindingType::DestructiveMigration,
///     Severity::Critical,
///     "DROP TABLE in migration",
///     "The migration drops the `orders` table.",
/// )
/// .with_location("db/migrate/004.sql", 3, 3);
/// assert_eq!(finding.line_start, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Risk category.
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    /// Severity of this instance.
    pub severity: Severity,
    /// Short headline.
    pub title: String,
    /// Explanation of the risk.
    pub description: String,
    /// File the finding points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// First affected line in the new version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    /// Last affected line in the new version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    /// Offending code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    /// Suggested fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Free-form analyzer-specific data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

impl Finding {
    /// Create a finding with no location or extras.
    pub fn new(
        finding_type: FindingType,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            finding_type,
            severity,
            title: title.into(),
            description: description.into(),
            file_path: None,
            line_start: None,
            line_end: None,
            code_snippet: None,
            remediation: None,
            metadata: None,
        }
    }

    /// Attach a file and line range.
    pub fn with_location(mut self, path: impl Into<String>, start: u32, end: u32) -> Self {
        self.file_path = Some(path.into());
        self.line_start = Some(start);
        self.line_end = Some(end);
        self
    }

    /// Attach the offending code.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(snippet.into());
        self
    }

    /// Attach a suggested fix.
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// Add one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }
}

/// Record of an analyzer that failed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerError {
    /// Name of the failing analyzer.
    pub analyzer_name: String,
    /// Error message.
    pub error: String,
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use deploylens_core::OutputFormat;
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
