//! Deployment runbooks derived from findings.
//!
//! A [`Runbook`] renders to markdown with [`Runbook::to_markdown`] and reads
//! back with [`Runbook::parse`]; parsing a rendered runbook gives the same runbook.

use std::collections::BTreeSet;
use std::fmt;

use deploylens_core::{Finding, FindingType, RunbookConfig, Severity};
use deploylens_difflens::risk::RiskScorer;
use serde::{Deserialize, Serialize};

const TITLE_PREFIX: &str = "# Deployment Runbook:";
const LEVEL_PREFIX: &str = "**Risk Level:**";
const SCORE_PREFIX: &str = "**Risk Score:**";

const PRE_DEPLOY_HEADER: &str = "## Pre-Deploy Checks";
const DEPLOY_HEADER: &str = "## Deploy Steps";
const POST_DEPLOY_HEADER: &str = "## Post-Deploy Verification";
const ROLLBACK_HEADER: &str = "## Rollback Plan";

/// A deployment procedure for one change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runbook {
    /// Title of the change being deployed.
    pub pr_title: String,
    /// Classified risk of the change.
    pub risk_level: Severity,
    /// Numeric risk score of the change.
    pub risk_score: u32,
    /// Checks to run before deploying.
    pub pre_deploy: Vec<String>,
    /// Ordered deploy steps.
    pub deploy: Vec<String>,
    /// Checks to run after deploying.
    pub post_deploy: Vec<String>,
    /// Ordered rollback steps.
    pub rollback: Vec<String>,
}

#[derive(Clone, Copy)]
enum Section {
    PreDeploy,
    Deploy,
    PostDeploy,
    Rollback,
}

impl Runbook {
    /// Render as markdown. Pre/post items are checkboxes; deploy and rollback
    /// items are numbered.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{TITLE_PREFIX} {}\n\n", self.pr_title));
        out.push_str(&format!("{LEVEL_PREFIX} {}\n", self.risk_level));
        out.push_str(&format!("{SCORE_PREFIX} {}\n", self.risk_score));

        push_checklist(&mut out, PRE_DEPLOY_HEADER, &self.pre_deploy);
        push_numbered(&mut out, DEPLOY_HEADER, &self.deploy);
        push_checklist(&mut out, POST_DEPLOY_HEADER, &self.post_deploy);
        push_numbered(&mut out, ROLLBACK_HEADER, &self.rollback);
        out
    }

    /// Read a runbook from markdown.
    ///
    /// Parsing is lenient: blank and unrecognized lines are skipped, a missing
    /// header keeps its default, and checklist or numbered items are accepted
    /// in any section.
    ///
    /// # Examples
    ///
    /// ```
    /// use deploylens_core::Severity;
    /// use deploylens_review::runbook::Runbook;
    ///
    /// let text = "# Deployment Runbook: Add index\n\
    ///             **Risk Level:** MEDIUM\n\
    ///             **Risk Score:** 30\n\
    ///             ### Deploy Steps\n\
    ///             1. Run the migration\n\
    ///             some stray note\n\
    ///             2. Deploy\n";
    /// let runbook = Runbook::parse(text);
    /// assert_eq!(runbook.pr_title, "Add index");
    /// assert_eq!(runbook.risk_level, Severity::Medium);
    /// assert_eq!(runbook.deploy, vec!["Run the migration", "Deploy"]);
    /// assert!(runbook.rollback.is_empty());
    /// ```
    pub fn parse(text: &str) -> Self {
        let mut runbook = Runbook {
            pr_title: String::new(),
            risk_level: Severity::Low,
            risk_score: 0,
            pre_deploy: Vec::new(),
            deploy: Vec::new(),
            post_deploy: Vec::new(),
            rollback: Vec::new(),
        };
        let mut section: Option<Section> = None;

        for line in text.lines() {
            if let Some(title) = header_value(line, TITLE_PREFIX) {
                runbook.pr_title = title.to_string();
                continue;
            }
            if let Some(level) = header_value(line, LEVEL_PREFIX) {
                if let Ok(level) = level.trim().parse() {
                    runbook.risk_level = level;
                }
                continue;
            }
            if let Some(score) = header_value(line, SCORE_PREFIX) {
                if let Ok(score) = score.trim().parse() {
                    runbook.risk_score = score;
                }
                continue;
            }

            match line.trim_end() {
                PRE_DEPLOY_HEADER => section = Some(Section::PreDeploy),
                DEPLOY_HEADER => section = Some(Section::Deploy),
                POST_DEPLOY_HEADER => section = Some(Section::PostDeploy),
                ROLLBACK_HEADER => section = Some(Section::Rollback),
                _ => {
                    let (Some(section), Some(item)) = (section, list_item(line)) else {
                        continue;
                    };
                    let target = match section {
                        Section::PreDeploy => &mut runbook.pre_deploy,
                        Section::Deploy => &mut runbook.deploy,
                        Section::PostDeploy => &mut runbook.post_deploy,
                        Section::Rollback => &mut runbook.rollback,
                    };
                    target.push(item.to_string());
                }
            }
        }
        runbook
    }
}

impl fmt::Display for Runbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markdown())
    }
}

fn push_checklist(out: &mut String, header: &str, items: &[String]) {
    out.push_str(&format!("\n{header}\n\n"));
    for item in items {
        out.push_str(&format!("- [ ] {item}\n"));
    }
}

fn push_numbered(out: &mut String, header: &str, items: &[String]) {
    out.push_str(&format!("\n{header}\n\n"));
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {item}\n", i + 1));
    }
}

/// Text after `prefix` and one optional space.
fn header_value<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(prefix)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Text of a `- [ ] `, `- [x] `, or `N. ` list item.
fn list_item(line: &str) -> Option<&str> {
    for prefix in ["- [ ] ", "- [x] ", "- [X] "] {
        if let Some(item) = line.strip_prefix(prefix) {
            return Some(item);
        }
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ")
}

/// Builds runbooks from findings.
///
/// # Examples
///
/// ```
/// use deploylens_core::{Finding, FindingType, Severity};
/// use deploylens_review::runbook::{Runbook, RunbookGenerator};
///
/// let generator = RunbookGenerator::default();
/// let findings = vec![Finding::new(
///     FindingType::DestructiveMigration,
///     Severity::Critical,
///     "DROP TABLE",
///     "drops legacy_orders",
/// )];
/// let runbook = generator.generate("Remove legacy orders", &findings);
/// assert_eq!(runbook.risk_score, 50);
/// assert!(runbook.deploy.iter().any(|s| s.contains("make db-migrate")));
/// assert_eq!(Runbook::parse(&runbook.to_markdown()), runbook);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunbookGenerator {
    scorer: RiskScorer,
    config: RunbookConfig,
}

impl RunbookGenerator {
    /// Create a generator with the given scorer and commands.
    pub fn new(scorer: RiskScorer, config: RunbookConfig) -> Self {
        Self { scorer, config }
    }

    /// Generate the runbook for a change titled `pr_title`.
    ///
    /// Every section starts with the baseline steps, followed by the steps for
    /// each finding type present, in [`FindingType`] order.
    pub fn generate(&self, pr_title: &str, findings: &[Finding]) -> Runbook {
        let risk_score = self.scorer.score(findings);
        let present: BTreeSet<FindingType> = findings.iter().map(|f| f.finding_type).collect();

        let mut runbook = Runbook {
            pr_title: single_line(pr_title),
            risk_level: self.scorer.classify(risk_score),
            risk_score,
            pre_deploy: strings(&[
                "Confirm CI is green on the release commit",
                "Review the risk findings for this change",
                "Tell the on-call engineer about the deploy window",
            ]),
            deploy: strings(&[
                "Deploy to staging and run the smoke tests",
                "Deploy to production",
            ]),
            post_deploy: strings(&[
                "Verify health checks pass on every instance",
                "Watch error rates and latency for 30 minutes",
            ]),
            rollback: strings(&[
                "Redeploy the previous release",
                "Confirm the previous release is serving traffic",
            ]),
        };

        for finding_type in present {
            self.add_steps(&mut runbook, finding_type);
        }

        tracing::debug!(
            score = runbook.risk_score,
            level = %runbook.risk_level,
            "generated runbook"
        );
        runbook
    }

    fn add_steps(&self, runbook: &mut Runbook, finding_type: FindingType) {
        match finding_type {
            FindingType::DestructiveMigration => {
                runbook.pre_deploy.push(
                    "Back up every table the migration touches and check that the backup restores"
                        .into(),
                );
                runbook.deploy.push(format!(
                    "Apply database migrations: `{}`",
                    single_line(&self.config.migrate_command)
                ));
                runbook.post_deploy.push(
                    "Run data integrity checks on migrated tables (row counts, constraints, nullability)"
                        .into(),
                );
                runbook.rollback.push(format!(
                    "Roll back the migration: `{}`",
                    single_line(&self.config.rollback_command)
                ));
                runbook.rollback.push(
                    "WARNING: data removed by a destructive migration is not restored by rolling back; restore it from the pre-deploy backup"
                        .into(),
                );
            }
            FindingType::BreakingApiChange => {
                runbook.pre_deploy.push(
                    "Notify API consumers of the breaking change and confirm their upgrade plan"
                        .into(),
                );
                runbook
                    .post_deploy
                    .push("Check API health endpoints and consumer error rates".into());
                runbook.rollback.push(
                    "Tell API consumers the previous API version is back in service".into(),
                );
            }
            FindingType::PermissionChange => {
                runbook
                    .pre_deploy
                    .push("Have a security owner review the permission changes".into());
                runbook.post_deploy.push(
                    "Verify affected roles can reach only the resources they should".into(),
                );
            }
            FindingType::LowCoverage => {
                runbook.pre_deploy.push(
                    "Add tests for the uncovered changes, or run a manual test pass before deploying"
                        .into(),
                );
            }
            FindingType::ConfigChange => {
                runbook.pre_deploy.push(
                    "Confirm the new configuration values exist in every target environment".into(),
                );
                runbook
                    .post_deploy
                    .push("Verify the service loaded the new configuration".into());
            }
            FindingType::DependencyChange => {
                runbook.pre_deploy.push(
                    "Review changelogs and security advisories for the changed dependencies".into(),
                );
            }
        }
    }
}

/// Runbook lines cannot span lines of markdown.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
