use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use deploylens_core::Severity;
use deploylens_review::runbook::Runbook;

const DIFF: &str = "\
diff --git a/db/002_drop.sql b/db/002_drop.sql
new file mode 100644
--- /dev/null
+++ b/db/002_drop.sql
@@ -0,0 +1,2 @@
+DROP TABLE sessions;
+DROP TABLE tokens;
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-old
+new
";

fn deploylens(dir: &std::path::Path, args: &[&str], stdin: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_deploylens"))
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    // The child may exit before reading stdin.
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    child.wait_with_output().unwrap()
}

#[test]
fn diff_summarizes_stdin_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = deploylens(dir.path(), &["diff", "--format", "json"], DIFF);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["totalFiles"], 2);
    assert_eq!(summary["totalAdditions"], 3);
    assert_eq!(summary["totalDeletions"], 1);
    assert_eq!(summary["files"][0]["status"], "added");
}

#[test]
fn diff_rejects_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let output = deploylens(dir.path(), &["diff"], "  \n");
    assert!(!output.status.success());
}

#[test]
fn runbook_from_findings_then_parse_back() {
    let dir = tempfile::tempdir().unwrap();
    let findings = r#"[
        {"type": "DESTRUCTIVE_MIGRATION", "severity": "CRITICAL", "title": "DROP TABLE", "description": "drops sessions"}
    ]"#;
    std::fs::write(dir.path().join("findings.json"), findings).unwrap();

    let output = deploylens(
        dir.path(),
        &["runbook", "--findings", "findings.json", "--title", "Drop sessions", "--format", "markdown"],
        "",
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let markdown = String::from_utf8(output.stdout).unwrap();
    assert!(markdown.starts_with("# Deployment Runbook: Drop sessions\n"));
    assert!(markdown.contains("make db-migrate"));

    std::fs::write(dir.path().join("RUNBOOK.md"), &markdown).unwrap();
    let output = deploylens(dir.path(), &["runbook", "--parse", "RUNBOOK.md", "--format", "json"], "");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let runbook: Runbook = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(runbook.pr_title, "Drop sessions");
    assert_eq!(runbook.risk_score, 50);
    assert_eq!(runbook.risk_level, Severity::High);
    assert_eq!(runbook.to_markdown(), markdown);
}

#[test]
fn runbook_uses_configured_commands() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".deploylens.toml"),
        "[runbook]\nmigrate_command = \"npm run migrate\"\n",
    )
    .unwrap();

    let findings = r#"[{"type": "DESTRUCTIVE_MIGRATION", "severity": "HIGH", "title": "t", "description": "d"}]"#;
    let output = deploylens(dir.path(), &["runbook", "--format", "json"], findings);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let runbook: Runbook = serde_json::from_slice(&output.stdout).unwrap();
    assert!(runbook.deploy.iter().any(|s| s.contains("npm run migrate")));
    assert!(runbook.rollback.iter().any(|s| s.contains("make db-rollback")));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".deploylens.toml"),
        "[scoring]\nmedium = 90\nhigh = 50\ncritical = 80\n",
    )
    .unwrap();

    let output = deploylens(dir.path(), &["diff"], DIFF);
    assert!(!output.status.success());
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=deploylens",
            "-c",
            "user.email=deploylens@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&output.stderr));
}

const RULES: &str = r#"
[[rules]]
name = "drop-table"
finding_type = "DESTRUCTIVE_MIGRATION"
severity = "high"
pattern = "(?i)\\bdrop\\s+table\\b"
title = "Table dropped"
extensions = ["sql"]
"#;

/// A repository on `main` with a `drop-table` rule committed and a staged
/// migration that drops a table.
fn repo_with_migration() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    git(root, &["init", "-q"]);
    git(root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    std::fs::write(root.join(".deploylens.toml"), RULES).unwrap();
    std::fs::create_dir_all(root.join("db")).unwrap();
    std::fs::write(root.join("db/001_init.sql"), "CREATE TABLE sessions (id INT);\n").unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "initial"]);

    std::fs::write(root.join("db/002_drop.sql"), "DROP TABLE sessions;\n").unwrap();
    git(root, &["add", "db/002_drop.sql"]);
    dir
}

fn analyze_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "invalid JSON ({e}); stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[test]
fn analyze_fail_on_high_exits_one_and_saves_result() {
    let dir = repo_with_migration();
    let output = deploylens(
        dir.path(),
        &["analyze", "--fail-on", "high", "--save", "--format", "json"],
        "",
    );
    assert_eq!(output.status.code(), Some(1), "{}", String::from_utf8_lossy(&output.stderr));

    let json = analyze_json(&output);
    assert_eq!(json["result"]["riskScore"], 50);
    assert_eq!(json["result"]["riskLevel"], "HIGH");
    assert_eq!(json["result"]["findings"][0]["filePath"], "db/002_drop.sql");
    assert_eq!(json["result"]["findings"][0]["lineStart"], 1);
    assert_eq!(json["runbook"]["prTitle"], "main");

    let id = json["result"]["id"].as_str().unwrap();
    let saved = dir.path().join(format!(".deploylens/results/{id}.json"));
    assert!(saved.exists(), "missing {}", saved.display());
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(saved).unwrap()).unwrap();
    assert_eq!(stored["id"], id);
}

#[test]
fn analyze_below_fail_on_threshold_exits_zero() {
    let dir = repo_with_migration();
    let output = deploylens(dir.path(), &["analyze", "--fail-on", "critical"], "");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("Table dropped"));
    assert!(text.contains("# Deployment Runbook: main"));
    assert!(!dir.path().join(".deploylens/results").exists());
}

#[test]
fn analyze_reads_config_from_repo_root() {
    let dir = repo_with_migration();
    let elsewhere = tempfile::tempdir().unwrap();

    let repo = dir.path().to_str().unwrap();
    let output = deploylens(
        elsewhere.path(),
        &["analyze", "--repo", repo, "--format", "json"],
        "",
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(analyze_json(&output)["result"]["summary"]["total"], 1);

    let output = deploylens(&dir.path().join("db"), &["analyze", "--format", "json"], "");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = analyze_json(&output);
    assert_eq!(json["result"]["summary"]["total"], 1);
}
