use std::fmt;

use deploylens_core::{DiffFile, DiffHunk, DiffResult, FileStatus};
use serde::Serialize;

/// Parse a unified diff string (as produced by `git diff`) into a [`DiffResult`].
///
/// The text is split on `diff --git` lines; each chunk becomes one [`DiffFile`].
/// Chunks whose header cannot be read are skipped, and a hunk header that
/// omits a line count gets a count of 1. Binary files are kept but carry no hunks.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::parser::parse_unified_diff;
///
/// let diff = "diff --git a/hello.rs b/hello.rs\n\
///             --- a/hello.rs\n\
///             +++ b/hello.rs\n\
///             @@ -1,2 +1,3 @@\n\
///              fn main() {\n\
///             +    println!(\"hello\");\n\
///              }\n";
/// let result = parse_unified_diff(diff, "main", "HEAD");
/// assert_eq!(result.files.len(), 1);
/// assert_eq!(result.files[0].hunks.len(), 1);
///
/// assert!(parse_unified_diff("", "main", "HEAD").files.is_empty());
/// ```
pub fn parse_unified_diff(input: &str, base: &str, head: &str) -> DiffResult {
    let files = split_chunks(input)
        .into_iter()
        .filter_map(|chunk| parse_chunk(&chunk))
        .collect();

    DiffResult {
        base: base.to_string(),
        head: head.to_string(),
        files,
        raw_diff: input.to_string(),
    }
}

fn split_chunks(input: &str) -> Vec<Vec<&str>> {
    let mut chunks: Vec<Vec<&str>> = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in input.lines() {
        if line.starts_with("diff --git ") {
            if let Some(chunk) = current.take() {
                chunks.push(chunk);
            }
            current = Some(vec![line]);
        } else if let Some(chunk) = current.as_mut() {
            chunk.push(line);
        }
    }

    if let Some(chunk) = current.take() {
        chunks.push(chunk);
    }
    chunks
}

#[derive(Default)]
struct ChunkMarkers {
    is_new: bool,
    is_deleted: bool,
    is_rename: bool,
    is_copy: bool,
    has_similarity: bool,
    is_binary: bool,
    from_path: Option<String>,
    to_path: Option<String>,
    minus_path: Option<String>,
    plus_path: Option<String>,
}

fn parse_chunk(lines: &[&str]) -> Option<DiffFile> {
    let header = lines.first()?.strip_prefix("diff --git ")?;
    let (header_old, header_new) = parse_header_paths(header)?;

    let mut markers = ChunkMarkers::default();
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current_hunk: Option<DiffHunk> = None;
    let mut in_hunks = false;

    for line in &lines[1..] {
        if !in_hunks && scan_metadata(line, &mut markers) {
            continue;
        }

        if markers.is_binary {
            continue;
        }

        if line.starts_with("@@") {
            in_hunks = true;
            if let Some(hunk) = current_hunk.take() {
                hunks.push(hunk);
            }
            current_hunk = parse_hunk_header(line).map(
                |(old_start, old_lines, new_start, new_lines)| DiffHunk {
                    old_start,
                    old_lines,
                    new_start,
                    new_lines,
                    content: format!("{line}\n"),
                },
            );
            continue;
        }

        if let Some(hunk) = current_hunk.as_mut() {
            if line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') {
                hunk.content.push_str(line);
                hunk.content.push('\n');
            }
        }
    }

    if let Some(hunk) = current_hunk.take() {
        hunks.push(hunk);
    }
    if markers.is_binary {
        hunks.clear();
    }

    let status = if markers.is_new {
        FileStatus::Added
    } else if markers.is_deleted {
        FileStatus::Deleted
    } else if markers.is_rename {
        FileStatus::Renamed
    } else if markers.is_copy {
        FileStatus::Copied
    } else if markers.has_similarity {
        FileStatus::Renamed
    } else {
        FileStatus::Modified
    };

    let old_path = markers
        .from_path
        .or(markers.minus_path)
        .unwrap_or(header_old);
    let new_path = markers
        .to_path
        .or(markers.plus_path)
        .unwrap_or(header_new);

    let path = if status == FileStatus::Deleted {
        old_path.clone()
    } else {
        new_path
    };
    let old_path = (status == FileStatus::Renamed && old_path != path).then_some(old_path);

    Some(DiffFile {
        path,
        old_path,
        status,
        hunks,
        is_binary: markers.is_binary,
    })
}

/// Record a metadata line. Returns `false` if the line is not metadata.
fn scan_metadata(line: &str, markers: &mut ChunkMarkers) -> bool {
    if line.starts_with("new file mode") {
        markers.is_new = true;
    } else if line.starts_with("deleted file mode") {
        markers.is_deleted = true;
    } else if let Some(path) = line.strip_prefix("rename from ") {
        markers.is_rename = true;
        markers.from_path = Some(unquote(path));
    } else if let Some(path) = line.strip_prefix("rename to ") {
        markers.is_rename = true;
        markers.to_path = Some(unquote(path));
    } else if let Some(path) = line.strip_prefix("copy from ") {
        markers.is_copy = true;
        markers.from_path = Some(unquote(path));
    } else if let Some(path) = line.strip_prefix("copy to ") {
        markers.is_copy = true;
        markers.to_path = Some(unquote(path));
    } else if line.starts_with("similarity index") {
        markers.has_similarity = true;
    } else if (line.starts_with("Binary files ") && line.ends_with(" differ"))
        || line.starts_with("GIT binary patch")
    {
        markers.is_binary = true;
    } else if let Some(path) = line.strip_prefix("--- ") {
        markers.minus_path = marker_path(path, "a/");
    } else if let Some(path) = line.strip_prefix("+++ ") {
        markers.plus_path = marker_path(path, "b/");
    } else {
        return false;
    }
    true
}

/// Path from a `---`/`+++` line; `None` for `/dev/null`.
fn marker_path(raw: &str, prefix: &str) -> Option<String> {
    let path = unquote(raw.trim_end_matches('\t'));
    if path == "/dev/null" {
        return None;
    }
    Some(path.strip_prefix(prefix).unwrap_or(&path).to_string())
}

/// Split `a/<old> b/<new>` (optionally quoted) into its two paths.
fn parse_header_paths(header: &str) -> Option<(String, String)> {
    if header.starts_with('"') {
        let (old_raw, rest) = split_quoted(header)?;
        let new_raw = rest.trim_start();
        let old = unquote(old_raw);
        let new = unquote(new_raw);
        return Some((
            old.strip_prefix("a/")?.to_string(),
            new.strip_prefix("b/")?.to_string(),
        ));
    }

    let rest = header.strip_prefix("a/")?;
    if rest.ends_with('"') {
        let start = rest.rfind(" \"")?;
        let new = unquote(&rest[start + 1..]);
        return Some((rest[..start].to_string(), new.strip_prefix("b/")?.to_string()));
    }

    // Paths may contain " b/"; prefer the split where both sides agree.
    let candidates: Vec<usize> = rest.match_indices(" b/").map(|(i, _)| i).collect();
    let split = candidates
        .iter()
        .copied()
        .find(|&i| rest[..i] == rest[i + 3..])
        .or_else(|| candidates.first().copied())?;

    Some((rest[..split].to_string(), rest[split + 3..].to_string()))
}

/// Split a leading quoted token off `s`, returning it (quotes included) and the remainder.
fn split_quoted(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some((&s[..=i], &s[i + 1..])),
            _ => i += 1,
        }
    }
    None
}

/// Undo git's C-style path quoting, including octal-escaped UTF-8 bytes.
fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut bytes: Vec<u8> = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match iter.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(o - b'0');
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse `@@ -o[,ol] +n[,nl] @@` into `(old_start, old_lines, new_start, new_lines)`.
///
/// Returns `None` when the line is not a well-formed hunk header.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::parser::parse_hunk_header;
///
/// assert_eq!(parse_hunk_header("@@ -1 +1,2 @@"), Some((1, 1, 1, 2)));
/// assert_eq!(parse_hunk_header("@@ -3,0 +4,2 @@ fn main()"), Some((3, 0, 4, 2)));
/// assert_eq!(parse_hunk_header("@@ garbage @@"), None);
/// ```
pub fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let inner = line.strip_prefix("@@ ").and_then(|s| {
        let end = s.find(" @@")?;
        Some(&s[..end])
    })?;

    let (old, new) = inner.split_once(' ')?;
    let (old_start, old_lines) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(new.strip_prefix('+')?)?;

    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Added lines of a hunk, without the leading `+`.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::parser::added_lines;
///
/// let content = "@@ -1,2 +1,2 @@\n-old\n+new\n same\n";
/// assert_eq!(added_lines(content), vec!["new"]);
/// ```
pub fn added_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|line| !line.starts_with("+++"))
        .filter_map(|line| line.strip_prefix('+'))
        .collect()
}

/// Removed lines of a hunk, without the leading `-`.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::parser::removed_lines;
///
/// let content = "@@ -1,2 +1,2 @@\n-old\n+new\n same\n";
/// assert_eq!(removed_lines(content), vec!["old"]);
/// ```
pub fn removed_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|line| !line.starts_with("---"))
        .filter_map(|line| line.strip_prefix('-'))
        .collect()
}

/// 1-based new-file line numbers of the added lines of a hunk.
///
/// The counter starts at the header's new start (1 without a header) and
/// advances on added and context lines; removed lines do not move it. The
/// counter stops at `u32::MAX` rather than wrapping.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::parser::added_line_numbers;
///
/// assert_eq!(added_line_numbers("@@ -1,1 +1,2 @@\n+new\n old"), vec![1]);
/// ```
pub fn added_line_numbers(content: &str) -> Vec<u32> {
    let mut numbers = Vec::new();
    let mut line_no: u32 = 1;

    for line in content.lines() {
        if line.starts_with("@@") {
            if let Some((_, _, new_start, _)) = parse_hunk_header(line) {
                line_no = new_start;
            }
        } else if line.starts_with("+++") || line.starts_with('-') {
            continue;
        } else if line.starts_with('+') {
            numbers.push(line_no);
            line_no = line_no.saturating_add(1);
        } else if line.starts_with(' ') {
            line_no = line_no.saturating_add(1);
        }
    }
    numbers
}

/// Count `(additions, deletions)` across every hunk of a file.
pub fn count_changes(file: &DiffFile) -> (u32, u32) {
    (file.added_lines() as u32, file.removed_lines() as u32)
}

/// Per-file statistics for a parsed diff.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::parser::{parse_unified_diff, DiffSummary};
///
/// let result = parse_unified_diff("", "main", "");
/// let summary = DiffSummary::from_result(&result);
/// assert_eq!(summary.total_files, 0);
/// assert!(summary.to_markdown().contains("# Diff Summary"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    /// One entry per file, in diff order.
    pub files: Vec<FileSummary>,
    /// Number of files changed.
    pub total_files: usize,
    /// Total lines added across all files.
    pub total_additions: u32,
    /// Total lines deleted across all files.
    pub total_deletions: u32,
}

/// Statistics for one file of a diff.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    /// Path at the head revision.
    pub path: String,
    /// Previous path for renames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    /// Change classification.
    pub status: FileStatus,
    /// Lines added.
    pub additions: u32,
    /// Lines deleted.
    pub deletions: u32,
    /// Number of hunks.
    pub hunk_count: usize,
    /// Whether the file is binary.
    pub is_binary: bool,
}

impl DiffSummary {
    /// Summarize a parsed diff.
    pub fn from_result(result: &DiffResult) -> Self {
        let files: Vec<FileSummary> = result
            .files
            .iter()
            .map(|file| {
                let (additions, deletions) = count_changes(file);
                FileSummary {
                    path: file.path.clone(),
                    old_path: file.old_path.clone(),
                    status: file.status,
                    additions,
                    deletions,
                    hunk_count: file.hunks.len(),
                    is_binary: file.is_binary,
                }
            })
            .collect();

        Self {
            total_files: files.len(),
            total_additions: files.iter().map(|f| f.additions).sum(),
            total_deletions: files.iter().map(|f| f.deletions).sum(),
            files,
        }
    }

    /// Render the summary as a markdown string.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Diff Summary\n\n");

        if !self.files.is_empty() {
            out.push_str("| File | Status | +/- | Hunks |\n");
            out.push_str("|------|--------|-----|-------|\n");
            for f in &self.files {
                let changes = if f.is_binary {
                    "binary".to_string()
                } else {
                    format!("+{}/-{}", f.additions, f.deletions)
                };
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    display_path(f),
                    f.status,
                    changes,
                    f.hunk_count,
                ));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "**Summary:** {} files, +{} additions, -{} deletions\n",
            self.total_files, self.total_additions, self.total_deletions
        ));
        out
    }
}

fn display_path(file: &FileSummary) -> String {
    match &file.old_path {
        Some(old) => format!("{old} → {}", file.path),
        None => file.path.clone(),
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Diff Summary")?;
        writeln!(f, "============")?;

        if !self.files.is_empty() {
            writeln!(f, "{:<48} {:>9} {:>12} {:>6}", "File", "Status", "+/-", "Hunks")?;
            writeln!(f, "{}", "-".repeat(78))?;
            for file in &self.files {
                let changes = if file.is_binary {
                    "binary".to_string()
                } else {
                    format!("+{}/-{}", file.additions, file.deletions)
                };
                writeln!(
                    f,
                    "{:<48} {:>9} {:>12} {:>6}",
                    display_path(file),
                    file.status,
                    changes,
                    file.hunk_count,
                )?;
            }
        }

        writeln!(
            f,
            "\nSummary: {} files, +{} additions, -{} deletions",
            self.total_files, self.total_additions, self.total_deletions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(diff: &str) -> DiffResult {
        parse_unified_diff(diff, "main", "HEAD")
    }

    #[test]
    fn empty_diff_returns_no_files() {
        let result = parse("");
        assert!(result.files.is_empty());
        assert_eq!(result.base, "main");
        assert_eq!(result.head, "HEAD");
    }

    #[test]
    fn single_file_single_hunk() {
        let diff = "\
diff --git a/src/main.rs b/src/main.rs
index abc1234..def5678 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,3 +1,4 @@
 fn main() {
+    println!(\"hello\");
     let x = 1;
 }
";
        let result = parse(diff);
        assert_eq!(result.files.len(), 1);
        let file = &result.files[0];
        assert_eq!(file.path, "src/main.rs");
        assert_eq!(file.status, FileStatus::Modified);
        assert_eq!(file.old_path, None);
        assert!(!file.is_binary);
        assert_eq!(file.hunks.len(), 1);

        let hunk = &file.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_lines), (1, 3));
        assert_eq!((hunk.new_start, hunk.new_lines), (1, 4));
        assert!(hunk.content.starts_with("@@ -1,3 +1,4 @@\n"));
        assert!(hunk.content.contains("+    println!"));
        assert_eq!(result.raw_diff, diff);
    }

    #[test]
    fn hunk_content_is_verbatim() {
        let diff = "\
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1,2 +1,2 @@ section
 keep
-old
+new
";
        let result = parse(diff);
        assert_eq!(
            result.files[0].hunks[0].content,
            "@@ -1,2 +1,2 @@ section\n keep\n-old\n+new\n"
        );
    }

    #[test]
    fn single_file_multiple_hunks() {
        let diff = "\
diff --git a/lib.rs b/lib.rs
--- a/lib.rs
+++ b/lib.rs
@@ -1,3 +1,4 @@
 fn foo() {
+    bar();
 }
@@ -10,3 +11,4 @@
 fn baz() {
+    qux();
 }
";
        let result = parse(diff);
        assert_eq!(result.files[0].hunks.len(), 2);
        assert_eq!(result.files[0].hunks[0].old_start, 1);
        assert_eq!(result.files[0].hunks[1].old_start, 10);
        assert!(!result.files[0].hunks[0].content.contains("qux"));
    }

    #[test]
    fn file_count_matches_chunk_count() {
        let mut diff = String::new();
        for name in ["a.rs", "b.rs", "c.rs", "d.rs"] {
            diff.push_str(&format!(
                "diff --git a/{name} b/{name}\n--- a/{name}\n+++ b/{name}\n@@ -1 +1,2 @@\n line1\n+line2\n"
            ));
        }
        let result = parse(&diff);
        assert_eq!(result.files.len(), 4);
        assert_eq!(result.files[3].path, "d.rs");
    }

    #[test]
    fn omitted_counts_default_to_one() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -1 +1,2 @@
 x
+y
";
        let hunk = &parse(diff).files[0].hunks[0];
        assert_eq!(hunk.old_lines, 1);
        assert_eq!(hunk.new_lines, 2);

        assert_eq!(parse_hunk_header("@@ -5 +7 @@"), Some((5, 1, 7, 1)));
    }

    #[test]
    fn new_file() {
        let diff = "\
diff --git a/new.rs b/new.rs
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new.rs
@@ -0,0 +1,3 @@
+fn hello() {
+    println!(\"new\");
+}
";
        let file = &parse(diff).files[0];
        assert_eq!(file.status, FileStatus::Added);
        assert_eq!(file.path, "new.rs");
        assert_eq!(file.old_path, None);
        assert_eq!(file.hunks[0].old_lines, 0);
    }

    #[test]
    fn deleted_file() {
        let diff = "\
diff --git a/old.rs b/old.rs
deleted file mode 100644
--- a/old.rs
+++ /dev/null
@@ -1,3 +0,0 @@
-fn goodbye() {
-    println!(\"old\");
-}
";
        let file = &parse(diff).files[0];
        assert_eq!(file.status, FileStatus::Deleted);
        assert_eq!(file.path, "old.rs");
        assert_eq!(file.hunks[0].new_lines, 0);
    }

    #[test]
    fn pure_rename_has_old_path_and_no_hunks() {
        let diff = "\
diff --git a/old_name.rs b/new_name.rs
similarity index 100%
rename from old_name.rs
rename to new_name.rs
";
        let file = &parse(diff).files[0];
        assert_eq!(file.status, FileStatus::Renamed);
        assert_eq!(file.path, "new_name.rs");
        assert_eq!(file.old_path.as_deref(), Some("old_name.rs"));
        assert!(file.hunks.is_empty());
    }

    #[test]
    fn rename_with_edits_keeps_hunks() {
        let diff = "\
diff --git a/src/a.rs b/src/b.rs
similarity index 90%
rename from src/a.rs
rename to src/b.rs
index 1111111..2222222 100644
--- a/src/a.rs
+++ b/src/b.rs
@@ -1,2 +1,2 @@
 fn x() {}
-fn y() {}
+fn z() {}
";
        let file = &parse(diff).files[0];
        assert_eq!(file.status, FileStatus::Renamed);
        assert_eq!(file.old_path.as_deref(), Some("src/a.rs"));
        assert_eq!(file.hunks.len(), 1);
    }

    #[test]
    fn copied_file() {
        let diff = "\
diff --git a/base.yaml b/prod.yaml
similarity index 95%
copy from base.yaml
copy to prod.yaml
";
        let file = &parse(diff).files[0];
        assert_eq!(file.status, FileStatus::Copied);
        assert_eq!(file.path, "prod.yaml");
        assert_eq!(file.old_path, None);
    }

    #[test]
    fn binary_files_flagged_without_hunks() {
        let diff = "\
diff --git a/image.png b/image.png
index 1234567..89abcde 100644
Binary files a/image.png and b/image.png differ
diff --git a/code.rs b/code.rs
--- a/code.rs
+++ b/code.rs
@@ -1 +1,2 @@
 line1
+line2
";
        let result = parse(diff);
        assert_eq!(result.files.len(), 2);
        assert!(result.files[0].is_binary);
        assert!(result.files[0].hunks.is_empty());
        assert!(!result.files[1].is_binary);
        assert_eq!(result.files[1].hunks.len(), 1);
    }

    #[test]
    fn binary_patch_marker_skips_hunks() {
        let diff = "\
diff --git a/font.woff b/font.woff
new file mode 100644
index 0000000..3b18e51
GIT binary patch
literal 12
TcmZQzWMXDvWMyJz0000G

literal 0
HcmV?d00001
";
        let file = &parse(diff).files[0];
        assert!(file.is_binary);
        assert_eq!(file.status, FileStatus::Added);
        assert!(file.hunks.is_empty());
    }

    #[test]
    fn no_newline_marker_excluded_from_content() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        let content = &parse(diff).files[0].hunks[0].content;
        assert!(!content.contains("No newline"));
        assert!(content.contains("-old"));
        assert!(content.contains("+new"));
    }

    #[test]
    fn sql_comment_removal_is_not_a_file_marker() {
        let diff = "\
diff --git a/db/001.sql b/db/001.sql
--- a/db/001.sql
+++ b/db/001.sql
@@ -1,2 +1,1 @@
--- legacy table
 CREATE TABLE t (id INT);
";
        let file = &parse(diff).files[0];
        assert_eq!(file.path, "db/001.sql");
        assert!(file.hunks[0].content.contains("--- legacy table"));
    }

    #[test]
    fn text_before_first_header_is_ignored() {
        let diff = "\
commit 0123456789abcdef
Author: someone

diff --git a/x.rs b/x.rs
--- a/x.rs
+++ b/x.rs
@@ -1 +1 @@
-a
+b
";
        let result = parse(diff);
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].path, "x.rs");
    }

    #[test]
    fn unreadable_header_chunk_is_skipped() {
        let diff = "\
diff --git garbage
@@ -1 +1 @@
-a
+b
diff --git a/ok.rs b/ok.rs
--- a/ok.rs
+++ b/ok.rs
@@ -1 +1 @@
-a
+b
";
        let result = parse(diff);
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].path, "ok.rs");
    }

    #[test]
    fn malformed_hunk_header_drops_its_lines() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -x +y @@
+lost
@@ -1 +1 @@
+kept
";
        let file = &parse(diff).files[0];
        assert_eq!(file.hunks.len(), 1);
        assert!(file.hunks[0].content.contains("+kept"));
        assert!(!file.hunks[0].content.contains("lost"));
    }

    #[test]
    fn header_paths_with_spaces() {
        assert_eq!(
            parse_header_paths("a/my file.rs b/my file.rs"),
            Some(("my file.rs".into(), "my file.rs".into()))
        );
        assert_eq!(
            parse_header_paths("a/x b/y b/x b/y"),
            Some(("x b/y".into(), "x b/y".into()))
        );
        assert_eq!(parse_header_paths("x y"), None);
    }

    #[test]
    fn quoted_paths_are_unquoted() {
        let diff = "\
diff --git \"a/docs/r\\303\\251sum\\303\\251.md\" \"b/docs/r\\303\\251sum\\303\\251.md\"
--- \"a/docs/r\\303\\251sum\\303\\251.md\"
+++ \"b/docs/r\\303\\251sum\\303\\251.md\"
@@ -1 +1 @@
-a
+b
";
        let file = &parse(diff).files[0];
        assert_eq!(file.path, "docs/résumé.md");
    }

    #[test]
    fn unquote_handles_escapes() {
        assert_eq!(unquote("\"a\\\"b\""), "a\"b");
        assert_eq!(unquote("\"tab\\there\""), "tab\there");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn added_and_removed_line_helpers() {
        let content = "@@ -1,3 +1,3 @@\n context\n-removed one\n+added one\n+added two\n";
        assert_eq!(added_lines(content), vec!["added one", "added two"]);
        assert_eq!(removed_lines(content), vec!["removed one"]);
    }

    #[test]
    fn file_markers_excluded_from_line_helpers() {
        let content = "--- a/f\n+++ b/f\n@@ -1 +1 @@\n-x\n+y\n";
        assert_eq!(added_lines(content), vec!["y"]);
        assert_eq!(removed_lines(content), vec!["x"]);
    }

    #[test]
    fn added_line_numbers_follow_new_file_positions() {
        assert_eq!(added_line_numbers("@@ -1,1 +1,2 @@\n+new\n old"), vec![1]);

        let content = "@@ -10,4 +20,5 @@\n ctx\n-gone\n+first\n ctx\n+second\n+third\n";
        assert_eq!(added_line_numbers(content), vec![21, 23, 24]);
    }

    #[test]
    fn added_line_numbers_saturate_at_max_start() {
        let diff = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +4294967295,2 @@\n+a\n+b\n";
        let result = parse_unified_diff(diff, "main", "");
        let hunk = &result.files[0].hunks[0];
        assert_eq!(hunk.new_start, u32::MAX);
        assert_eq!(added_line_numbers(&hunk.content), vec![u32::MAX, u32::MAX]);
    }

    #[test]
    fn added_line_numbers_without_header_start_at_one() {
        assert_eq!(added_line_numbers(" a\n+b\n-c\n+d"), vec![2, 3]);
    }

    #[test]
    fn count_changes_sums_hunks() {
        let diff = "\
diff --git a/lib.rs b/lib.rs
--- a/lib.rs
+++ b/lib.rs
@@ -1,2 +1,3 @@
 a
+b
-c
@@ -9 +10,2 @@
 d
+e
";
        let result = parse(diff);
        assert_eq!(count_changes(&result.files[0]), (2, 1));
    }

    #[test]
    fn summary_display_and_markdown() {
        let diff = "\
diff --git a/old.rs b/new.rs
similarity index 80%
rename from old.rs
rename to new.rs
--- a/old.rs
+++ b/new.rs
@@ -1 +1,2 @@
 x
+y
";
        let summary = DiffSummary::from_result(&parse(diff));
        assert_eq!(summary.total_files, 1);
        assert_eq!(summary.total_additions, 1);

        let text = format!("{summary}");
        assert!(text.contains("old.rs → new.rs"));
        assert!(text.contains("renamed"));

        let md = summary.to_markdown();
        assert!(md.contains("| old.rs → new.rs | renamed | +1/-0 | 1 |"));
    }

    #[test]
    fn real_world_fixture() {
        let diff = include_str!("../tests/fixtures/simple.diff");
        let result = parse(diff);
        assert_eq!(result.files.len(), 4);
        for file in &result.files {
            assert!(!file.hunks.is_empty() || file.is_binary || file.status == FileStatus::Renamed);
        }
    }
}
