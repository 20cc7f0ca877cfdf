//! Path filtering for changed files.
//!
//! Ignore patterns come from `[analysis] ignore_patterns`. A plain pattern
//! matches a path equal to it or starting with it. A pattern containing `*`
//! or `?` is a wildcard anchored at both ends, where `*` matches any run of
//! characters (including `/`) and `?` matches exactly one.

use std::fmt;

use deploylens_core::{DeployLensError, DiffFile};
use regex::Regex;

/// Returns `true` if `path` matches any of `patterns`.
///
/// Patterns are compiled on every call; use [`PathFilter`] when checking many paths.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::filter::should_ignore_path;
///
/// let patterns = vec!["docs/".to_string(), "*.lock".to_string()];
/// assert!(should_ignore_path("docs/guide.md", &patterns));
/// assert!(should_ignore_path("Cargo.lock", &patterns));
/// assert!(!should_ignore_path("src/main.rs", &patterns));
/// ```
pub fn should_ignore_path(path: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .filter_map(|p| PathPattern::new(p).ok())
        .any(|p| p.matches(path))
}

/// Keep only the paths that match none of `patterns`, preserving order.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::filter::filter_ignored_files;
///
/// let paths = vec!["a.js".to_string(), "a.min.js".to_string()];
/// let kept = filter_ignored_files(paths, &["*.min.js".to_string()]);
/// assert_eq!(kept, vec!["a.js"]);
/// ```
pub fn filter_ignored_files(paths: Vec<String>, patterns: &[String]) -> Vec<String> {
    match PathFilter::new(patterns) {
        Ok(filter) => paths.into_iter().filter(|p| !filter.is_ignored(p)).collect(),
        Err(_) => paths
            .into_iter()
            .filter(|p| !should_ignore_path(p, patterns))
            .collect(),
    }
}

#[derive(Debug, Clone)]
enum PathPattern {
    Prefix(String),
    Wildcard { source: String, regex: Regex },
}

impl PathPattern {
    fn new(pattern: &str) -> Result<Self, DeployLensError> {
        if !pattern.contains(['*', '?']) {
            return Ok(PathPattern::Prefix(pattern.to_string()));
        }

        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| {
            DeployLensError::Config(format!("invalid ignore pattern `{pattern}`: {e}"))
        })?;
        Ok(PathPattern::Wildcard {
            source: pattern.to_string(),
            regex,
        })
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::Wildcard { regex, .. } => regex.is_match(path),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            PathPattern::Prefix(p) => p,
            PathPattern::Wildcard { source, .. } => source,
        }
    }
}

/// Precompiled set of ignore patterns.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::filter::PathFilter;
///
/// let filter = PathFilter::new(&["vendor/".into(), "*.snap".into()]).unwrap();
/// assert!(filter.is_ignored("vendor/lib.go"));
/// assert!(filter.is_ignored("ui/button.test.snap"));
/// assert!(!filter.is_ignored("src/lib.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<PathPattern>,
}

impl PathFilter {
    /// Compile `patterns` into a filter.
    ///
    /// # Errors
    ///
    /// Returns [`DeployLensError::Config`] if a wildcard pattern cannot be compiled.
    pub fn new(patterns: &[String]) -> Result<Self, DeployLensError> {
        let patterns = patterns
            .iter()
            .map(|p| PathPattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns `true` if `path` matches any pattern.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.matching_pattern(path).is_some()
    }

    /// The first pattern that matches `path`.
    pub fn matching_pattern(&self, path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches(path))
            .map(PathPattern::as_str)
    }

    /// Split parsed diff files into those worth analyzing and those skipped.
    ///
    /// Binary files are always skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use deploylens_difflens::filter::PathFilter;
    /// use deploylens_difflens::parser::parse_unified_diff;
    ///
    /// let diff = "diff --git a/docs/a.md b/docs/a.md\n\
    ///             --- a/docs/a.md\n\
    ///             +++ b/docs/a.md\n\
    ///             @@ -1 +1 @@\n\
    ///             -a\n\
    ///             +b\n";
    /// let files = parse_unified_diff(diff, "main", "").files;
    /// let filter = PathFilter::new(&["docs/".into()]).unwrap();
    /// let result = filter.filter(files);
    /// assert!(result.kept.is_empty());
    /// assert_eq!(result.skipped.len(), 1);
    /// ```
    pub fn filter(&self, files: Vec<DiffFile>) -> FilterResult {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();

        for file in files {
            let reason = if file.is_binary {
                Some(SkipReason::BinaryFile)
            } else {
                self.matching_pattern(&file.path)
                    .map(|p| SkipReason::PatternMatch(p.to_string()))
            };

            match reason {
                Some(reason) => skipped.push(SkippedFile {
                    path: file.path,
                    reason,
                }),
                None => kept.push(file),
            }
        }

        FilterResult { kept, skipped }
    }
}

/// Result of filtering diff files.
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Files that passed the filter.
    pub kept: Vec<DiffFile>,
    /// Files that were skipped with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was skipped during filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: String,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was skipped.
///
/// # Examples
///
/// ```
/// use deploylens_difflens::filter::SkipReason;
///
/// let reason = SkipReason::PatternMatch("*.lock".into());
/// assert_eq!(format!("{reason}"), "pattern: *.lock");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Binary file.
    BinaryFile,
    /// Matched an ignore pattern.
    PatternMatch(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BinaryFile => write!(f, "binary file"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_unified_diff;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_pattern_matches_equality_and_prefix() {
        let p = patterns(&["config/secrets.yaml", "generated"]);
        assert!(should_ignore_path("config/secrets.yaml", &p));
        assert!(should_ignore_path("generated/api.rs", &p));
        assert!(should_ignore_path("generated_models.py", &p));
        assert!(!should_ignore_path("src/generated/api.rs", &p));
    }

    #[test]
    fn star_matches_across_directories() {
        let p = patterns(&["*.min.js"]);
        assert!(should_ignore_path("app.min.js", &p));
        assert!(should_ignore_path("static/js/app.min.js", &p));
        assert!(!should_ignore_path("app.min.js.map", &p));
    }

    #[test]
    fn question_mark_matches_exactly_one_char() {
        let p = patterns(&["db/00?.sql"]);
        assert!(should_ignore_path("db/001.sql", &p));
        assert!(!should_ignore_path("db/0011.sql", &p));
        assert!(!should_ignore_path("db/00.sql", &p));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let p = patterns(&["*.(gen).ts"]);
        assert!(should_ignore_path("api.(gen).ts", &p));
        assert!(!should_ignore_path("apiXgenYts", &p));

        let p = patterns(&["build+*"]);
        assert!(should_ignore_path("build+1/out", &p));
        assert!(!should_ignore_path("buildd/out", &p));
    }

    #[test]
    fn wildcard_is_anchored() {
        let p = patterns(&["docs/*"]);
        assert!(should_ignore_path("docs/a.md", &p));
        assert!(!should_ignore_path("site/docs/a.md", &p));
    }

    #[test]
    fn no_patterns_ignores_nothing() {
        assert!(!should_ignore_path("anything", &[]));
        let kept = filter_ignored_files(patterns(&["a", "b"]), &[]);
        assert_eq!(kept, vec!["a", "b"]);
    }

    #[test]
    fn filter_ignored_files_preserves_order() {
        let paths = patterns(&["src/b.rs", "vendor/x.go", "src/a.rs", "Cargo.lock"]);
        let kept = filter_ignored_files(paths, &patterns(&["vendor/", "*.lock"]));
        assert_eq!(kept, vec!["src/b.rs", "src/a.rs"]);
    }

    #[test]
    fn matching_pattern_reports_first_match() {
        let filter = PathFilter::new(&patterns(&["src/", "*.rs"])).unwrap();
        assert_eq!(filter.matching_pattern("src/lib.rs"), Some("src/"));
        assert_eq!(filter.matching_pattern("build.rs"), Some("*.rs"));
        assert_eq!(filter.matching_pattern("README.md"), None);
    }

    #[test]
    fn filter_skips_binary_and_ignored_files() {
        let diff = "\
diff --git a/logo.png b/logo.png
Binary files a/logo.png and b/logo.png differ
diff --git a/Cargo.lock b/Cargo.lock
--- a/Cargo.lock
+++ b/Cargo.lock
@@ -1 +1 @@
-a
+b
diff --git a/src/main.rs b/src/main.rs
--- a/src/main.rs
+++ b/src/main.rs
@@ -1 +1 @@
-a
+b
";
        let files = parse_unified_diff(diff, "main", "").files;
        let filter = PathFilter::new(&patterns(&["*.lock"])).unwrap();
        let result = filter.filter(files);

        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.kept[0].path, "src/main.rs");
        assert_eq!(
            result.skipped,
            vec![
                SkippedFile {
                    path: "logo.png".into(),
                    reason: SkipReason::BinaryFile,
                },
                SkippedFile {
                    path: "Cargo.lock".into(),
                    reason: SkipReason::PatternMatch("*.lock".into()),
                },
            ]
        );
    }

    #[test]
    fn empty_filter_keeps_text_files() {
        let result = PathFilter::default().filter(Vec::new());
        assert!(result.kept.is_empty());
        assert!(result.skipped.is_empty());
    }
}
