//! Gitignore-style path exclusion.
//!
//! The rule set is built once per run from [`DEFAULT_IGNORE_PATTERNS`], the
//! project's ignore file (`.gitignore` by default), and any extra patterns
//! from configuration, in that order. Later patterns win, so a project file
//! can re-include something the defaults exclude with `!pattern`.
//!
//! Matching is done on the path relative to the project root with `/`
//! separators. A path is ignored when it or any of its parent directories
//! matches.

use std::path::{Component, Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// VCS, dependency, cache, and build artifacts that are never worth indexing.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    "node_modules/",
    "__pycache__/",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "*.so",
    "build/",
    "dist/",
    "*.egg-info/",
    ".env",
    "venv/",
    ".venv/",
    ".mypy_cache/",
    ".pytest_cache/",
    ".idea/",
    ".vscode/",
    "*.swp",
    "*.swo",
];

/// Compiled ignore rules for one project root.
#[derive(Debug)]
pub struct IgnoreFilter {
    root: PathBuf,
    /// `None` when the rule set failed to compile; every path is then ignored.
    matcher: Option<Gitignore>,
    patterns: Vec<String>,
}

impl IgnoreFilter {
    /// Build the filter for `root`, reading `root/<ignore_file_name>` when it
    /// exists and appending `extra` patterns.
    pub fn load(root: &Path, ignore_file_name: &str, extra: &[String]) -> Self {
        let mut patterns: Vec<String> = DEFAULT_IGNORE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();

        let ignore_file = root.join(ignore_file_name);
        if ignore_file.is_file() {
            match std::fs::read_to_string(&ignore_file) {
                Ok(content) => {
                    let before = patterns.len();
                    patterns.extend(
                        content
                            .lines()
                            .map(str::trim)
                            .filter(|line| !line.is_empty() && !line.starts_with('#'))
                            .map(str::to_string),
                    );
                    tracing::info!(
                        file = %ignore_file.display(),
                        patterns = patterns.len() - before,
                        "using project ignore file"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        file = %ignore_file.display(),
                        error = %e,
                        "could not read project ignore file, using defaults"
                    );
                }
            }
        } else {
            tracing::info!(
                file = %ignore_file.display(),
                "no project ignore file, using defaults"
            );
        }

        patterns.extend(extra.iter().map(|p| p.trim().to_string()));

        Self::from_patterns(root, patterns)
    }

    /// Build a filter from an explicit, ordered pattern list.
    pub fn from_patterns(root: &Path, patterns: Vec<String>) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        let mut accepted = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if pattern.is_empty() {
                continue;
            }
            match builder.add_line(None, &pattern) {
                Ok(_) => accepted.push(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "skipping malformed ignore pattern");
                }
            }
        }

        let matcher = match builder.build() {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                tracing::error!(error = %e, "failed to compile ignore rules; ignoring every path");
                None
            }
        };

        Self {
            root: root.to_path_buf(),
            matcher,
            patterns: accepted,
        }
    }

    /// The accepted patterns, in evaluation order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `path` is excluded.
    ///
    /// `path` may be absolute (it must then lie under the project root) or
    /// already relative to the root. Paths outside the root are never
    /// ignored. A path that cannot be matched at all (non-UTF-8, `..`
    /// components, failed rule compilation) is ignored.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => return false,
            }
        } else {
            path
        };

        let Some(matcher) = &self.matcher else {
            return true;
        };

        let Some(normalized) = normalize_relative(relative) else {
            return true;
        };
        if normalized.is_empty() {
            return false;
        }

        let is_dir = self.root.join(relative).is_dir();
        matcher
            .matched_path_or_any_parents(Path::new(&normalized), is_dir)
            .is_ignore()
    }
}

/// Slash-separated form of a relative path.
///
/// `None` for non-UTF-8 paths and paths with `..` or root components.
pub fn normalize_relative(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}
