//! Project walk and up-front eligibility filtering.
//!
//! [`discover_files`] lists every regular file under the project root.
//! [`FileFilter`] then drops the ones that will never be indexed (binary
//! extension, hidden name, oversized, ignored) before any content is read.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::config::IndexingConfig;
use crate::ignore_filter::{normalize_relative, IgnoreFilter};
use crate::sniff::has_binary_extension;

/// A discovered file, before any content is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub absolute_path: PathBuf,
    /// Relative to the project root, `/`-separated.
    pub relative_path: String,
    /// `None` when the file could not be stat-ed during the walk.
    pub size_bytes: Option<u64>,
    pub modified: Option<SystemTime>,
    /// Lowercased, without the dot. Empty when the file has none.
    pub extension: String,
}

impl FileCandidate {
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Recursively list every regular file under `root`.
///
/// Symlinks are not followed. Entries that cannot be read are logged and
/// skipped. Results are sorted by relative path.
pub fn discover_files(root: &Path) -> Result<Vec<FileCandidate>> {
    if !root.is_dir() {
        bail!("Project path is not a directory: {}", root.display());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_path = normalize_relative(relative)
            .unwrap_or_else(|| relative.to_string_lossy().replace('\\', "/"));

        let (size_bytes, modified) = match entry.metadata() {
            Ok(meta) => (Some(meta.len()), meta.modified().ok()),
            Err(e) => {
                tracing::debug!(path = %relative_path, error = %e, "could not stat file");
                (None, None)
            }
        };

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        files.push(FileCandidate {
            absolute_path: path.to_path_buf(),
            relative_path,
            size_bytes,
            modified,
            extension,
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(files)
}

/// Why a discovered file was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    BinaryExtension,
    Hidden,
    /// Could not be stat-ed during the walk.
    Unreadable,
    TooLarge,
    Ignored,
}

impl Exclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exclusion::BinaryExtension => "binary extension",
            Exclusion::Hidden => "hidden",
            Exclusion::Unreadable => "unreadable",
            Exclusion::TooLarge => "too large",
            Exclusion::Ignored => "ignored",
        }
    }
}

/// Name-, size- and rule-based eligibility check.
#[derive(Debug)]
pub struct FileFilter {
    ignore: IgnoreFilter,
    max_file_size_bytes: u64,
    skip_hidden: bool,
}

impl FileFilter {
    pub fn new(ignore: IgnoreFilter, max_file_size_bytes: u64, skip_hidden: bool) -> Self {
        Self {
            ignore,
            max_file_size_bytes,
            skip_hidden,
        }
    }

    /// Load the project's ignore rules and build a filter from `config`.
    pub fn for_project(root: &Path, config: &IndexingConfig) -> Self {
        let ignore = IgnoreFilter::load(root, &config.ignore_file_name, &config.extra_ignore);
        Self::new(ignore, config.max_file_size_bytes, config.skip_hidden)
    }

    pub fn check(&self, file: &FileCandidate) -> Result<(), Exclusion> {
        if has_binary_extension(&file.absolute_path) {
            return Err(Exclusion::BinaryExtension);
        }
        if self.skip_hidden && file.file_name().starts_with('.') {
            return Err(Exclusion::Hidden);
        }
        match file.size_bytes {
            None => return Err(Exclusion::Unreadable),
            Some(size) if size > self.max_file_size_bytes => return Err(Exclusion::TooLarge),
            Some(_) => {}
        }
        // Match on the real path: `relative_path` is lossy for non-UTF-8 names.
        if self.ignore.should_ignore(&file.absolute_path) {
            return Err(Exclusion::Ignored);
        }
        Ok(())
    }

    /// Split `files` into eligible files, logging each exclusion.
    pub fn eligible(&self, files: Vec<FileCandidate>) -> Vec<FileCandidate> {
        files
            .into_iter()
            .filter(|file| match self.check(file) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::debug!(path = %file.relative_path, reason = reason.as_str(), "excluded");
                    false
                }
            })
            .collect()
    }
}
