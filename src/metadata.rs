//! Per-file metadata extraction.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use synapstor_core::identity::IdentityError;
use synapstor_core::models::FileMetadata;

use crate::ignore_filter::normalize_relative;

/// Format of `modified_at`: local time, second precision, no offset.
pub const MODIFIED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Describe the file at `path` within project `root`.
///
/// When the file cannot be stat-ed, size is 0, `modified_at` is omitted and a
/// timestamp salt is added. The same salt is added when `project` or the
/// absolute path is empty, so a fallback id can still be derived.
///
/// Fails with [`IdentityError::NonUtf8Path`] when the absolute path is not
/// valid UTF-8.
pub fn extract_metadata(
    project: &str,
    root: &Path,
    path: &Path,
) -> Result<FileMetadata, IdentityError> {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let absolute_path = absolute
        .to_str()
        .ok_or_else(|| IdentityError::NonUtf8Path(absolute.to_string_lossy().into_owned()))?
        .to_string();

    let relative_path = match absolute.strip_prefix(root) {
        Ok(rel) => normalize_relative(rel).unwrap_or_else(|| rel.to_string_lossy().into_owned()),
        Err(_) => absolute_path.clone(),
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut metadata = FileMetadata {
        project: project.to_string(),
        absolute_path,
        relative_path,
        filename,
        extension,
        ..FileMetadata::default()
    };

    match std::fs::metadata(path) {
        Ok(stat) => {
            metadata.size_bytes = stat.len();
            metadata.modified_at = stat.modified().ok().map(format_modified);
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "stat failed, salting metadata");
            metadata.timestamp = Some(timestamp_salt());
        }
    }

    if !metadata.has_identity() && metadata.timestamp.is_none() {
        metadata.timestamp = Some(timestamp_salt());
    }

    Ok(metadata)
}

pub fn format_modified(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(MODIFIED_AT_FORMAT)
        .to_string()
}

/// Seconds since the epoch with nanosecond precision, e.g. `1700000000.123456789`.
fn timestamp_salt() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:09}", now.as_secs(), now.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use synapstor_core::identity::{digest, resolve_id};
    use tempfile::TempDir;

    #[test]
    fn test_extracts_descriptive_fields() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        let path = tmp.path().join("src").join("Main.RS");
        fs::write(&path, "fn main() {}").unwrap();

        let meta = extract_metadata("demo", tmp.path(), &path).unwrap();
        assert_eq!(meta.project, "demo");
        assert_eq!(meta.absolute_path, path.to_string_lossy());
        assert_eq!(meta.relative_path, "src/Main.RS");
        assert_eq!(meta.filename, "Main.RS");
        assert_eq!(meta.extension, "RS");
        assert_eq!(meta.size_bytes, 12);
        assert!(meta.timestamp.is_none());

        let modified = meta.modified_at.unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(&modified, MODIFIED_AT_FORMAT).is_ok());
    }

    #[test]
    fn test_no_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Makefile");
        fs::write(&path, "all:").unwrap();
        let meta = extract_metadata("demo", tmp.path(), &path).unwrap();
        assert_eq!(meta.extension, "");
    }

    #[test]
    fn test_id_is_project_and_absolute_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let meta = extract_metadata("demo", tmp.path(), &path).unwrap();
        let expected = digest(&format!("demo:{}", path.display()));
        assert_eq!(resolve_id(&meta).unwrap(), expected);
    }

    #[test]
    fn test_stat_failure_adds_salt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vanished.txt");

        let meta = extract_metadata("demo", tmp.path(), &path).unwrap();
        assert_eq!(meta.size_bytes, 0);
        assert!(meta.modified_at.is_none());
        assert!(meta.timestamp.is_some());
        // The identity pair is still intact, so the id stays deterministic.
        assert_eq!(
            resolve_id(&meta).unwrap(),
            digest(&format!("demo:{}", path.display()))
        );
    }

    #[test]
    fn test_empty_project_falls_back_to_salted_id() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let first = extract_metadata("", tmp.path(), &path).unwrap();
        assert!(first.timestamp.is_some());
        let id = resolve_id(&first).unwrap();
        assert_ne!(id, digest(&format!(":{}", path.display())));

        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = extract_metadata("", tmp.path(), &path).unwrap();
        assert_ne!(resolve_id(&second).unwrap(), id);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_is_identity_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(OsStr::from_bytes(b"a\xff.txt"));
        fs::write(&path, "first file").unwrap();

        let err = extract_metadata("demo", tmp.path(), &path).unwrap_err();
        assert!(matches!(err, IdentityError::NonUtf8Path(_)));
    }

    #[test]
    fn test_path_outside_root_keeps_absolute_relative() {
        let root = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = other.path().join("x.md");
        fs::write(&path, "x").unwrap();

        let meta = extract_metadata("demo", root.path(), &path).unwrap();
        assert_eq!(meta.relative_path, path.to_string_lossy());
    }
}
