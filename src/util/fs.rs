//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// File extensions recognized as rewritable PHP sources.
pub const SOURCE_EXTENSIONS: &[&str] = &["php", "inc"];

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in
        fs::read_dir(src).with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Recursively enumerate PHP source files under `base`, sorted for a
/// stable processing order. A missing base directory yields an empty list.
pub fn find_php_files(base: &Path) -> Result<Vec<PathBuf>> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    for entry in WalkDir::new(base) {
        let entry =
            entry.with_context(|| format!("failed to walk directory: {}", base.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_source = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SOURCE_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
            .unwrap_or(false);
        if is_source {
            results.push(entry.into_path());
        }
    }

    results.sort();
    Ok(results)
}

/// Move every entry of `src` into `dst`, creating `dst` first.
///
/// `dst` may live inside `src`; it is skipped rather than moved into itself.
pub fn move_dir_entries(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;

    for entry in
        fs::read_dir(src).with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let from = entry.path();
        if from == dst {
            continue;
        }
        let to = dst.join(entry.file_name());
        fs::rename(&from, &to)
            .with_context(|| format!("failed to move {} to {}", from.display(), to.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("file.txt"), "content").unwrap();
        fs::write(src.join("nested/deep.txt"), "deep").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("file.txt")).unwrap(), "content");
        assert_eq!(
            fs::read_to_string(dst.join("nested/deep.txt")).unwrap(),
            "deep"
        );
    }

    #[test]
    fn test_find_php_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/App.php"), "<?php").unwrap();
        fs::write(tmp.path().join("src/legacy.inc"), "<?php").unwrap();
        fs::write(tmp.path().join("src/UPPER.PHP"), "<?php").unwrap();
        fs::write(tmp.path().join("readme.md"), "nope").unwrap();

        let files = find_php_files(tmp.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| f.starts_with(tmp.path().join("src"))));
    }

    #[test]
    fn test_find_php_files_missing_base() {
        let tmp = TempDir::new().unwrap();
        let files = find_php_files(&tmp.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_move_dir_entries_into_nested_dir() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("lib");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.php"), "a").unwrap();
        fs::write(src.join("b.php"), "b").unwrap();

        let dst = src.join("staging");
        move_dir_entries(&src, &dst).unwrap();

        assert!(!src.join("a.php").exists());
        assert!(dst.join("a.php").exists());
        assert!(dst.join("b.php").exists());
    }
}
