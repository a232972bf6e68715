//! Directory tree merging
//!
//! Merges are additive: every file of the source tree ends up at the same
//! relative path under the target, and files that only exist in the target are
//! never touched.

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

/// What to do when a source file already exists in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Always replace the target file
    #[default]
    Overwrite,
    /// Replace the target file only if it is older than the source file
    UpdateStale,
}

impl MergePolicy {
    /// Policy used when installing a bundle
    pub fn for_install(release: bool) -> Self {
        if release {
            MergePolicy::Overwrite
        } else {
            MergePolicy::UpdateStale
        }
    }
}

/// Counts of what a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub files_copied: usize,
    /// Target files left in place because they were not stale
    pub files_kept: usize,
    pub dirs_created: usize,
}

impl std::ops::AddAssign for MergeReport {
    fn add_assign(&mut self, other: MergeReport) {
        self.files_copied += other.files_copied;
        self.files_kept += other.files_kept;
        self.dirs_created += other.dirs_created;
    }
}

/// Merge every file under `source` into `target`.
///
/// Missing directories are created. A walk error or failed copy aborts the
/// merge and leaves whatever was already copied in place.
pub fn merge_tree(source: &Utf8Path, target: &Utf8Path, policy: MergePolicy) -> Result<MergeReport> {
    require_dir(source)?;

    let mut report = MergeReport::default();

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| {
            Error::merge(
                format!("Failed to read directory entry under {}: {}", source, e),
                "Check directory permissions",
            )
        })?;

        let dst_path = target_path(source, target, &entry)?;

        if entry.file_type().is_dir() {
            if !dst_path.is_dir() {
                std::fs::create_dir_all(&dst_path)?;
                report.dirs_created += 1;
            }
            continue;
        }

        let src_path = utf8_path(&entry)?;
        if dst_path.exists() {
            if policy == MergePolicy::UpdateStale && !is_stale(src_path, &dst_path)? {
                tracing::debug!(path = %dst_path, "Keeping up-to-date file");
                report.files_kept += 1;
                continue;
            }
            tracing::debug!(path = %dst_path, "Overwriting existing file");
            std::fs::remove_file(&dst_path)?;
        }

        copy_file(src_path, &dst_path)?;
        report.files_copied += 1;
    }

    tracing::debug!(
        source = %source,
        target = %target,
        copied = report.files_copied,
        kept = report.files_kept,
        "Merged tree"
    );

    Ok(report)
}

/// Copy `source` to a new directory `target`, skipping entries whose name
/// matches one of `excludes`.
///
/// `target` must not exist yet. Patterns are either a literal file name or a
/// name with a leading or trailing `*`.
pub fn copy_tree_fresh(source: &Utf8Path, target: &Utf8Path, excludes: &[&str]) -> Result<MergeReport> {
    require_dir(source)?;

    if target.exists() || target.is_symlink() {
        return Err(Error::merge(
            format!("Refusing to copy into existing directory {}", target),
            "Remove the leftover directory (or the whole staging tree) and run again",
        ));
    }

    let mut report = MergeReport::default();
    let walker = WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(e, excludes));

    for entry in walker {
        let entry = entry.map_err(|e| {
            Error::merge(
                format!("Failed to read directory entry under {}: {}", source, e),
                "Check directory permissions",
            )
        })?;

        let dst_path = target_path(source, target, &entry)?;

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            report.dirs_created += 1;
        } else {
            copy_file(utf8_path(&entry)?, &dst_path)?;
            report.files_copied += 1;
        }
    }

    Ok(report)
}

/// Copy a file, keeping the source's modification time.
///
/// A copy of a copy therefore carries the time the original was written.
pub fn copy_file(source: &Utf8Path, target: &Utf8Path) -> Result<u64> {
    let bytes = std::fs::copy(source, target)?;
    let modified = std::fs::metadata(source)?.modified()?;
    std::fs::File::options()
        .write(true)
        .open(target)?
        .set_modified(modified)?;
    Ok(bytes)
}

/// Whether a file name matches an exclude pattern
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        name.ends_with(suffix)
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        name.starts_with(prefix)
    } else {
        name == pattern
    }
}

fn is_excluded(entry: &DirEntry, excludes: &[&str]) -> bool {
    let name = entry.file_name().to_string_lossy();
    excludes.iter().any(|pattern| matches_pattern(&name, pattern))
}

fn require_dir(path: &Utf8Path) -> Result<()> {
    if !path.is_dir() {
        return Err(Error::merge(
            format!("Source directory does not exist: {}", path),
            "Run `apedeploy prepare` to fetch submodules and generated files",
        ));
    }
    Ok(())
}

fn utf8_path(entry: &DirEntry) -> Result<&Utf8Path> {
    Utf8Path::from_path(entry.path()).ok_or_else(|| {
        Error::merge(
            format!("Path is not valid UTF-8: {:?}", entry.path()),
            "Ensure all file paths contain only valid UTF-8 characters",
        )
    })
}

fn target_path(source: &Utf8Path, target: &Utf8Path, entry: &DirEntry) -> Result<Utf8PathBuf> {
    let src_path = utf8_path(entry)?;
    let rel_path = src_path.strip_prefix(source).map_err(|_| {
        Error::merge(
            format!("Failed to strip prefix {} from {}", source, src_path),
            "This is likely a bug in apedeploy",
        )
    })?;

    Ok(target.join(rel_path))
}

/// A target file is stale when it was last modified before the source file
fn is_stale(source: &Utf8Path, target: &Utf8Path) -> Result<bool> {
    let src_modified = std::fs::metadata(source)?.modified()?;
    let dst_modified = std::fs::metadata(target)?.modified()?;
    Ok(dst_modified < src_modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn root(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap()
    }

    fn write(path: &Utf8Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn set_mtime(path: &Utf8Path, time: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_merge_copies_every_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("src");
        let dst = root.join("dst");

        write(&src.join("a.txt"), "a");
        write(&src.join("nested/deep/b.txt"), "b");
        fs::create_dir_all(src.join("empty")).unwrap();

        let report = merge_tree(&src, &dst, MergePolicy::Overwrite).unwrap();

        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dst.join("nested/deep/b.txt")).unwrap(), "b");
        assert!(dst.join("empty").is_dir());
        assert_eq!(report.files_copied, 2);
    }

    #[test]
    fn test_merge_keeps_target_only_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("src");
        let dst = root.join("dst");

        write(&src.join("shared.txt"), "new");
        write(&dst.join("shared.txt"), "old");
        write(&dst.join("mine/user.txt"), "keep me");

        merge_tree(&src, &dst, MergePolicy::Overwrite).unwrap();

        assert_eq!(fs::read_to_string(dst.join("shared.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dst.join("mine/user.txt")).unwrap(), "keep me");
    }

    #[test]
    fn test_merge_twice_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("src");
        let dst = root.join("dst");

        write(&src.join("x/y.h"), "header");
        write(&src.join("z.c"), "source");

        merge_tree(&src, &dst, MergePolicy::Overwrite).unwrap();
        let second = merge_tree(&src, &dst, MergePolicy::Overwrite).unwrap();

        assert_eq!(second.dirs_created, 0);
        assert_eq!(fs::read_to_string(dst.join("x/y.h")).unwrap(), "header");
        assert_eq!(fs::read_to_string(dst.join("z.c")).unwrap(), "source");
        let names: Vec<_> = fs::read_dir(&dst).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_overwrite_replaces_newer_target() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("src");
        let dst = root.join("dst");

        write(&src.join("f.txt"), "source");
        write(&dst.join("f.txt"), "edited");
        set_mtime(&src.join("f.txt"), SystemTime::now() - Duration::from_secs(3600));

        merge_tree(&src, &dst, MergePolicy::Overwrite).unwrap();

        assert_eq!(fs::read_to_string(dst.join("f.txt")).unwrap(), "source");
    }

    #[test]
    fn test_update_stale_keeps_newer_target() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("src");
        let dst = root.join("dst");

        write(&src.join("fresh.txt"), "source");
        write(&src.join("stale.txt"), "source");
        write(&dst.join("fresh.txt"), "edited");
        write(&dst.join("stale.txt"), "outdated");

        let now = SystemTime::now();
        set_mtime(&src.join("fresh.txt"), now - Duration::from_secs(3600));
        set_mtime(&dst.join("stale.txt"), now - Duration::from_secs(3600));

        let report = merge_tree(&src, &dst, MergePolicy::UpdateStale).unwrap();

        assert_eq!(fs::read_to_string(dst.join("fresh.txt")).unwrap(), "edited");
        assert_eq!(fs::read_to_string(dst.join("stale.txt")).unwrap(), "source");
        assert_eq!(report.files_kept, 1);
        assert_eq!(report.files_copied, 1);
    }

    #[test]
    fn test_update_stale_through_intermediate_copy() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("src");
        let staging = root.join("staging");
        let dst = root.join("dst");

        write(&src.join("effect.h"), "effect");
        set_mtime(&src.join("effect.h"), SystemTime::now() - Duration::from_secs(3600));

        merge_tree(&src, &staging, MergePolicy::Overwrite).unwrap();
        merge_tree(&staging, &dst, MergePolicy::UpdateStale).unwrap();
        write(&dst.join("effect.h"), "locally edited");

        // The staging tree is rebuilt before every install
        fs::remove_dir_all(&staging).unwrap();
        merge_tree(&src, &staging, MergePolicy::Overwrite).unwrap();
        let report = merge_tree(&staging, &dst, MergePolicy::UpdateStale).unwrap();

        assert_eq!(report.files_kept, 1);
        assert_eq!(fs::read_to_string(dst.join("effect.h")).unwrap(), "locally edited");
    }

    #[test]
    fn test_copy_file_keeps_modification_time() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("a.txt");
        let dst = root.join("b.txt");
        write(&src, "content");
        let then = SystemTime::now() - Duration::from_secs(7200);
        set_mtime(&src, then);

        copy_file(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(&dst).unwrap(), "content");
        assert_eq!(
            fs::metadata(&dst).unwrap().modified().unwrap(),
            fs::metadata(&src).unwrap().modified().unwrap()
        );
    }

    #[test]
    fn test_merge_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);

        let err = merge_tree(&root.join("nope"), &root.join("dst"), MergePolicy::Overwrite).unwrap_err();
        assert!(matches!(err, Error::Merge { .. }));
        assert!(!root.join("dst").exists());
    }

    #[test]
    fn test_copy_fresh_applies_excludes() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("snippets");
        let dst = root.join("out/examples");

        write(&src.join("delay.cpp"), "code");
        write(&src.join("README.md"), "docs");
        write(&src.join("filters/lowpass.cpp"), "code");
        write(&src.join("filters/notes.md"), "docs");
        write(&src.join(".git/HEAD"), "ref");
        write(&src.join("sub/.git"), "gitdir: ..");

        let report = copy_tree_fresh(&src, &dst, crate::layout::SNIPPET_EXCLUDES).unwrap();

        assert!(dst.join("delay.cpp").is_file());
        assert!(dst.join("filters/lowpass.cpp").is_file());
        assert!(!dst.join("README.md").exists());
        assert!(!dst.join("filters/notes.md").exists());
        assert!(!dst.join(".git").exists());
        assert!(!dst.join("sub/.git").exists());
        assert_eq!(report.files_copied, 2);
    }

    #[test]
    fn test_copy_fresh_refuses_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let root = root(&temp_dir);
        let src = root.join("snippets");
        let dst = root.join("examples");

        write(&src.join("a.cpp"), "code");
        fs::create_dir_all(&dst).unwrap();

        let err = copy_tree_fresh(&src, &dst, &[]).unwrap_err();
        assert!(matches!(err, Error::Merge { .. }));
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("README.md", "*.md"));
        assert!(matches_pattern(".git", "*.git"));
        assert!(!matches_pattern("main.cpp", "*.md"));
        assert!(matches_pattern("Thumbs.db", "Thumbs.db"));
        assert!(matches_pattern("tmp-123", "tmp-*"));
    }
}
