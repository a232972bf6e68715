//! Staging tree assembly
//!
//! Composes a bundle from the skeleton, the vendored trees and a snapshot of the
//! example snippets.

use camino::Utf8Path;

use crate::layout::{examples_dir_name, BundleLayout, SNIPPET_EXCLUDES};
use crate::merge::{copy_tree_fresh, merge_tree, MergePolicy, MergeReport};
use crate::Result;

/// Builds the bundle contents into a directory
pub struct SkeletonAssembler<'a> {
    layout: &'a BundleLayout,
}

impl<'a> SkeletonAssembler<'a> {
    pub fn new(layout: &'a BundleLayout) -> Self {
        Self { layout }
    }

    /// Assemble the bundle into `staging_root`.
    ///
    /// The skeleton goes in first, then every vendor tree under its own
    /// subpath, then the snippet snapshot. The snapshot directory must not
    /// exist yet, so `staging_root` is expected to be fresh.
    pub fn assemble(&self, staging_root: &Utf8Path, release: bool) -> Result<MergeReport> {
        tracing::info!(staging = %staging_root, release, "Assembling bundle skeleton");

        let mut report = merge_tree(&self.layout.skeleton_dir(), staging_root, MergePolicy::Overwrite)?;

        for vendor in &self.layout.vendor_trees {
            let source = self.layout.resolve(&vendor.source);
            let target = staging_root.join(&vendor.target);
            tracing::debug!(vendor = %vendor.name, target = %vendor.target, "Merging vendor tree");
            report += merge_tree(&source, &target, MergePolicy::Overwrite)?;
        }

        let examples = staging_root.join(examples_dir_name(release));
        tracing::debug!(target = %examples, "Copying example snippets");
        report += copy_tree_fresh(&self.layout.snippets_dir(), &examples, SNIPPET_EXCLUDES)?;

        tracing::info!(
            files = report.files_copied,
            dirs = report.dirs_created,
            "Bundle skeleton assembled"
        );
        Ok(report)
    }
}

/// Log every DLL in a build output directory.
///
/// Purely informational: shows which binaries are candidates for installation.
pub fn log_dll_candidates(build_output: &Utf8Path) {
    let entries = match std::fs::read_dir(build_output) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %build_output, error = %e, "Cannot list build output directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_dll = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dll"));

        if is_dll && path.is_file() {
            tracing::info!(file = %path.display(), "Found build output DLL");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::VendorTree;
    use crate::Error;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Utf8Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Checkout with a skeleton, two vendor trees and a snippet repository
    fn fixture() -> (TempDir, BundleLayout) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();

        write(&root.join("make/skeleton/a/b.txt"), "skeleton");
        write(&root.join("make/skeleton/includes/effect.h"), "effect");
        write(&root.join("external/ccore/include/x.h"), "ccore");
        write(&root.join("external/libcxx/include/vector"), "libcxx");
        write(&root.join("external/ape-snippets/delay.cpp"), "delay");
        write(&root.join("external/ape-snippets/README.md"), "readme");

        let mut layout = BundleLayout::new(root);
        layout.vendor_trees = vec![
            VendorTree::new("ccore", "external/ccore/include", "includes/ccore"),
            VendorTree::new("libcxx", "external/libcxx/include", "includes/libcxx"),
        ];

        (temp_dir, layout)
    }

    fn relative_files(root: &Utf8Path) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(root)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                e.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_assemble_skeleton_and_vendor() {
        let (_temp_dir, layout) = fixture();
        let staging = layout.staging_dir();

        SkeletonAssembler::new(&layout).assemble(&staging, true).unwrap();

        assert_eq!(fs::read_to_string(staging.join("a/b.txt")).unwrap(), "skeleton");
        assert_eq!(fs::read_to_string(staging.join("includes/ccore/x.h")).unwrap(), "ccore");
    }

    #[test]
    fn test_vendor_files_stay_in_their_subpath() {
        let (_temp_dir, layout) = fixture();
        let staging = layout.staging_dir();

        SkeletonAssembler::new(&layout).assemble(&staging, true).unwrap();

        assert_eq!(
            relative_files(&staging),
            vec![
                "a/b.txt",
                "examples/delay.cpp",
                "includes/ccore/x.h",
                "includes/effect.h",
                "includes/libcxx/vector",
            ]
        );
    }

    #[test]
    fn test_examples_dir_depends_on_mode() {
        let (_temp_dir, layout) = fixture();
        let release = layout.root.join("release");
        let develop = layout.root.join("develop");

        let assembler = SkeletonAssembler::new(&layout);
        assembler.assemble(&release, true).unwrap();
        assembler.assemble(&develop, false).unwrap();

        assert!(release.join("examples/delay.cpp").is_file());
        assert!(!release.join("examples-release").exists());
        assert!(develop.join("examples-release/delay.cpp").is_file());
        assert!(!develop.join("examples").exists());
        assert!(!develop.join("examples-release/README.md").exists());
    }

    #[test]
    fn test_assemble_twice_fails_on_leftover_examples() {
        let (_temp_dir, layout) = fixture();
        let staging = layout.staging_dir();
        let assembler = SkeletonAssembler::new(&layout);

        assembler.assemble(&staging, true).unwrap();
        let err = assembler.assemble(&staging, true).unwrap_err();

        assert!(matches!(err, Error::Merge { .. }));
    }

    #[test]
    fn test_missing_vendor_tree() {
        let (_temp_dir, mut layout) = fixture();
        layout
            .vendor_trees
            .push(VendorTree::new("shared-src", "shared-src", "includes/shared-src"));

        let err = SkeletonAssembler::new(&layout)
            .assemble(&layout.staging_dir(), true)
            .unwrap_err();

        assert!(matches!(err, Error::Merge { .. }));
    }
}
