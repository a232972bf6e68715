//! Build output injection and bundle installation

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::{Config, PlatformKey};
use crate::layout::{ArtifactOrigin, BundleLayout, EXAMPLES_DIR, PRODUCT_NAME};
use crate::link::PathLinker;
use crate::merge::{copy_file, merge_tree, MergePolicy, MergeReport};
use crate::{Error, Result};

/// Directories the build step wrote its binaries to
#[derive(Debug, Clone)]
pub struct BuildOutputs {
    /// Per-platform output directory
    pub build_dir: Utf8PathBuf,
    /// Output directory for platform-agnostic binaries, if separate
    pub platform_agnostic_dir: Option<Utf8PathBuf>,
}

impl BuildOutputs {
    pub fn new(build_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            platform_agnostic_dir: None,
        }
    }

    pub fn with_platform_agnostic_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.platform_agnostic_dir = Some(dir.into());
        self
    }

    fn dir_for(&self, origin: ArtifactOrigin) -> &Utf8Path {
        match origin {
            ArtifactOrigin::BuildOutput => &self.build_dir,
            ArtifactOrigin::PlatformAgnostic => {
                self.platform_agnostic_dir.as_deref().unwrap_or(&self.build_dir)
            }
        }
    }
}

/// Result of a successful installation
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Plugin folder the bundle was installed to
    pub destination: Utf8PathBuf,
    pub merge: MergeReport,
    /// Whether the example directory was created as a live alias
    pub examples_linked: bool,
}

/// Copies build outputs into a staging tree and installs it
pub struct ArtifactInstaller<'a> {
    layout: &'a BundleLayout,
    config: &'a Config,
    linker: &'a dyn PathLinker,
}

impl<'a> ArtifactInstaller<'a> {
    pub fn new(layout: &'a BundleLayout, config: &'a Config, linker: &'a dyn PathLinker) -> Self {
        Self {
            layout,
            config,
            linker,
        }
    }

    /// Copy every build output into its place in the staging tree.
    ///
    /// Skeleton placeholders at the same paths are replaced. Returns the
    /// number of artifacts copied.
    pub fn inject_artifacts(&self, staging_root: &Utf8Path, outputs: &BuildOutputs) -> Result<usize> {
        for artifact in &self.layout.artifacts {
            let source = outputs.dir_for(artifact.origin).join(&artifact.file_name);
            if !source.is_file() {
                return Err(Error::artifact(
                    format!("Build output not found: {}", source),
                    "Build the plugin and compiler projects for this configuration first",
                ));
            }

            let target = staging_root.join(&artifact.target);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if target.exists() {
                std::fs::remove_file(&target)?;
            }

            copy_file(&source, &target)?;
            tracing::debug!(source = %source, target = %target, "Injected build output");
        }

        Ok(self.layout.artifacts.len())
    }

    /// Plugin folder for a platform key as given on the command line
    pub fn resolve_destination(&self, platform: &str) -> Result<Utf8PathBuf> {
        let key: PlatformKey = platform.parse()?;
        let root = self.config.output_root(key)?;
        Ok(root.join(PRODUCT_NAME))
    }

    /// Install a freshly assembled staging tree.
    ///
    /// Release installs overwrite every file of the bundle. Development
    /// installs only replace stale files, and alias the snippet repository as
    /// the example directory unless the destination already has one. Nothing
    /// outside the staging tree is touched before the platform key resolves.
    pub fn install(
        &self,
        staging_root: &Utf8Path,
        outputs: &BuildOutputs,
        platform: &str,
        release: bool,
    ) -> Result<InstallReport> {
        let injected = self.inject_artifacts(staging_root, outputs)?;
        tracing::info!(count = injected, "Injected build outputs");

        let destination = self.resolve_destination(platform)?;
        tracing::info!(destination = %destination, release, "Installing bundle");

        let examples = destination.join(EXAMPLES_DIR);
        if release && examples.is_symlink() {
            // The snapshot must not be written through into the snippet checkout
            tracing::info!(path = %examples, "Replacing example alias with release snapshot");
            self.linker.unlink(&examples)?;
        }

        let merge = merge_tree(staging_root, &destination, MergePolicy::for_install(release))?;

        let mut examples_linked = false;
        if !release {
            if examples.exists() || examples.is_symlink() {
                tracing::debug!(path = %examples, "Example directory already present");
            } else {
                self.linker.link(&self.layout.snippets_dir(), &examples)?;
                examples_linked = true;
            }
        }

        Ok(InstallReport {
            destination,
            merge,
            examples_linked,
        })
    }
}
