//! Deployment run orchestration
//!
//! A run validates the configuration, assembles a fresh staging tree, installs
//! it and removes the staging tree again. The staging tree is owned by a
//! [`StagingGuard`], so it is removed on every exit path once the
//! configuration has been validated.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

use crate::assemble::{log_dll_candidates, SkeletonAssembler};
use crate::config::Config;
use crate::install::{ArtifactInstaller, BuildOutputs, InstallReport};
use crate::layout::{BundleLayout, EXAMPLES_DIR};
use crate::link::PathLinker;
use crate::merge::MergeReport;
use crate::{Error, Result};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Progress of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    ConfigValidated,
    StagingClean,
    Assembled,
    Installed,
    CleanedUp(Outcome),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => f.write_str("start"),
            Phase::ConfigValidated => f.write_str("config-validated"),
            Phase::StagingClean => f.write_str("staging-clean"),
            Phase::Assembled => f.write_str("assembled"),
            Phase::Installed => f.write_str("installed"),
            Phase::CleanedUp(Outcome::Success) => f.write_str("cleaned-up (success)"),
            Phase::CleanedUp(Outcome::Failure) => f.write_str("cleaned-up (failure)"),
        }
    }
}

/// Remove a staging tree if present.
///
/// Returns whether anything was removed.
pub fn remove_staging(path: &Utf8Path) -> Result<bool> {
    if path.symlink_metadata().is_err() {
        return Ok(false);
    }

    if path.is_symlink() || path.is_file() {
        std::fs::remove_file(path)?;
    } else {
        std::fs::remove_dir_all(path)?;
    }

    tracing::debug!(path = %path, "Removed staging tree");
    Ok(true)
}

/// Removes the staging tree when dropped
#[derive(Debug)]
pub struct StagingGuard {
    path: Utf8PathBuf,
    armed: bool,
}

impl StagingGuard {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Remove the staging tree now, reporting any error
    pub fn finish(mut self) -> Result<()> {
        self.armed = false;
        remove_staging(&self.path)?;
        Ok(())
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = remove_staging(&self.path) {
            tracing::warn!(path = %self.path, error = %e, "Failed to remove staging tree");
        }
    }
}

/// Runs assembly and installation against a project checkout
pub struct DeploymentDriver<'a> {
    layout: &'a BundleLayout,
    linker: &'a dyn PathLinker,
    phase: Phase,
}

impl<'a> DeploymentDriver<'a> {
    pub fn new(layout: &'a BundleLayout, linker: &'a dyn PathLinker) -> Self {
        Self {
            layout,
            linker,
            phase: Phase::Start,
        }
    }

    /// Last phase reached
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, phase: Phase) {
        tracing::debug!(from = %self.phase, to = %phase, "Deployment phase");
        self.phase = phase;
    }

    /// Assemble the bundle and install it for `platform`.
    ///
    /// A missing configuration fails before anything is written. Every later
    /// failure still removes the staging tree.
    pub fn run(&mut self, outputs: &BuildOutputs, platform: &str, release: bool) -> Result<InstallReport> {
        let config = Config::load(&self.layout.make_dir())?;
        self.advance(Phase::ConfigValidated);

        let guard = StagingGuard::new(self.layout.staging_dir());
        match self.deploy(&guard, &config, outputs, platform, release) {
            Ok(report) => {
                guard.finish()?;
                self.advance(Phase::CleanedUp(Outcome::Success));
                Ok(report)
            }
            Err(e) => {
                drop(guard);
                self.advance(Phase::CleanedUp(Outcome::Failure));
                Err(e)
            }
        }
    }

    fn deploy(
        &mut self,
        guard: &StagingGuard,
        config: &Config,
        outputs: &BuildOutputs,
        platform: &str,
        release: bool,
    ) -> Result<InstallReport> {
        let staging = guard.path();
        if remove_staging(staging)? {
            tracing::info!(path = %staging, "Removed leftover staging tree");
        }
        self.advance(Phase::StagingClean);

        log_dll_candidates(&outputs.build_dir);
        SkeletonAssembler::new(self.layout).assemble(staging, release)?;
        self.advance(Phase::Assembled);

        let report =
            ArtifactInstaller::new(self.layout, config, self.linker).install(staging, outputs, platform, release)?;
        self.advance(Phase::Installed);

        tracing::info!(
            destination = %report.destination,
            copied = report.merge.files_copied,
            kept = report.merge.files_kept,
            "Bundle installed"
        );
        Ok(report)
    }
}

/// Assemble the bundle resources into a built macOS Audio Unit.
///
/// `bundle` must be an existing directory with the `.component` extension.
/// The bundle is always populated in release mode; an example snapshot left
/// by an earlier post-process is replaced.
pub fn postprocess_component(layout: &BundleLayout, bundle: &Utf8Path) -> Result<MergeReport> {
    if bundle.extension() != Some("component") {
        return Err(Error::bundle(
            format!("{} is not a component bundle", bundle),
            "Pass the path of the built Audio Unit, ending in `.component`",
        ));
    }
    if !bundle.is_dir() {
        return Err(Error::bundle(
            format!("Component bundle not found: {}", bundle),
            "Build the Audio Unit target before post-processing it",
        ));
    }

    let resources = bundle.join("Contents/Resources");
    let examples = resources.join(EXAMPLES_DIR);
    if examples.is_dir() {
        tracing::info!(path = %examples, "Replacing previous example snapshot");
        std::fs::remove_dir_all(&examples)?;
    }

    SkeletonAssembler::new(layout).assemble(&resources, true)
}
