//! Checkout preparation
//!
//! Brings a fresh clone into a buildable state: submodules, the default
//! configuration, the generated-code module alias and optionally the prebuilt
//! JIT compiler.

use camino::{Utf8Path, Utf8PathBuf};
use std::process::Command;

use crate::config::Config;
use crate::fetch::{Downloader, HostPlatform, RemoteComponentFetcher};
use crate::layout::BundleLayout;
use crate::link::PathLinker;
use crate::{Error, Result};

/// Module folder the plugin's generated project code expects
pub const JUCE_MODULES_LINK: &str = "projects/plugin/JuceLibraryCode/modules";

/// Vendored JUCE modules the alias points at
pub const JUCE_MODULES_TARGET: &str = "external/juce/modules";

/// What `prepare` should do
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    /// Run `git submodule update` first
    pub update_submodules: bool,
    /// libCppJit release to fetch; falls back to `[jit] version` in the config
    pub jit_version: Option<String>,
}

/// What `prepare` did
#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    pub submodules_updated: bool,
    pub config_created: bool,
    pub modules_linked: bool,
    pub jit_files: Vec<Utf8PathBuf>,
}

/// Prepares a project checkout for building
pub struct Bootstrapper<'a> {
    layout: &'a BundleLayout,
    linker: &'a dyn PathLinker,
    downloader: &'a dyn Downloader,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(
        layout: &'a BundleLayout,
        linker: &'a dyn PathLinker,
        downloader: &'a dyn Downloader,
    ) -> Self {
        Self {
            layout,
            linker,
            downloader,
        }
    }

    pub fn run(&self, options: &BootstrapOptions) -> Result<BootstrapReport> {
        let mut report = BootstrapReport::default();

        if options.update_submodules {
            update_submodules(&self.layout.root)?;
            report.submodules_updated = true;
        } else {
            tracing::info!("Skipping submodule update");
        }

        let make_dir = self.layout.make_dir();
        report.config_created = Config::write_default(&make_dir)?;

        report.modules_linked = self.link_modules()?;

        let version = match &options.jit_version {
            Some(version) => Some(version.clone()),
            None => Config::load(&make_dir)?.jit.version,
        };
        match version {
            Some(version) => {
                let platform = HostPlatform::detect()?;
                report.jit_files = RemoteComponentFetcher::new(&self.layout.root, self.downloader)
                    .fetch(&version, platform)?;
            }
            None => tracing::info!("No libCppJit version requested, skipping download"),
        }

        Ok(report)
    }

    /// Alias the vendored JUCE modules into the plugin project.
    ///
    /// Returns whether an alias was created.
    pub fn link_modules(&self) -> Result<bool> {
        let link = self.layout.resolve(Utf8Path::new(JUCE_MODULES_LINK));
        let target = self.layout.resolve(Utf8Path::new(JUCE_MODULES_TARGET));

        if link.exists() || link.is_symlink() {
            tracing::info!(path = %link, "Module folder already present");
            return Ok(false);
        }
        if !target.is_dir() {
            tracing::warn!(path = %target, "JUCE modules not found, skipping module alias");
            return Ok(false);
        }

        self.linker.link(&target, &link)?;
        Ok(true)
    }
}

/// Initialize and update every submodule of the checkout
pub fn update_submodules(root: &Utf8Path) -> Result<()> {
    let git = which::which("git").map_err(|e| {
        Error::command(
            format!("git not found: {}", e),
            "Install git or re-run with --skip-submodules",
        )
    })?;

    for args in [
        &["submodule", "update", "--init", "--recursive"][..],
        &["submodule", "update"][..],
    ] {
        tracing::info!("Running: git {}", args.join(" "));
        let status = Command::new(&git).args(args).current_dir(root).status()?;

        if !status.success() {
            return Err(Error::command(
                format!("git {} failed with {}", args.join(" "), status),
                "Check the repository remotes and network access",
            ));
        }
    }

    Ok(())
}
