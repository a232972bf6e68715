//! Prepare command implementation

use camino::Utf8Path;
use clap::Args;
use miette::Result;

use crate::bootstrap::{BootstrapOptions, Bootstrapper};
use crate::fetch::HttpDownloader;
use crate::layout::BundleLayout;
use crate::link::host_linker;

/// Arguments for the prepare command
#[derive(Debug, Args)]
pub struct PrepareArgs {
    /// Do not run `git submodule update`
    #[arg(long)]
    pub skip_submodules: bool,

    /// Download this libCppJit release (overrides `[jit] version`)
    #[arg(long, value_name = "VERSION")]
    pub fetch_jit: Option<String>,
}

/// Run the prepare command
pub fn run(workspace_root: &Utf8Path, args: PrepareArgs) -> Result<()> {
    tracing::info!("Preparing checkout at {}", workspace_root);

    let layout = BundleLayout::new(workspace_root);
    let linker = host_linker();
    let downloader = HttpDownloader::new();

    let options = BootstrapOptions {
        update_submodules: !args.skip_submodules,
        jit_version: args.fetch_jit,
    };

    let report = Bootstrapper::new(&layout, linker.as_ref(), &downloader).run(&options)?;

    if report.config_created {
        println!(
            "Created {}; edit the install paths before running postprocess",
            layout.make_dir().join(crate::config::CONFIG_FILE)
        );
    }
    for path in &report.jit_files {
        println!("Installed {}", path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_without_jit_needs_no_network() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();

        run(
            root,
            PrepareArgs {
                skip_submodules: true,
                fetch_jit: None,
            },
        )
        .unwrap();

        assert!(root.join("make/config.toml").is_file());
        assert!(!root.join("projects/cppape/src/libCppJit.h").exists());
    }
}
