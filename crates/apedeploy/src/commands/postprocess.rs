//! Postprocess command implementation

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use miette::Result;

use crate::driver::DeploymentDriver;
use crate::install::BuildOutputs;
use crate::layout::BundleLayout;
use crate::link::host_linker;

/// Arguments for the postprocess command
#[derive(Debug, Args)]
pub struct PostprocessArgs {
    /// Directory the plugin and compiler binaries were built into
    pub build_output_dir: Utf8PathBuf,

    /// Target platform: Win32 (or x86) or x64
    pub platform: String,

    /// Directory holding platform-agnostic build outputs (default: BUILD_OUTPUT_DIR)
    pub platform_agnostic_dir: Option<Utf8PathBuf>,

    /// Overwrite the whole installed bundle and ship an example snapshot
    #[arg(long)]
    pub release: bool,
}

/// Run the postprocess command
pub fn run(workspace_root: &Utf8Path, args: PostprocessArgs) -> Result<()> {
    let layout = BundleLayout::new(workspace_root);
    let linker = host_linker();

    let mut outputs = BuildOutputs::new(args.build_output_dir);
    if let Some(dir) = args.platform_agnostic_dir {
        outputs = outputs.with_platform_agnostic_dir(dir);
    }

    let mut driver = DeploymentDriver::new(&layout, linker.as_ref());
    let report = driver.run(&outputs, &args.platform, args.release)?;

    if report.examples_linked {
        tracing::info!("Examples are linked to {}", layout.snippets_dir());
    }

    println!("Postprocess finished successfully");
    Ok(())
}
