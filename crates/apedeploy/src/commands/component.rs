//! Component command implementation

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use miette::Result;

use crate::driver::postprocess_component;
use crate::layout::BundleLayout;

/// Arguments for the component command
#[derive(Debug, Args)]
pub struct ComponentArgs {
    /// Built Audio Unit bundle (must end in `.component`)
    pub bundle: Utf8PathBuf,
}

/// Run the component command
pub fn run(workspace_root: &Utf8Path, args: ComponentArgs) -> Result<()> {
    let layout = BundleLayout::new(workspace_root);

    let report = postprocess_component(&layout, &args.bundle)?;
    tracing::info!(
        files = report.files_copied,
        "Populated {}",
        args.bundle.join("Contents/Resources")
    );

    println!("Postprocess finished successfully");
    Ok(())
}
