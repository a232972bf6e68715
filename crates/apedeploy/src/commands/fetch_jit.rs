//! Fetch-jit command implementation

use camino::Utf8Path;
use clap::Args;
use miette::Result;

use crate::fetch::{HostPlatform, HttpDownloader, RemoteComponentFetcher};

/// Arguments for the fetch-jit command
#[derive(Debug, Args)]
pub struct FetchJitArgs {
    /// libCppJit release to download, e.g. 0.1.0
    pub version: String,
}

/// Run the fetch-jit command
pub fn run(workspace_root: &Utf8Path, args: FetchJitArgs) -> Result<()> {
    let platform = HostPlatform::detect()?;
    let downloader = HttpDownloader::new();

    let written = RemoteComponentFetcher::new(workspace_root, &downloader)
        .fetch(&args.version, platform)?;

    for path in &written {
        println!("Installed {}", path);
    }
    Ok(())
}
