//! apedeploy CLI - Audio Programming Environment bundle deployment

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use apedeploy::commands;

/// apedeploy - Audio Programming Environment bundle deployment
#[derive(Debug, Parser)]
#[command(name = "apedeploy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project checkout root
    #[arg(short = 'w', long, global = true)]
    workspace: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Assemble the bundle and install it into the plugin folder
    Postprocess(commands::postprocess::PostprocessArgs),

    /// Prepare a fresh checkout for building
    Prepare(commands::prepare::PrepareArgs),

    /// Download the prebuilt libCppJit for this host
    FetchJit(commands::fetch_jit::FetchJitArgs),

    /// Populate the resources of a built macOS Audio Unit
    Component(commands::component::ComponentArgs),
}

fn init_tracing(verbose: bool) {
    // RUST_LOG takes precedence over --verbose
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Log lines go through the layer so they do not tear the download bar
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let workspace_root = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir()
            .ok()
            .and_then(|p| Utf8PathBuf::try_from(p).ok())
            .unwrap_or_else(|| Utf8PathBuf::from(".")),
    };

    match cli.command {
        Commands::Postprocess(args) => commands::postprocess::run(&workspace_root, args),
        Commands::Prepare(args) => commands::prepare::run(&workspace_root, args),
        Commands::FetchJit(args) => commands::fetch_jit::run(&workspace_root, args),
        Commands::Component(args) => commands::component::run(&workspace_root, args),
    }
}
