//! CLI subcommand implementations

pub mod component;
pub mod fetch_jit;
pub mod postprocess;
pub mod prepare;
