//! apedeploy - Audio Programming Environment bundle deployment
//!
//! This crate provides both a library and CLI for apedeploy, including:
//! - Configuration file parsing and merging
//! - Directory tree merging and platform directory aliases
//! - Staging tree assembly from the skeleton, vendored trees and examples
//! - Build output injection and installation into the plugin folder
//! - Prebuilt libCppJit download
//! - Checkout bootstrap

pub mod assemble;
pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod fetch;
pub mod install;
pub mod layout;
pub mod link;
pub mod merge;

pub use error::{Error, Result};
