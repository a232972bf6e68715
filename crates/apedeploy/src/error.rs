//! Error types for apedeploy

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for apedeploy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for apedeploy
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to write TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Configuration error (missing or unusable configuration file)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[help]
        help: String,
    },

    /// Unrecognized or unconfigured platform key
    #[error("Platform error: {message}")]
    Platform {
        message: String,
        #[help]
        help: String,
    },

    /// Directory merge error
    #[error("Merge error: {message}")]
    Merge {
        message: String,
        #[help]
        help: String,
    },

    /// Directory alias error
    #[error("Link error: {message}")]
    Link {
        message: String,
        #[help]
        help: String,
    },

    /// Missing or uncopyable build artifact
    #[error("Artifact error: {message}")]
    Artifact {
        message: String,
        #[help]
        help: String,
    },

    /// Remote component download or extraction error
    #[error("Fetch error: {message}")]
    Fetch {
        message: String,
        #[help]
        help: String,
    },

    /// Plugin bundle error
    #[error("Bundle error: {message}")]
    Bundle {
        message: String,
        #[help]
        help: String,
    },

    /// External command error
    #[error("Command error: {message}")]
    Command {
        message: String,
        #[help]
        help: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a platform resolution error
    pub fn platform(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a merge error
    pub fn merge(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Merge {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a link error
    pub fn link(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Link {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create an artifact error
    pub fn artifact(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Artifact {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a fetch error
    pub fn fetch(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a bundle error
    pub fn bundle(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Bundle {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create an external command error
    pub fn command(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
            help: help.into(),
        }
    }
}
