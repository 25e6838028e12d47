// src/error.rs
// Error types for configuration resolution and declaration emission

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the emit-declaration library
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("No '{name}' file found")]
    ConfigNotFound { name: String, search_root: PathBuf },

    #[error("Error while parsing '{name}' file: {reason}")]
    ConfigParse {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Circular 'extends' chain in '{name}' file: {}", display_chain(.chain))]
    ConfigCycle { name: String, chain: Vec<PathBuf> },

    #[error("Error while parsing '{name}' file: invalid compiler option '{option}': {reason}")]
    OptionsValidation {
        name: String,
        option: String,
        reason: String,
    },

    #[error("emission I/O error on {}: {source}", .path.display())]
    EmissionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start compiler '{}': {source}", .program.display())]
    CompilerSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compiler exited abnormally ({status})")]
    CompilerFailed { status: String, output: String },

    #[error("watch compiler exited before the initial declaration pass completed")]
    WatchAborted,

    #[error("cannot emit while a watch session is running")]
    AlreadyWatching,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Result using EmitError
pub type Result<T> = std::result::Result<T, EmitError>;

impl EmitError {
    /// Wrap an I/O failure on an emitted or generated file
    pub fn emission(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| EmitError::EmissionIo { path, source }
    }
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
