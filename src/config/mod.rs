// src/config/mod.rs
// Project configuration: lookup, inheritance and typed compiler options

pub mod jsonc;
pub mod options;
pub mod resolve;

pub use options::{CompilerOptions, EnumValue, OptionValue, process};
pub use resolve::{ProjectConfig, find_config_file, resolve};

/// Configuration file looked up when none is named
pub const DEFAULT_CONFIG_NAME: &str = "tsconfig.json";
