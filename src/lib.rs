// src/lib.rs
// emit-declaration - TypeScript declaration emit as a bundler build side-effect

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod compiler;
pub mod config;
pub mod error;
pub mod plugin;
pub mod reporter;
pub mod utils;
pub use error::{EmitError, Result};
