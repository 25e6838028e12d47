// src/plugin.rs
// Bundler-facing surface: plugin options, host build options and the build-end hook

use crate::compiler::{CompilerBackend, EmitSummary, TsCompiler, TsCompilerOptions, TscBackend};
use crate::config::DEFAULT_CONFIG_NAME;
use crate::error::Result;
use crate::reporter::{ConsoleReporter, Reporter};
use crate::utils::absolutize;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const PLUGIN_NAME: &str = "emit-declaration";

/// Output directory used when neither the plugin nor the host names one
pub const DEFAULT_OUT_DIR: &str = "dist";

/// Options given to the plugin by its user
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmitDeclarationOptions {
    pub cwd: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub ts_config: Option<String>,
    pub incremental: bool,
}

impl EmitDeclarationOptions {
    /// Fill in defaults; `cwd` falls back to the process working directory
    pub fn resolve(&self) -> Result<TsCompilerOptions> {
        let cwd = match &self.cwd {
            Some(cwd) => absolutize(&std::env::current_dir()?, cwd),
            None => std::env::current_dir()?,
        };

        Ok(TsCompilerOptions {
            cwd,
            out_dir: self
                .out_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            ts_config: self
                .ts_config
                .clone()
                .unwrap_or_else(|| DEFAULT_CONFIG_NAME.to_string()),
            incremental: self.incremental,
        })
    }
}

/// Entry points in any of the shapes a bundler accepts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EntryPoints {
    Single(String),
    List(Vec<String>),
    Named(BTreeMap<String, String>),
}

impl EntryPoints {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            EntryPoints::Single(path) => vec![path.as_str()],
            EntryPoints::List(paths) => paths.iter().map(String::as_str).collect(),
            EntryPoints::Named(paths) => paths.values().map(String::as_str).collect(),
        }
    }
}

/// Host watch setting: a flag, or an options object meaning "on"
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WatchSetting {
    Enabled(bool),
    Options(serde_json::Map<String, serde_json::Value>),
}

/// The part of the host's build options the plugin reads
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    pub entry_points: Option<EntryPoints>,
    pub outdir: Option<PathBuf>,
    pub watch: Option<WatchSetting>,
}

impl BuildOptions {
    pub fn is_watch(&self) -> bool {
        match &self.watch {
            Some(WatchSetting::Enabled(enabled)) => *enabled,
            Some(WatchSetting::Options(_)) => true,
            None => false,
        }
    }

    /// Entry points flattened and resolved against `cwd`
    pub fn entry_point_paths(&self, cwd: &Path) -> Vec<PathBuf> {
        self.entry_points
            .as_ref()
            .map(|entries| {
                entries
                    .paths()
                    .into_iter()
                    .map(|entry| absolutize(cwd, Path::new(entry)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Outcome of one host build, as seen by the build-end hook
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildResult {
    pub errors: Vec<String>,
}

impl BuildResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// The plugin as registered with a bundler
pub struct EmitDeclarationPlugin {
    options: EmitDeclarationOptions,
    backend: Option<Arc<dyn CompilerBackend>>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl EmitDeclarationPlugin {
    pub fn new(options: EmitDeclarationOptions) -> Self {
        Self {
            options,
            backend: None,
            reporter: None,
        }
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    /// Use `backend` instead of locating `tsc`
    pub fn with_backend(mut self, backend: Arc<dyn CompilerBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use `reporter` instead of printing to stdout
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Plugin setup: builds the compiler for this build configuration.
    ///
    /// Configuration errors surface here, before any build runs.
    pub fn setup(&self, build: &BuildOptions) -> Result<BuildHooks> {
        let options = self.options.resolve()?;

        let backend: Arc<dyn CompilerBackend> = match &self.backend {
            Some(backend) => backend.clone(),
            None => Arc::new(TscBackend::locate(&options.cwd)),
        };
        let reporter: Arc<dyn Reporter> = match &self.reporter {
            Some(reporter) => reporter.clone(),
            None => {
                let label = build.outdir.as_deref().unwrap_or(options.out_dir.as_path());
                Arc::new(ConsoleReporter::new(label))
            }
        };

        let compiler = TsCompiler::new(build, options, backend, reporter)?;
        Ok(BuildHooks {
            compiler: Arc::new(compiler),
            watch_mode: build.is_watch(),
        })
    }
}

/// Hooks registered for one build configuration
#[derive(Clone)]
pub struct BuildHooks {
    compiler: Arc<TsCompiler>,
    watch_mode: bool,
}

impl BuildHooks {
    pub fn compiler(&self) -> &Arc<TsCompiler> {
        &self.compiler
    }

    pub fn is_watch_mode(&self) -> bool {
        self.watch_mode
    }

    /// Build-end hook. Returns the emit summary for one-shot builds.
    pub async fn on_end(&self, result: &BuildResult) -> Result<Option<EmitSummary>> {
        if result.has_errors() {
            debug!(errors = result.errors.len(), "Build failed, skipping declarations");
            return Ok(None);
        }

        if self.watch_mode {
            self.compiler.watch().await?;
            Ok(None)
        } else {
            self.compiler.emit().await.map(Some)
        }
    }
}
