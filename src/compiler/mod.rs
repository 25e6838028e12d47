// src/compiler/mod.rs
// Declaration emit orchestrator over one-shot, incremental and watch compilation

pub mod backend;
pub mod program;
pub mod settings;
pub mod status;
pub mod watch;

pub use backend::{CompilerBackend, CompilerOutput, TscBackend, WatchLines};
pub use program::{Invocation, Program, ProgramKind};
pub use settings::{BUILD_INFO_FILE_NAME, CompilerSettings};
pub use watch::WatchInterceptor;

use crate::config::{self, ProjectConfig};
use crate::error::{EmitError, Result};
use crate::plugin::BuildOptions;
use crate::reporter::{EmitEvent, ReportEvent, Reporter};
use crate::utils::{absolutize, relative_to, with_execution_time};
use status::WatchDiagnostic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Resolved plugin options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsCompilerOptions {
    pub cwd: PathBuf,
    /// Output directory as configured; relative paths resolve against `cwd`
    pub out_dir: PathBuf,
    pub ts_config: String,
    pub incremental: bool,
}

/// What one `emit()` call produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub files: Vec<EmitEvent>,
    pub elapsed: Duration,
}

/// Emits declaration files for a build's entry points.
///
/// Constructed once per build configuration. `emit()` runs a fresh one-shot
/// or incremental program per call; `watch()` starts a single persistent
/// watch program. Once watching, the compiler stays in watch mode.
pub struct TsCompiler {
    options: TsCompilerOptions,
    entry_points: Vec<PathBuf>,
    config: ProjectConfig,
    settings: CompilerSettings,
    backend: Arc<dyn CompilerBackend>,
    reporter: Arc<dyn Reporter>,
    watching: Arc<AtomicBool>,
    watch_session: Mutex<Option<JoinHandle<()>>>,
}

impl TsCompiler {
    /// Resolve the project configuration and derive declaration-only
    /// settings. No compiler program is created yet.
    pub fn new(
        build: &BuildOptions,
        options: TsCompilerOptions,
        backend: Arc<dyn CompilerBackend>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let config = config::resolve(&options.ts_config, &options.cwd)?;
        let compiler_options = config::process(&config, &options.ts_config, &options.cwd)?;

        let out_dir = absolutize(&options.cwd, build.outdir.as_deref().unwrap_or(options.out_dir.as_path()));
        let settings = CompilerSettings::adapt(compiler_options, &out_dir, options.incremental);
        let entry_points = build.entry_point_paths(&options.cwd);

        info!(
            config = %options.ts_config,
            out_dir = %out_dir.display(),
            entry_points = entry_points.len(),
            incremental = options.incremental,
            "Declaration emitter ready"
        );

        Ok(Self {
            options,
            entry_points,
            config,
            settings,
            backend,
            reporter,
            watching: Arc::new(AtomicBool::new(false)),
            watch_session: Mutex::new(None),
        })
    }

    pub fn options(&self) -> &TsCompilerOptions {
        &self.options
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn entry_points(&self) -> &[PathBuf] {
        &self.entry_points
    }

    pub fn out_dir(&self) -> &Path {
        self.settings.out_dir()
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    /// Emit declarations once and report every file written.
    pub async fn emit(&self) -> Result<EmitSummary> {
        if self.is_watching() {
            return Err(EmitError::AlreadyWatching);
        }

        self.reporter.report(&ReportEvent::EmitStarted);

        let (output, elapsed) = with_execution_time(self.run_batch()).await;
        let files = self.collect_emitted(&output?).await?;

        for file in &files {
            self.reporter.report(&ReportEvent::FileEmitted(file.clone()));
        }
        self.reporter.report(&ReportEvent::Done { elapsed });

        info!(
            files = files.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Declaration files emitted"
        );
        Ok(EmitSummary { files, elapsed })
    }

    /// Start the watch compiler; a no-op when already watching.
    ///
    /// Returns after the initial declaration pass. Later passes run on a
    /// background task for as long as the compiler process lives.
    pub async fn watch(&self) -> Result<()> {
        let mut session = self.watch_session.lock().await;
        if self.is_watching() {
            debug!("Watch session already running");
            return Ok(());
        }

        let interceptor = WatchInterceptor::new(
            self.watching.clone(),
            self.reporter.clone(),
            self.settings.clone(),
            self.options.cwd.clone(),
        );

        if self.entry_points.is_empty() {
            debug!("No entry points, nothing to watch");
            interceptor.on_status(WatchDiagnostic::CompilationEnded);
            self.watching.store(true, Ordering::SeqCst);
            return Ok(());
        }

        let program = Program::create(
            self.settings.watch_program(),
            &self.settings,
            &self.entry_points,
            &self.options.cwd,
        )?;
        let mut lines = self.backend.spawn_watch(&program.invocation()).await?;

        loop {
            let Some(line) = lines.recv().await else {
                return Err(EmitError::WatchAborted);
            };
            if interceptor.handle(&line).is_some() {
                break;
            }
        }
        self.watching.store(true, Ordering::SeqCst);
        info!(out_dir = %self.out_dir().display(), "Watching for changes");

        let handle = tokio::spawn(async move {
            // Keeps the generated project file alive for the compiler
            let _program = program;
            while let Some(line) = lines.recv().await {
                interceptor.handle(&line);
            }
            debug!("Watch session ended");
        });
        *session = Some(handle);

        Ok(())
    }

    /// Wait until the watch compiler exits. Returns immediately when no
    /// watch session is running.
    pub async fn wait_watch(&self) {
        let handle = self.watch_session.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Watch session task failed");
        }
    }

    async fn run_batch(&self) -> Result<CompilerOutput> {
        if self.entry_points.is_empty() {
            debug!("No entry points, skipping compiler run");
            return Ok(CompilerOutput {
                status: Some(0),
                ..Default::default()
            });
        }

        let program = Program::create(
            self.settings.batch_program(),
            &self.settings,
            &self.entry_points,
            &self.options.cwd,
        )?;
        debug!(kind = program.kind().name(), "Running declaration program");
        let output = self.backend.run(&program.invocation()).await?;

        for line in output.stdout.lines().filter(|line| status::is_diagnostic(line)) {
            debug!(diagnostic = %line, "Compiler diagnostic");
        }

        if !output.completed() {
            let status = output
                .status
                .map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}"));
            return Err(EmitError::CompilerFailed {
                status,
                output: format!("{}{}", output.stdout, output.stderr),
            });
        }

        Ok(output)
    }

    async fn collect_emitted(&self, output: &CompilerOutput) -> Result<Vec<EmitEvent>> {
        let mut files = Vec::new();
        for path in status::emitted_files(&output.stdout) {
            let path = absolutize(&self.options.cwd, &path);
            if self.settings.is_build_info(&path) {
                continue;
            }

            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(EmitError::emission(&path))?;
            files.push(EmitEvent {
                relative: relative_to(&path, self.out_dir()),
                size: metadata.len(),
                path,
            });
        }
        Ok(files)
    }
}
