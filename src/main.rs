// src/main.rs
// emit-declaration - emit TypeScript declarations for a set of entry points

use anyhow::{Context, Result};
use clap::Parser;
use emit_declaration::compiler::TscBackend;
use emit_declaration::plugin::{
    BuildOptions, BuildResult, EmitDeclarationOptions, EmitDeclarationPlugin, EntryPoints, WatchSetting,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "emit-declaration")]
#[command(about = "Emit TypeScript declaration files alongside a bundle")]
#[command(version)]
struct Cli {
    /// Entry points, relative to --cwd
    entries: Vec<String>,

    /// Project directory (default: current directory)
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Output directory for declaration files
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Project configuration file name
    #[arg(short, long)]
    ts_config: Option<String>,

    /// Keep a build-info file in the output directory between runs
    #[arg(long)]
    incremental: bool,

    /// Keep running and re-emit on source changes
    #[arg(short, long)]
    watch: bool,

    /// TypeScript compiler executable (default: nearest node_modules/.bin/tsc)
    #[arg(long, env = "EMIT_DECLARATION_TSC")]
    tsc: Option<PathBuf>,

    /// Host build options as JSON (entryPoints, outdir, watch)
    #[arg(long)]
    build_config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn build_options(&self) -> Result<BuildOptions> {
        let mut build = match &self.build_config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("invalid build options in {}", path.display()))?
            }
            None => BuildOptions::default(),
        };

        if !self.entries.is_empty() {
            build.entry_points = Some(EntryPoints::List(self.entries.clone()));
        }
        if self.watch {
            build.watch = Some(WatchSetting::Enabled(true));
        }
        Ok(build)
    }

    fn plugin_options(&self) -> EmitDeclarationOptions {
        EmitDeclarationOptions {
            cwd: self.cwd.clone(),
            out_dir: self.out_dir.clone(),
            ts_config: self.ts_config.clone(),
            incremental: self.incremental,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let build = cli.build_options()?;
    let mut plugin = EmitDeclarationPlugin::new(cli.plugin_options());
    if let Some(tsc) = &cli.tsc {
        plugin = plugin.with_backend(Arc::new(TscBackend::new(tsc)));
    }

    let hooks = plugin.setup(&build)?;
    // The bundle itself is someone else's job; treat it as built cleanly
    hooks.on_end(&BuildResult::default()).await?;

    if hooks.is_watch_mode() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping watch compiler"),
            _ = hooks.compiler().wait_watch() => info!("Watch compiler exited"),
        }
    }

    Ok(())
}
