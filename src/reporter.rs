// src/reporter.rs
// Lifecycle event reporters for declaration emission

use crate::utils::human_file_size;
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// One declaration artifact written by an emit pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitEvent {
    /// Absolute path of the emitted file
    pub path: PathBuf,
    /// Path relative to the output directory
    pub relative: PathBuf,
    /// On-disk size in bytes
    pub size: u64,
}

/// The two watch transitions visible to reporters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatusEvent {
    /// Initial declaration pass finished, compiler now idles on file changes
    InitialEmitCompleted,
    /// A source change was detected and a new emit pass started
    ChangeDetected,
}

impl WatchStatusEvent {
    pub fn message(&self) -> &'static str {
        match self {
            WatchStatusEvent::InitialEmitCompleted => "declaration files emitted, watching for changes...",
            WatchStatusEvent::ChangeDetected => "emit declaration started",
        }
    }
}

/// Everything the orchestrator reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    EmitStarted,
    FileEmitted(EmitEvent),
    Done { elapsed: Duration },
    WatchStatus(WatchStatusEvent),
    /// A file rewritten during a watch pass, relative to the output directory
    WatchEmitted { path: PathBuf },
}

/// Trait for lifecycle reporters.
///
/// Watch events arrive from a background task, hence `Send + Sync`.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &ReportEvent);
}

/// Renders events to stdout
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    out_dir_label: String,
}

impl ConsoleReporter {
    /// `out_dir` is printed in front of every emitted file, as configured
    pub fn new(out_dir: &Path) -> Self {
        Self {
            out_dir_label: out_dir.display().to_string(),
        }
    }

    /// Render an event as the line(s) printed for it
    pub fn render(&self, event: &ReportEvent) -> String {
        match event {
            ReportEvent::EmitStarted => "\nEmitting declaration files ...\n".to_string(),
            ReportEvent::FileEmitted(emitted) => format!(
                "  {}/{}  {}",
                style(&self.out_dir_label).white().bold(),
                style(emitted.relative.display()).bold(),
                style(human_file_size(emitted.size)).cyan()
            ),
            ReportEvent::Done { elapsed } => {
                format!("\n⚡ {}", style(format!("Done in {}ms", elapsed.as_millis())).green())
            }
            ReportEvent::WatchStatus(status) => {
                style(format!("[watch] {}", status.message())).white().to_string()
            }
            ReportEvent::WatchEmitted { path } => style(format!(
                "[watch] emit declaration finished (change: \"{}/{}\")",
                self.out_dir_label,
                path.display()
            ))
            .white()
            .to_string(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &ReportEvent) {
        println!("{}", self.render(event));
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Emitted-file events only
    pub fn emitted(&self) -> Vec<EmitEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::FileEmitted(emitted) => Some(emitted),
                _ => None,
            })
            .collect()
    }

    /// Watch status transitions only
    pub fn watch_statuses(&self) -> Vec<WatchStatusEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::WatchStatus(status) => Some(status),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&self, _event: &ReportEvent) {}
}
