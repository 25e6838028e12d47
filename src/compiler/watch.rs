// src/compiler/watch.rs
// Interceptors translating watch compiler output into lifecycle events

use super::settings::CompilerSettings;
use super::status::{self, OutputLine, WatchDiagnostic, WatchPhase};
use crate::reporter::{ReportEvent, Reporter, WatchStatusEvent};
use crate::utils::{absolutize, relative_to};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Emit and status interceptors for one watch session.
///
/// Shares the orchestrator's watching flag instead of keeping its own, so the
/// orchestrator decides when the initial pass is over.
#[derive(Clone)]
pub struct WatchInterceptor {
    watching: Arc<AtomicBool>,
    reporter: Arc<dyn Reporter>,
    settings: CompilerSettings,
    cwd: PathBuf,
}

impl WatchInterceptor {
    pub fn new(
        watching: Arc<AtomicBool>,
        reporter: Arc<dyn Reporter>,
        settings: CompilerSettings,
        cwd: PathBuf,
    ) -> Self {
        Self {
            watching,
            reporter,
            settings,
            cwd,
        }
    }

    fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    /// Feed one line of compiler output; returns the status signal it
    /// produced, if any.
    pub fn handle(&self, line: &str) -> Option<WatchStatusEvent> {
        match status::classify(line) {
            OutputLine::Emitted(path) => {
                self.on_emit(&path);
                None
            }
            OutputLine::Status(diagnostic) => self.on_status(diagnostic),
            OutputLine::Other => {
                if status::is_diagnostic(line) {
                    debug!(diagnostic = %line.trim_end(), "Watch compiler diagnostic");
                }
                None
            }
        }
    }

    /// Emit interceptor: report a rewritten declaration once watching
    pub fn on_emit(&self, path: &Path) {
        if !self.is_watching() {
            return;
        }
        let path = absolutize(&self.cwd, path);
        if self.settings.is_build_info(&path) {
            return;
        }

        let relative = relative_to(&path, self.settings.out_dir());
        self.reporter.report(&ReportEvent::WatchEmitted { path: relative });
    }

    /// Status interceptor: report the signal the transition table maps
    /// `diagnostic` to in the current phase
    pub fn on_status(&self, diagnostic: WatchDiagnostic) -> Option<WatchStatusEvent> {
        let phase = WatchPhase::from_watching(self.is_watching());
        let signal = status::transition(diagnostic, phase);
        match signal {
            Some(signal) => self.reporter.report(&ReportEvent::WatchStatus(signal)),
            None => debug!(code = diagnostic.code(), ?phase, "Discarding watch status"),
        }
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::reporter::MemoryReporter;

    fn interceptor(incremental: bool) -> (WatchInterceptor, Arc<MemoryReporter>, Arc<AtomicBool>) {
        let reporter = Arc::new(MemoryReporter::new());
        let watching = Arc::new(AtomicBool::new(false));
        let settings = CompilerSettings::adapt(CompilerOptions::default(), Path::new("/p/dist"), incremental);
        let interceptor = WatchInterceptor::new(watching.clone(), reporter.clone(), settings, PathBuf::from("/p"));
        (interceptor, reporter, watching)
    }

    #[test]
    fn test_initial_pass_signals_once() {
        let (interceptor, reporter, watching) = interceptor(false);

        assert_eq!(interceptor.handle("10:00:00 AM - Starting compilation in watch mode..."), None);
        assert_eq!(interceptor.handle("TSFILE: /p/dist/index.d.ts"), None);
        assert_eq!(
            interceptor.handle("10:00:01 AM - Found 0 errors. Watching for file changes."),
            Some(WatchStatusEvent::InitialEmitCompleted)
        );
        watching.store(true, Ordering::SeqCst);

        // Initial-pass writes are not reported individually
        assert!(reporter.events().iter().all(|e| !matches!(e, ReportEvent::WatchEmitted { .. })));
        assert_eq!(reporter.watch_statuses(), vec![WatchStatusEvent::InitialEmitCompleted]);
    }

    #[test]
    fn test_change_pass_reports_files() {
        let (interceptor, reporter, watching) = interceptor(true);
        watching.store(true, Ordering::SeqCst);

        interceptor.handle("10:00:05 AM - File change detected. Starting incremental compilation...");
        interceptor.handle("TSFILE: /p/dist/lib/util.d.ts");
        interceptor.handle("TSFILE: /p/dist/tsconfig.tsbuildinfo");
        interceptor.handle("10:00:06 AM - Found 0 errors. Watching for file changes.");

        assert_eq!(
            reporter.events(),
            vec![
                ReportEvent::WatchStatus(WatchStatusEvent::ChangeDetected),
                ReportEvent::WatchEmitted {
                    path: PathBuf::from("lib/util.d.ts")
                },
            ]
        );
    }

    #[test]
    fn test_change_before_watching_discarded() {
        let (interceptor, reporter, _watching) = interceptor(false);
        assert_eq!(interceptor.on_status(WatchDiagnostic::ChangeDetected), None);
        assert!(reporter.events().is_empty());
    }
}
