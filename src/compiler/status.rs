// src/compiler/status.rs
// Compiler output line classification and watch status translation

use crate::reporter::WatchStatusEvent;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Prefix `--listEmittedFiles` puts in front of every written file
pub const EMITTED_FILE_PREFIX: &str = "TSFILE: ";

/// Watch-mode status diagnostics the compiler prints, by diagnostic code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum WatchDiagnostic {
    StartingCompilation = 6031,
    ChangeDetected = 6032,
    CompilationEndedWithError = 6193,
    CompilationEnded = 6194,
}

impl WatchDiagnostic {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Whether the orchestrator had already entered its watching state when a
/// status arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Initial,
    Watching,
}

impl WatchPhase {
    pub fn from_watching(watching: bool) -> Self {
        if watching {
            WatchPhase::Watching
        } else {
            WatchPhase::Initial
        }
    }
}

/// Message text → diagnostic code. Timestamps precede the text, so patterns
/// are anchored at the end only.
static STATUS_MESSAGES: LazyLock<Vec<(Regex, WatchDiagnostic)>> = LazyLock::new(|| {
    [
        (r"Starting compilation in watch mode\.\.\.$", WatchDiagnostic::StartingCompilation),
        (
            r"File change detected\. Starting incremental compilation\.\.\.$",
            WatchDiagnostic::ChangeDetected,
        ),
        (
            r"Found 1 error\. Watching for file changes\.$",
            WatchDiagnostic::CompilationEndedWithError,
        ),
        (
            r"Found \d+ errors\. Watching for file changes\.$",
            WatchDiagnostic::CompilationEnded,
        ),
    ]
    .into_iter()
    .map(|(pattern, diagnostic)| (Regex::new(pattern).expect("status pattern is valid"), diagnostic))
    .collect()
});

/// (diagnostic, phase it must arrive in) → the signal reported for it.
/// Every combination not listed is discarded.
pub const STATUS_TRANSITIONS: &[(WatchDiagnostic, WatchPhase, WatchStatusEvent)] = &[
    (
        WatchDiagnostic::CompilationEnded,
        WatchPhase::Initial,
        WatchStatusEvent::InitialEmitCompleted,
    ),
    (
        WatchDiagnostic::CompilationEndedWithError,
        WatchPhase::Initial,
        WatchStatusEvent::InitialEmitCompleted,
    ),
    (
        WatchDiagnostic::ChangeDetected,
        WatchPhase::Watching,
        WatchStatusEvent::ChangeDetected,
    ),
];

/// One line of compiler output, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    /// A file written by the compiler
    Emitted(PathBuf),
    /// A recognized watch status
    Status(WatchDiagnostic),
    /// Diagnostics and anything else
    Other,
}

/// Classify one line of compiler output
pub fn classify(line: &str) -> OutputLine {
    let line = line.trim_end();
    if let Some(path) = emitted_file(line) {
        return OutputLine::Emitted(path);
    }
    STATUS_MESSAGES
        .iter()
        .find(|(pattern, _)| pattern.is_match(line))
        .map_or(OutputLine::Other, |(_, diagnostic)| OutputLine::Status(*diagnostic))
}

/// Path named by a `TSFILE:` line
pub fn emitted_file(line: &str) -> Option<PathBuf> {
    line.strip_prefix(EMITTED_FILE_PREFIX)
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Every emitted file listed in a complete compiler output, in order
pub fn emitted_files(output: &str) -> Vec<PathBuf> {
    output.lines().filter_map(|line| emitted_file(line.trim_end())).collect()
}

/// Signal to report for `diagnostic` arriving in `phase`, if any
pub fn transition(diagnostic: WatchDiagnostic, phase: WatchPhase) -> Option<WatchStatusEvent> {
    STATUS_TRANSITIONS
        .iter()
        .find(|(d, p, _)| *d == diagnostic && *p == phase)
        .map(|(_, _, signal)| *signal)
}

/// True for compiler diagnostic lines such as `src/a.ts(1,7): error TS2322: ...`
pub fn is_diagnostic(line: &str) -> bool {
    line.contains(" error TS") || line.starts_with("error TS")
}
