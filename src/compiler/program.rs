// src/compiler/program.rs
// Compiler program kinds and the generated project file they run against

use super::settings::CompilerSettings;
use crate::error::{EmitError, Result};
use serde_json::json;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const PROJECT_FILE_PREFIX: &str = ".tsconfig.declarations.";

/// The three ways the compiler can be driven
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramKind {
    /// Full analysis on every run
    OneShot,
    /// Reuses and updates a persisted build-info file across runs
    Incremental { build_info_file: PathBuf },
    /// Long-lived process that re-emits on source changes
    Watch { build_info_file: Option<PathBuf> },
}

impl ProgramKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProgramKind::OneShot => "one-shot",
            ProgramKind::Incremental { .. } => "incremental",
            ProgramKind::Watch { .. } => "watch",
        }
    }

    pub fn is_watch(&self) -> bool {
        matches!(self, ProgramKind::Watch { .. })
    }

    /// Extra command-line flags this kind needs
    pub fn compiler_args(&self) -> &'static [&'static str] {
        match self {
            ProgramKind::OneShot | ProgramKind::Incremental { .. } => &[],
            ProgramKind::Watch { .. } => &["--watch", "--preserveWatchOutput"],
        }
    }
}

/// Everything a backend needs to start the compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub cwd: PathBuf,
    pub project_file: PathBuf,
    pub kind: ProgramKind,
}

impl Invocation {
    /// Command-line arguments for the compiler executable
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--project".into(),
            self.project_file.clone().into_os_string(),
            "--pretty".into(),
            "false".into(),
        ];
        args.extend(self.kind.compiler_args().iter().map(OsString::from));
        args
    }
}

/// A compiler program scoped to a set of entry points.
///
/// Owns the generated project file; it is deleted when the program is dropped,
/// so a watch program must outlive its compiler process.
#[derive(Debug)]
pub struct Program {
    kind: ProgramKind,
    cwd: PathBuf,
    project_file: NamedTempFile,
}

impl Program {
    /// Write a project file holding `settings` and `entry_points` into `cwd`.
    ///
    /// The file sits next to the user's own configuration so that type roots
    /// and `paths` keep resolving from the same place.
    pub fn create(
        kind: ProgramKind,
        settings: &CompilerSettings,
        entry_points: &[PathBuf],
        cwd: &Path,
    ) -> Result<Self> {
        let files: Vec<String> = entry_points
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let project = json!({
            "compilerOptions": settings.options().to_json(),
            "files": files,
        });

        let mut project_file = tempfile::Builder::new()
            .prefix(PROJECT_FILE_PREFIX)
            .suffix(".json")
            .tempfile_in(cwd)
            .map_err(EmitError::emission(cwd))?;
        let path = project_file.path().to_path_buf();
        serde_json::to_writer_pretty(project_file.as_file_mut(), &project)
            .map_err(|e| EmitError::emission(&path)(e.into()))?;
        project_file.flush().map_err(EmitError::emission(&path))?;

        debug!(
            kind = kind.name(),
            project_file = %path.display(),
            roots = entry_points.len(),
            "Created compiler program"
        );

        Ok(Self {
            kind,
            cwd: cwd.to_path_buf(),
            project_file,
        })
    }

    pub fn kind(&self) -> &ProgramKind {
        &self.kind
    }

    pub fn project_file(&self) -> &Path {
        self.project_file.path()
    }

    pub fn invocation(&self) -> Invocation {
        Invocation {
            cwd: self.cwd.clone(),
            project_file: self.project_file().to_path_buf(),
            kind: self.kind.clone(),
        }
    }
}
