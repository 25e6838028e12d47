// src/compiler/settings.rs
// Compiler options adapted for declaration-only output

use super::program::ProgramKind;
use crate::config::{CompilerOptions, OptionValue};
use std::path::{Path, PathBuf};

/// Name of the incremental cache written into the output directory
pub const BUILD_INFO_FILE_NAME: &str = "tsconfig.tsbuildinfo";

/// Compiler options forced into declaration-only emit.
///
/// Built once per orchestrator and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerSettings {
    options: CompilerOptions,
    out_dir: PathBuf,
    build_info_file: Option<PathBuf>,
}

impl CompilerSettings {
    /// Apply the declaration-only overrides on top of the project's options.
    ///
    /// `out_dir` must already be absolute.
    pub fn adapt(mut options: CompilerOptions, out_dir: &Path, incremental: bool) -> Self {
        // enable emitting declaration
        options.set("declaration", OptionValue::Bool(true));
        options.set("emitDeclarationOnly", OptionValue::Bool(true));
        options.set("declarationDir", OptionValue::Path(out_dir.to_path_buf()));
        options.remove("noEmit");

        // enable listing emitted files for diagnostics
        options.set("listEmittedFiles", OptionValue::Bool(true));
        options.remove("locale");

        // the generated project has no references; composite would also
        // forbid turning incremental off below
        options.remove("composite");

        let build_info_file = if incremental {
            let path = out_dir.join(BUILD_INFO_FILE_NAME);
            options.set("incremental", OptionValue::Bool(true));
            options.set("tsBuildInfoFile", OptionValue::Path(path.clone()));
            Some(path)
        } else {
            // otherwise tsc names a build-info file after the generated project
            options.set("incremental", OptionValue::Bool(false));
            options.remove("tsBuildInfoFile");
            None
        };

        Self {
            options,
            out_dir: out_dir.to_path_buf(),
            build_info_file,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn is_incremental(&self) -> bool {
        self.build_info_file.is_some()
    }

    pub fn build_info_file(&self) -> Option<&Path> {
        self.build_info_file.as_deref()
    }

    /// True when `path` is the incremental cache rather than a declaration
    pub fn is_build_info(&self, path: &Path) -> bool {
        self.build_info_file.as_deref() == Some(path)
            || path
                .extension()
                .is_some_and(|ext| ext == "tsbuildinfo")
    }

    /// Program used by `emit()`
    pub fn batch_program(&self) -> ProgramKind {
        match &self.build_info_file {
            Some(path) => ProgramKind::Incremental {
                build_info_file: path.clone(),
            },
            None => ProgramKind::OneShot,
        }
    }

    /// Program used by `watch()`
    pub fn watch_program(&self) -> ProgramKind {
        ProgramKind::Watch {
            build_info_file: self.build_info_file.clone(),
        }
    }
}
