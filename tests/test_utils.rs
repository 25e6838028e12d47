//! Test utilities for emit-declaration integration tests
//!
//! `FakeBackend` stands in for `tsc`: it reads the generated project file and
//! writes one `<stem>.d.ts` per entry point into `declarationDir`, printing
//! the same `TSFILE:` listing and watch status lines the real compiler does.

#![allow(dead_code)]

use async_trait::async_trait;
use emit_declaration::compiler::{
    CompilerBackend, CompilerOutput, Invocation, TsCompiler, TsCompilerOptions, WatchLines,
};
use emit_declaration::plugin::{BuildOptions, EntryPoints};
use emit_declaration::reporter::MemoryReporter;
use emit_declaration::{EmitError, Result};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const WATCH_STARTING: &str = "10:00:00 AM - Starting compilation in watch mode...";
pub const WATCH_CHANGE: &str = "10:00:05 AM - File change detected. Starting incremental compilation...";
pub const WATCH_ENDED: &str = "10:00:01 AM - Found 0 errors. Watching for file changes.";

/// In-process stand-in for the TypeScript compiler
#[derive(Default)]
pub struct FakeBackend {
    runs: AtomicUsize,
    watch_spawns: AtomicUsize,
    exit_status: Option<i32>,
    abort_watch: bool,
    watch_sender: Mutex<Option<mpsc::Sender<String>>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every run exits with `status`
    pub fn exiting_with(status: i32) -> Self {
        Self {
            exit_status: Some(status),
            ..Self::default()
        }
    }

    /// Watch compiler that exits before finishing its initial pass
    pub fn aborting_watch() -> Self {
        Self {
            abort_watch: true,
            ..Self::default()
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn watch_spawns(&self) -> usize {
        self.watch_spawns.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Push one line of watch output to the running session
    pub async fn send(&self, line: impl Into<String>) {
        let sender = self.watch_sender.lock().unwrap().clone();
        sender
            .expect("no watch session running")
            .send(line.into())
            .await
            .expect("watch session closed");
    }

    /// Simulate a change pass that rewrites every entry point's declaration
    pub async fn change(&self, invocation: &Invocation) {
        self.send(WATCH_CHANGE).await;
        let lines = emit_project(&invocation.project_file, false).unwrap();
        for line in lines {
            self.send(line).await;
        }
        self.send(WATCH_ENDED).await;
    }

    /// End the watch session as if the compiler process exited
    pub fn close(&self) {
        self.watch_sender.lock().unwrap().take();
    }
}

#[async_trait]
impl CompilerBackend for FakeBackend {
    async fn run(&self, invocation: &Invocation) -> Result<CompilerOutput> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().unwrap().push(invocation.clone());

        if let Some(status) = self.exit_status {
            return Ok(CompilerOutput {
                status: Some(status),
                stdout: String::new(),
                stderr: "fake compiler failure".to_string(),
            });
        }

        let lines = emit_project(&invocation.project_file, true)?;
        Ok(CompilerOutput {
            status: Some(0),
            stdout: lines.join("\n"),
            stderr: String::new(),
        })
    }

    async fn spawn_watch(&self, invocation: &Invocation) -> Result<WatchLines> {
        self.watch_spawns.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().unwrap().push(invocation.clone());

        let (tx, rx) = mpsc::channel(64);
        let _ = tx.send(WATCH_STARTING.to_string()).await;
        if self.abort_watch {
            return Ok(rx);
        }

        for line in emit_project(&invocation.project_file, false)? {
            let _ = tx.send(line).await;
        }
        let _ = tx.send(WATCH_ENDED.to_string()).await;

        *self.watch_sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

/// Compile a generated project file: one declaration per root file.
///
/// With `tsBuildInfoFile` set and `use_build_info`, roots whose source is
/// unchanged since the last recorded run are skipped.
fn emit_project(project_file: &Path, use_build_info: bool) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(project_file)?;
    let project: Value = serde_json::from_str(&text).map_err(std::io::Error::other)?;
    let options = &project["compilerOptions"];
    let decl_dir = PathBuf::from(options["declarationDir"].as_str().unwrap_or("."));
    let build_info = build_info_path(project_file, options);

    let mut cache: Map<String, Value> = match &build_info {
        Some(path) if use_build_info && path.exists() => {
            serde_json::from_str(&std::fs::read_to_string(path)?).map_err(std::io::Error::other)?
        }
        _ => Map::new(),
    };

    std::fs::create_dir_all(&decl_dir).map_err(EmitError::emission(&decl_dir))?;
    let mut lines = Vec::new();
    for root in project["files"].as_array().into_iter().flatten() {
        let Some(root) = root.as_str() else { continue };
        let source = std::fs::read_to_string(root)?;
        if cache.get(root).and_then(Value::as_str) == Some(source.as_str()) {
            continue;
        }

        let stem = Path::new(root)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let out = decl_dir.join(format!("{stem}.d.ts"));
        std::fs::write(&out, declaration_for(&source))?;
        lines.push(format!("TSFILE: {}", out.display()));
        cache.insert(root.to_string(), Value::String(source));
    }

    if let Some(path) = build_info
        && !lines.is_empty()
    {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string(&cache).map_err(std::io::Error::other)?)?;
        lines.push(format!("TSFILE: {}", path.display()));
    }
    Ok(lines)
}

/// Where tsc writes its build-info file for `options`, if anywhere: the
/// explicit `tsBuildInfoFile`, else one named after the project file, in
/// `outDir` when set
fn build_info_path(project_file: &Path, options: &Value) -> Option<PathBuf> {
    if let Some(path) = options["tsBuildInfoFile"].as_str() {
        return Some(PathBuf::from(path));
    }
    let enabled = options["incremental"].as_bool().unwrap_or(false) || options["composite"].as_bool().unwrap_or(false);
    if !enabled {
        return None;
    }

    let name = project_file.with_extension("tsbuildinfo");
    let name = name.file_name()?;
    match options["outDir"].as_str() {
        Some(out_dir) => Some(Path::new(out_dir).join(name)),
        None => Some(project_file.with_file_name(name)),
    }
}

/// Build-info files anywhere under `root`
pub fn build_info_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).into_iter().flatten().flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "tsbuildinfo") {
                found.push(path);
            }
        }
    }
    found
}

fn declaration_for(source: &str) -> String {
    source
        .lines()
        .filter_map(|line| line.strip_prefix("export const "))
        .filter_map(|rest| rest.split_once(" = "))
        .map(|(name, _)| format!("export declare const {name}: unknown;\n"))
        .collect()
}

// ============================================================================
// Project fixtures
// ============================================================================

pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn write_json(root: &Path, relative: &str, value: &Value) -> PathBuf {
    write_file(root, relative, &serde_json::to_string_pretty(value).unwrap())
}

/// A project with a minimal `tsconfig.json` and `src/index.ts`
pub fn minimal_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "tsconfig.json",
        &json!({ "compilerOptions": { "strict": true, "module": "commonjs" } }),
    );
    write_file(dir.path(), "src/index.ts", "export const answer = 42;\n");
    dir
}

pub fn build_options(entries: &[&str]) -> BuildOptions {
    BuildOptions {
        entry_points: Some(EntryPoints::List(entries.iter().map(|e| e.to_string()).collect())),
        ..Default::default()
    }
}

pub fn compiler_options(root: &Path, incremental: bool) -> TsCompilerOptions {
    TsCompilerOptions {
        cwd: root.to_path_buf(),
        out_dir: PathBuf::from("dist"),
        ts_config: "tsconfig.json".to_string(),
        incremental,
    }
}

pub struct TestCompiler {
    pub compiler: TsCompiler,
    pub backend: Arc<FakeBackend>,
    pub reporter: Arc<MemoryReporter>,
}

pub fn test_compiler(root: &Path, entries: &[&str], incremental: bool) -> TestCompiler {
    with_backend(root, entries, incremental, FakeBackend::new())
}

pub fn with_backend(root: &Path, entries: &[&str], incremental: bool, backend: FakeBackend) -> TestCompiler {
    let backend = Arc::new(backend);
    let reporter = Arc::new(MemoryReporter::new());
    let compiler = TsCompiler::new(
        &build_options(entries),
        compiler_options(root, incremental),
        backend.clone(),
        reporter.clone(),
    )
    .unwrap();

    TestCompiler {
        compiler,
        backend,
        reporter,
    }
}

/// Declaration files currently in `dir`, sorted
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
