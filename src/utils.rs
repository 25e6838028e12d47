//! src/utils.rs
//! Shared utility functions used across the codebase

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const SIZE_UNITS: &[&str] = &["b", "kb", "mb", "gb", "tb"];

/// Format a byte count the way build output usually shows it: `0b`, `512b`,
/// `1.5kb`, rounded to two decimals.
pub fn human_file_size(size: u64) -> String {
    if size == 0 {
        return "0b".to_string();
    }

    let exponent = ((63 - size.leading_zeros()) / 10) as usize;
    let exponent = exponent.min(SIZE_UNITS.len() - 1);
    let scaled = size as f64 / 1024f64.powi(exponent as i32);
    let rounded = (scaled * 100.0).round() / 100.0;

    format!("{}{}", rounded, SIZE_UNITS[exponent])
}

/// Run `f` and return its result with the wall-clock time it took.
pub async fn with_execution_time<T, F>(f: F) -> (T, Duration)
where
    F: std::future::Future<Output = T>,
{
    let started = Instant::now();
    let result = f.await;
    (result, started.elapsed())
}

/// `path` relative to `base` when it lives under it, otherwise `path` itself.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Join `path` onto `base` unless it is already absolute.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
