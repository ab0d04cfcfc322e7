//! Dataset enhancement driver.
//!
//! Walks an input tree, runs an [`Enhancer`] over every recognised image on
//! a bounded worker pool and mirrors the relative layout under the output
//! root. Per-image failures are logged and counted; only an output root that
//! cannot be created aborts the batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub use lowlight_core::{EnhanceError, EnhanceResult, Enhancer, Image};

/// Lower-case extensions the driver picks up
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "ppm"];

/// Cooperative cancellation shared between the caller and the workers.
///
/// Once stopped, no new image is dispatched; images already in flight
/// finish and are counted normally.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub workers: usize,
    pub stop: StopSignal,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            workers: lowlight_core::default_worker_count(),
            stop: StopSignal::default(),
        }
    }
}

impl DriverOptions {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedImage {
    pub path: PathBuf,
    pub kind: &'static str,
    pub reason: String,
}

/// Outcome of one batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetReport {
    pub enhancer: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub discovered: usize,
    /// succeeded + failed
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Never dispatched because of a stop request
    pub skipped: usize,
    pub failures: Vec<FailedImage>,
    pub elapsed_ms: u64,
}

impl DatasetReport {
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{}: {} processed ({} succeeded, {} failed, {} skipped) in {:.2}s",
            self.enhancer,
            self.processed,
            self.succeeded,
            self.failed,
            self.skipped,
            self.elapsed_ms as f64 / 1000.0
        );
        for failure in &self.failures {
            text.push_str(&format!("\n  {}: {}", failure.path.display(), failure.reason));
        }
        text
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Case-insensitive extension check
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Recognised image files under `root`, recursively, in sorted order
pub fn collect_images(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_supported_image(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Read, enhance and write one image. Parent directories of `output` are
/// created as needed; the format follows the output extension.
pub fn enhance_file(input: &Path, output: &Path, enhancer: &dyn Enhancer) -> EnhanceResult<()> {
    let image = image::open(input)
        .map_err(|e| EnhanceError::unreadable(input, e))?
        .to_rgb8();

    let enhanced = enhancer.enhance(&image)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EnhanceError::write(parent, e))?;
    }
    enhanced.save(output).map_err(|e| EnhanceError::write(output, e))?;
    Ok(())
}

/// Enhance every recognised image under `input_dir` into `output_dir`
pub fn enhance_dataset(
    input_dir: &Path,
    output_dir: &Path,
    enhancer: &dyn Enhancer,
    options: &DriverOptions,
) -> EnhanceResult<DatasetReport> {
    let start = Instant::now();

    if !input_dir.is_dir() {
        return Err(EnhanceError::BatchIOFailure {
            path: input_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "input directory not found"),
        });
    }
    std::fs::create_dir_all(output_dir).map_err(|source| EnhanceError::BatchIOFailure {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let files = collect_images(input_dir);
    info!(
        enhancer = enhancer.name(),
        images = files.len(),
        workers = options.workers,
        input = %input_dir.display(),
        output = %output_dir.display(),
        "starting batch"
    );

    let pool = lowlight_core::build_worker_pool(options.workers).map_err(|e| {
        EnhanceError::BatchIOFailure {
            path: output_dir.to_path_buf(),
            source: std::io::Error::other(e),
        }
    })?;

    let succeeded = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);
    let failures = Mutex::new(Vec::new());

    pool.install(|| {
        files.par_iter().for_each(|path| {
            if options.stop.is_stopped() {
                skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }

            // Every collected path lives under input_dir
            let relative = path.strip_prefix(input_dir).unwrap_or(path);
            let target = output_dir.join(relative);

            match enhance_file(path, &target, enhancer) {
                Ok(()) => {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                    debug!(path = %path.display(), "enhanced");
                }
                Err(err) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    warn!(path = %path.display(), error = %err, "failed to enhance image");
                    failures.lock().push(FailedImage {
                        path: path.clone(),
                        kind: err.kind(),
                        reason: err.to_string(),
                    });
                }
            }
        });
    });

    let mut failures = failures.into_inner();
    failures.sort_by(|a, b| a.path.cmp(&b.path));

    let succeeded = succeeded.into_inner();
    let failed = failed.into_inner();
    let report = DatasetReport {
        enhancer: enhancer.name().to_string(),
        input_dir: input_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        discovered: files.len(),
        processed: succeeded + failed,
        succeeded,
        failed,
        skipped: skipped.into_inner(),
        failures,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        elapsed_ms = report.elapsed_ms,
        "batch finished"
    );
    Ok(report)
}
