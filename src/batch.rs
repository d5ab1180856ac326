//! Batch optimization of files on disk.
//!
//! Takes a list of files and directories, finds every decodable image,
//! and runs each through its own [`Session`] with the same settings. Every
//! file produces a primary output plus any alternate formats, written
//! side by side into one output directory.
//!
//! ## Output Structure
//!
//! ```text
//! optimized/
//! ├── dawn-optimized.jpg        # primary format
//! ├── dawn-optimized.webp       # alternates (output.also)
//! ├── dusk-optimized.jpg
//! ├── dusk-2-optimized.jpg      # second "dusk" from another directory
//! └── report.json               # optional, --report
//! ```
//!
//! ## Parallel Processing
//!
//! Files are processed in parallel using [rayon](https://docs.rs/rayon).
//! Each file gets its own session, so workers share nothing but the
//! backend. Progress is reported through an optional channel as each file
//! finishes. A file that fails is recorded in the report and the rest of
//! the batch continues.

use crate::imaging::{
    ImageBackend, OptimizeError, OptimizeRequest, OutputFormat, Probe, supported_input_extensions,
};
use crate::naming::{OPTIMIZED_SUFFIX, file_stem, sanitize_stem};
use crate::session::Session;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Optimize(#[from] OptimizeError),
    #[error("No supported images found in the given inputs")]
    NoInputs,
}

/// Progress event emitted as files are processed.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Inputs collected; processing begins.
    Started { file_count: usize },
    /// A file was optimized and its outputs written.
    FileOptimized {
        /// 1-based position in the input list.
        index: usize,
        summary: FileSummary,
    },
    FileFailed {
        index: usize,
        source: String,
        error: String,
    },
}

/// One written output file.
#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub file_name: String,
    pub format: OutputFormat,
    pub size: u64,
}

/// What happened to one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub source: String,
    pub original_size: u64,
    pub source_dimensions: (u32, u32),
    pub output_dimensions: (u32, u32),
    /// Quality (1-100) the primary output was encoded at.
    pub quality: u8,
    /// Requested byte budget, when target-size mode is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_size: Option<u64>,
    pub achieved: bool,
    pub probes: Vec<Probe>,
    /// Primary output first, then alternates in request order.
    pub outputs: Vec<OutputSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<OutputFormat>,
}

impl FileSummary {
    pub fn primary(&self) -> Option<&OutputSummary> {
        self.outputs.first()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub source: String,
    pub error: String,
}

/// Results of a batch run, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileSummary>,
    pub failures: Vec<FailedFile>,
}

impl BatchReport {
    pub fn total_original(&self) -> u64 {
        self.files.iter().map(|f| f.original_size).sum()
    }

    /// Sum of primary output sizes.
    pub fn total_optimized(&self) -> u64 {
        self.files
            .iter()
            .filter_map(|f| f.primary().map(|o| o.size))
            .sum()
    }

    pub fn targets_missed(&self) -> usize {
        self.files.iter().filter(|f| !f.achieved).count()
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| supported_input_extensions().contains(&ext.as_str()))
}

fn is_previous_output(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|s| s.to_string_lossy().ends_with(OPTIMIZED_SUFFIX))
}

/// Expand `inputs` into the list of image files to process.
///
/// Files named directly are kept as given. Directories are walked
/// recursively and filtered to decodable extensions, skipping files that
/// are themselves `-optimized` outputs. Results are sorted per directory
/// and deduplicated.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| has_supported_extension(p) && !is_previous_output(p))
                .collect();
            found.sort();
            files.extend(found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            return Err(BatchError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input not found: {}", input.display()),
            )));
        }
    }

    let mut seen = HashSet::new();
    files.retain(|p| seen.insert(p.clone()));
    if files.is_empty() {
        return Err(BatchError::NoInputs);
    }
    Ok(files)
}

/// Names to load each input under, unique by output stem.
///
/// Two inputs that would produce the same `<stem>-optimized` name get
/// numbered: the second `dusk.png` becomes `dusk-3.png` when another input
/// is already called `dusk-2.png`. A generated stem never matches any
/// input's own stem or an earlier generated one.
pub fn unique_source_names(paths: &[PathBuf]) -> Vec<String> {
    let file_name = |path: &PathBuf| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let mut taken: HashSet<String> = paths
        .iter()
        .map(|p| sanitize_stem(file_stem(&file_name(p))))
        .collect();
    let mut assigned: HashSet<String> = HashSet::new();

    paths
        .iter()
        .map(|path| {
            let name = file_name(path);
            let stem = sanitize_stem(file_stem(&name));
            if assigned.insert(stem.clone()) {
                return name;
            }
            let mut n = 2;
            let candidate = loop {
                let candidate = format!("{}-{}", stem, n);
                if !taken.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            };
            taken.insert(candidate.clone());
            assigned.insert(candidate.clone());
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            format!("{}{}", candidate, ext)
        })
        .collect()
}

/// Optimize one file and write its outputs into `output_dir`.
///
/// `name` is the name the outputs are derived from; see
/// [`unique_source_names`].
pub fn optimize_file(
    backend: &impl ImageBackend,
    path: &Path,
    name: &str,
    output_dir: &Path,
    request: &OptimizeRequest,
) -> Result<FileSummary, BatchError> {
    let bytes = std::fs::read(path)?;
    let mut session = Session::with_defaults(request.clone());
    session.load(backend, name, &bytes)?;
    let source_dimensions = session.source_dimensions().unwrap_or_default();
    let bundle = session.downloads(backend)?;

    let mut outputs = Vec::with_capacity(1 + bundle.alternates.len());
    for download in std::iter::once(&bundle.primary).chain(&bundle.alternates) {
        download.write_to(output_dir)?;
        outputs.push(OutputSummary {
            file_name: download.file_name.clone(),
            format: download.encoded.format,
            size: download.len(),
        });
    }

    let target_size = request.target_size.map(|t| t.bytes());
    if !bundle.achieved {
        warn!(
            "{}: target of {} bytes not met, best effort is {} bytes",
            path.display(),
            target_size.unwrap_or_default(),
            bundle.primary.len()
        );
    }
    info!(
        "{}: {} → {} bytes",
        path.display(),
        bundle.original_size,
        bundle.primary.len()
    );

    Ok(FileSummary {
        source: path.display().to_string(),
        original_size: bundle.original_size,
        source_dimensions,
        output_dimensions: (bundle.primary.encoded.width, bundle.primary.encoded.height),
        quality: bundle.primary.encoded.quality.percent(),
        target_size,
        achieved: bundle.achieved,
        probes: bundle.probes,
        outputs,
        skipped: bundle.skipped.iter().map(|s| s.format).collect(),
    })
}

/// Optimize every file in `inputs`, in parallel.
///
/// Per-file failures are recorded in the report; only setup errors (such as
/// an unwritable output directory) fail the whole call.
pub fn optimize_files(
    backend: &impl ImageBackend,
    inputs: &[PathBuf],
    output_dir: &Path,
    request: &OptimizeRequest,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    std::fs::create_dir_all(output_dir)?;
    let names = unique_source_names(inputs);

    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            file_count: inputs.len(),
        })
        .ok();
    }

    let results: Vec<Result<FileSummary, FailedFile>> = inputs
        .par_iter()
        .zip(names.par_iter())
        .enumerate()
        .map(|(i, (path, name))| {
            let result = optimize_file(backend, path, name, output_dir, request);
            let event = match &result {
                Ok(summary) => BatchEvent::FileOptimized {
                    index: i + 1,
                    summary: summary.clone(),
                },
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    BatchEvent::FileFailed {
                        index: i + 1,
                        source: path.display().to_string(),
                        error: e.to_string(),
                    }
                }
            };
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
            result.map_err(|e| FailedFile {
                source: path.display().to_string(),
                error: e.to_string(),
            })
        })
        .collect();

    let mut report = BatchReport::default();
    for result in results {
        match result {
            Ok(summary) => report.files.push(summary),
            Err(failed) => report.failures.push(failed),
        }
    }
    Ok(report)
}

/// Write `report` as pretty-printed JSON.
pub fn write_report(report: &BatchReport, path: &Path) -> Result<(), BatchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
