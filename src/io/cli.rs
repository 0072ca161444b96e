//! Command-line interface for decoding single images or whole directories

use crate::decode::engine::decode_exposure;
use crate::decode::statistics::TimingReport;
use crate::io::configuration::{DecodeConfig, IMAGE_EXTENSIONS};
use crate::io::error::{Result, TimingError, invalid_parameter};
use crate::io::header::{ExposureHeader, sidecar_path};
use crate::io::image::load_luma;
use crate::io::progress::ProgressManager;
use crate::io::registration::RoiSet;
use crate::io::report::{report_path, write_report};
use clap::{ArgAction, Parser};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "exposure-timing")]
#[command(
    author,
    version,
    about = "Decode an LED timecode board captured in camera exposures"
)]
/// Command-line arguments for the decode tool
pub struct Cli {
    /// Input image file or directory of images
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// ROI registration JSON holding the 20 LED polygons
    #[arg(short, long, value_name = "ROI.json")]
    pub registration: PathBuf,

    /// Observation timestamp, overrides the header sidecar
    #[arg(short, long)]
    pub date_obs: Option<String>,

    /// Exposure time in seconds, overrides the header sidecar
    #[arg(short, long)]
    pub exptime: Option<f64>,

    /// Report file for a single image, or report directory for a batch
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Worker threads for batch decoding, 0 for one per core
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Process images even if a report exists
    #[arg(short, long)]
    pub no_skip: bool,

    /// Increase log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Check if existing reports should be skipped
    pub const fn skip_existing(&self) -> bool {
        !self.no_skip
    }

    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Log filter directive selected by the verbosity count
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Install the global log subscriber writing to stderr
///
/// `RUST_LOG` takes precedence over `default_level`. Installing twice is a
/// no-op.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Check whether `path` carries one of the supported image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Orchestrates decoding of one image or a directory of images
pub struct FileProcessor {
    cli: Cli,
    config: DecodeConfig,
    progress_manager: Option<ProgressManager>,
}

impl FileProcessor {
    /// Create a new file processor with the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Self {
            cli,
            config: DecodeConfig::default(),
            progress_manager,
        }
    }

    /// Process files according to CLI arguments
    ///
    /// A single target image propagates its decode error. In a batch each
    /// failure is logged, the remaining images still run and the batch
    /// reports the failure count at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The registration file cannot be loaded
    /// - The target is missing or not an image or directory
    /// - A single target image fails to decode
    /// - Any image of a batch fails to decode
    pub fn process(&self) -> Result<()> {
        let rois = RoiSet::from_path(&self.cli.registration)?;
        let files = self.collect_files()?;

        if files.is_empty() {
            info!(path = %self.cli.target.display(), "nothing to decode");
            return Ok(());
        }

        if self.cli.target.is_file() {
            return files
                .first()
                .map_or(Ok(()), |file| self.process_file(file, &rois).map(|_| ()));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.cli.jobs)
            .build()
            .map_err(|e| invalid_parameter("jobs", &self.cli.jobs, &e))?;

        if let Some(ref pm) = self.progress_manager {
            pm.initialize(files.len());
        }

        let failures = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let result = self.process_file(file, &rois);
                    if let Err(ref error) = result {
                        warn!(file = %file.display(), %error, "decode failed");
                    }
                    if let Some(ref pm) = self.progress_manager {
                        pm.complete_file(file, result.is_ok());
                    }
                    result.is_err()
                })
                .filter(|&failed| failed)
                .count()
        });

        if let Some(ref pm) = self.progress_manager {
            pm.finish();
        }
        info!(images = files.len(), failures, "batch finished");

        if failures > 0 {
            return Err(TimingError::BatchFailed {
                failed: failures,
                total: files.len(),
            });
        }
        Ok(())
    }

    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let target = &self.cli.target;
        if target.is_file() {
            if !is_image_file(target) {
                return Err(invalid_parameter(
                    "target",
                    &target.display(),
                    &format!("expected one of {}", IMAGE_EXTENSIONS.join(", ")),
                ));
            }
            Ok(if self.should_process_file(target) {
                vec![target.clone()]
            } else {
                vec![]
            })
        } else if target.is_dir() {
            let entries = std::fs::read_dir(target).map_err(|source| TimingError::FileSystem {
                path: target.clone(),
                operation: "read directory",
                source,
            })?;
            let mut files = Vec::new();
            for entry in entries {
                let path = entry?.path();
                if path.is_file() && is_image_file(&path) && self.should_process_file(&path) {
                    files.push(path);
                }
            }
            files.sort();
            Ok(files)
        } else {
            Err(invalid_parameter(
                "target",
                &target.display(),
                &"must be an image file or directory",
            ))
        }
    }

    fn should_process_file(&self, input_path: &Path) -> bool {
        if !self.cli.skip_existing() {
            return true;
        }

        let output_path = self.output_path(input_path);
        if output_path.exists() {
            info!(file = %input_path.display(), "skipping, report exists");
            false
        } else {
            true
        }
    }

    fn process_file(&self, input_path: &Path, rois: &RoiSet) -> Result<TimingReport> {
        let start_time = Instant::now();
        let header = self.resolve_header(input_path)?;
        let image = load_luma(input_path)?;

        let report = decode_exposure(image.view(), rois, &header, &self.config)?;
        let output_path = self.output_path(input_path);
        write_report(&report, &output_path)?;

        info!(
            file = %input_path.display(),
            report = %output_path.display(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "wrote timing report"
        );
        Ok(report)
    }

    /// Header for `image_path`: sidecar values, then command-line overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the sidecar is unreadable or a value is missing
    /// from both sources
    pub fn resolve_header(&self, image_path: &Path) -> Result<ExposureHeader> {
        let sidecar = sidecar_path(image_path);
        let base = if sidecar.is_file() {
            Some(ExposureHeader::from_sidecar(&sidecar)?)
        } else {
            None
        };

        let date_obs = self
            .cli
            .date_obs
            .clone()
            .or_else(|| base.as_ref().map(|header| header.date_obs().to_string()));
        let exposure_time = self
            .cli
            .exptime
            .or_else(|| base.as_ref().map(ExposureHeader::exposure_time));

        match (date_obs, exposure_time) {
            (Some(date_obs), Some(exposure_time)) => ExposureHeader::new(&date_obs, exposure_time),
            (None, _) => Err(missing_header("DATE-OBS", "--date-obs", &sidecar)),
            (_, None) => Err(missing_header("EXPTIME", "--exptime", &sidecar)),
        }
    }

    /// Where the report for `input_path` is written
    pub fn output_path(&self, input_path: &Path) -> PathBuf {
        let default = report_path(input_path);
        match &self.cli.output {
            Some(output) if self.cli.target.is_dir() => {
                output.join(default.file_name().unwrap_or_default())
            }
            Some(output) => output.clone(),
            None => default,
        }
    }
}

fn missing_header(keyword: &'static str, flag: &str, sidecar: &Path) -> TimingError {
    TimingError::InvalidHeader {
        keyword,
        value: String::new(),
        reason: format!("pass {flag} or provide {}", sidecar.display()),
    }
}
