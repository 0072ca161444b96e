//! JSON export of timing reports

use crate::decode::statistics::TimingReport;
use crate::io::configuration::REPORT_EXTENSION;
use crate::io::error::{Result, TimingError};
use std::fs;
use std::path::{Path, PathBuf};

/// Default report location for an image: same directory, `.ettime` extension
pub fn report_path(image_path: &Path) -> PathBuf {
    image_path.with_extension(REPORT_EXTENSION)
}

/// Serialize a report as pretty-printed JSON
///
/// # Errors
///
/// Returns an error if serialization fails
pub fn report_to_string(report: &TimingReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(|source| TimingError::ReportExport {
        path: PathBuf::from("<memory>"),
        source,
    })
}

/// Write a report to `path`, creating parent directories as needed
///
/// # Errors
///
/// Returns an error if serialization or any file system step fails
pub fn write_report(report: &TimingReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(|source| TimingError::ReportExport {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| TimingError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create report directory",
            source,
        })?;
    }

    fs::write(path, json).map_err(|source| TimingError::FileSystem {
        path: path.to_path_buf(),
        operation: "write report",
        source,
    })
}
