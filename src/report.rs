use std::{
    fs::OpenOptions,
    io::BufWriter,
    path::{Path, PathBuf},
};

use log::{error, info, warn};
use serde::Serialize;

#[derive(Serialize, Debug)]
pub(crate) struct ItemError {
    pub file: PathBuf,
    pub error: String,
}

/// Outcome of one run, item by item.
#[derive(Serialize, Debug, Default)]
pub(crate) struct RunReport {
    pub converted: Vec<PathBuf>,
    pub already_converted: Vec<PathBuf>,
    pub denylisted: Vec<PathBuf>,
    pub unsupported: Vec<PathBuf>,
    /// Outputs whose front matter was rewritten by the fix pass.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fixed: Vec<PathBuf>,
    pub failed: Vec<ItemError>,
    /// Items that succeeded with a non-fatal problem.
    pub warnings: Vec<ItemError>,
}

impl RunReport {
    pub fn fail(&mut self, file: &Path, error: impl std::fmt::Display) {
        error!("Failed {file:?}: {error}");
        self.failed.push(ItemError {
            file: file.to_path_buf(),
            error: error.to_string(),
        });
    }

    pub fn warn(&mut self, file: &Path, warning: impl std::fmt::Display) {
        warn!("{file:?}: {warning}");
        self.warnings.push(ItemError {
            file: file.to_path_buf(),
            error: warning.to_string(),
        });
    }

    pub fn log_summary(&self) {
        info!(
            "Done: {} converted, {} fixed, {} already converted, {} denylisted, {} unsupported, {} failed, {} warnings",
            self.converted.len(),
            self.fixed.len(),
            self.already_converted.len(),
            self.denylisted.len(),
            self.unsupported.len(),
            self.failed.len(),
            self.warnings.len(),
        );
    }
}

pub(crate) fn save_report(report_path: &Path, report: &RunReport) -> anyhow::Result<()> {
    let report_fd = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(report_path)?;
    let writer = BufWriter::new(report_fd);
    serde_json::to_writer_pretty(writer, report)?;
    info!("Report written to {report_path:?}");

    Ok(())
}
