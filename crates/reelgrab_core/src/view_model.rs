use std::path::PathBuf;

use crate::queue::{BatchTally, JobIndex, JobStatus, Queue};

/// Snapshot of one job row for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRowView {
    pub index: JobIndex,
    pub url: String,
    pub status: JobStatus,
    /// Whole percent, derived from the progress fraction.
    pub percent: u8,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
}

/// Snapshot of the whole batch for rendering one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchViewModel {
    pub rows: Vec<JobRowView>,
    pub tally: BatchTally,
    pub idle: bool,
}

impl Queue {
    pub fn view(&self) -> BatchViewModel {
        let rows = self
            .jobs()
            .iter()
            .enumerate()
            .map(|(index, job)| JobRowView {
                index,
                url: job.url().to_string(),
                status: job.status(),
                percent: (job.progress() * 100.0).round() as u8,
                output_path: job.output_path().map(|p| p.to_path_buf()),
                error: job.error().map(|e| e.to_string()),
            })
            .collect();
        BatchViewModel {
            rows,
            tally: self.tally(),
            idle: self.is_idle(),
        }
    }
}
