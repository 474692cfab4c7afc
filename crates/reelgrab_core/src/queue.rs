use std::path::{Path, PathBuf};

use thiserror::Error;

pub type JobIndex = usize;

/// Lifecycle of one download job. `Failed` is re-enterable via [`Queue::retry`];
/// `Success` is terminal for the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Downloading,
    Success,
    Failed,
}

/// One accepted URL and its download lifecycle. Mutated only through
/// [`Queue`] methods so the status/progress/output invariants hold.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    url: String,
    status: JobStatus,
    progress: f64,
    output_path: Option<PathBuf>,
    error: Option<String>,
}

impl JobRecord {
    fn new(url: String) -> Self {
        Self {
            url,
            status: JobStatus::Waiting,
            progress: 0.0,
            output_path: None,
            error: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Fraction in `[0.0, 1.0]`; meaningful while `Downloading`, pinned to
    /// `1.0` on `Success`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Present if and only if the job is `Success`.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Present if and only if the job is `Failed`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Per-status counts for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchTally {
    pub waiting: usize,
    pub downloading: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchTally {
    pub fn total(&self) -> usize {
        self.waiting + self.downloading + self.succeeded + self.failed
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("job index {0} out of bounds")]
    BadIndex(JobIndex),
    #[error("job {index} is {actual:?}, expected {expected:?}")]
    IllegalTransition {
        index: JobIndex,
        expected: JobStatus,
        actual: JobStatus,
    },
    #[error("job {other} is still downloading")]
    AlreadyDownloading { other: JobIndex },
}

/// Ordered job records for one submitted batch; insertion order is
/// submission order. Rebuilt wholesale per batch by the queue builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    jobs: Vec<JobRecord>,
}

impl Queue {
    /// URLs must already be normalized, validated and deduplicated.
    pub(crate) fn from_urls(urls: Vec<String>) -> Self {
        Self {
            jobs: urls.into_iter().map(JobRecord::new).collect(),
        }
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Lowest-index `Waiting` job; the executor's selection rule.
    pub fn next_waiting(&self) -> Option<JobIndex> {
        self.jobs
            .iter()
            .position(|job| job.status == JobStatus::Waiting)
    }

    /// Index of the in-flight job, if any. At most one exists.
    pub fn downloading(&self) -> Option<JobIndex> {
        self.jobs
            .iter()
            .position(|job| job.status == JobStatus::Downloading)
    }

    /// No `Waiting` or `Downloading` job remains; the batch is complete.
    pub fn is_idle(&self) -> bool {
        self.jobs
            .iter()
            .all(|job| matches!(job.status, JobStatus::Success | JobStatus::Failed))
    }

    pub fn tally(&self) -> BatchTally {
        let mut tally = BatchTally::default();
        for job in &self.jobs {
            match job.status {
                JobStatus::Waiting => tally.waiting += 1,
                JobStatus::Downloading => tally.downloading += 1,
                JobStatus::Success => tally.succeeded += 1,
                JobStatus::Failed => tally.failed += 1,
            }
        }
        tally
    }

    /// `Waiting -> Downloading`. Errors if the job is in any other state or
    /// if another job is already in flight (single-flight rule).
    pub fn start(&mut self, index: JobIndex) -> Result<(), QueueError> {
        if let Some(other) = self.downloading() {
            return Err(QueueError::AlreadyDownloading { other });
        }
        let job = self.job_mut(index)?;
        if job.status != JobStatus::Waiting {
            return Err(QueueError::IllegalTransition {
                index,
                expected: JobStatus::Waiting,
                actual: job.status,
            });
        }
        job.status = JobStatus::Downloading;
        job.progress = 0.0;
        Ok(())
    }

    /// Writes a progress fraction for an in-flight job. Clamped to
    /// `[0.0, 1.0]`; regressions are ignored so progress never decreases.
    /// A no-op unless the job is `Downloading` (late callbacks tolerated).
    pub fn set_progress(&mut self, index: JobIndex, fraction: f64) {
        let Some(job) = self.jobs.get_mut(index) else {
            return;
        };
        if job.status != JobStatus::Downloading {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction > job.progress {
            job.progress = fraction;
        }
    }

    /// `Downloading -> Success`, recording the output path and pinning
    /// progress to `1.0`.
    pub fn resolve_success(
        &mut self,
        index: JobIndex,
        output_path: PathBuf,
    ) -> Result<(), QueueError> {
        let job = self.downloading_job_mut(index)?;
        job.status = JobStatus::Success;
        job.progress = 1.0;
        job.output_path = Some(output_path);
        job.error = None;
        Ok(())
    }

    /// `Downloading -> Failed`, recording the diagnostic message.
    pub fn resolve_failure(
        &mut self,
        index: JobIndex,
        message: String,
    ) -> Result<(), QueueError> {
        let job = self.downloading_job_mut(index)?;
        job.status = JobStatus::Failed;
        job.output_path = None;
        job.error = Some(message);
        Ok(())
    }

    /// Explicit operator retry: `Failed -> Waiting`, clearing progress,
    /// output path and error. The job keeps its original index, so the next
    /// left-to-right scan picks it up before any later `Waiting` job.
    pub fn retry(&mut self, index: JobIndex) -> Result<(), QueueError> {
        let job = self.job_mut(index)?;
        if job.status != JobStatus::Failed {
            return Err(QueueError::IllegalTransition {
                index,
                expected: JobStatus::Failed,
                actual: job.status,
            });
        }
        job.status = JobStatus::Waiting;
        job.progress = 0.0;
        job.output_path = None;
        job.error = None;
        Ok(())
    }

    fn job_mut(&mut self, index: JobIndex) -> Result<&mut JobRecord, QueueError> {
        self.jobs.get_mut(index).ok_or(QueueError::BadIndex(index))
    }

    fn downloading_job_mut(&mut self, index: JobIndex) -> Result<&mut JobRecord, QueueError> {
        let job = self.job_mut(index)?;
        if job.status != JobStatus::Downloading {
            return Err(QueueError::IllegalTransition {
                index,
                expected: JobStatus::Downloading,
                actual: job.status,
            });
        }
        Ok(job)
    }
}
