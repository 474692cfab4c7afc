use std::fmt;
use std::path::PathBuf;

use reelgrab_core::{BatchTally, JobIndex};
use thiserror::Error;

/// What the fetcher hands back for one resolved job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub output_path: PathBuf,
    /// File extension as resolved by the extractor (`mp4`, `mkv`, ...).
    pub extension: String,
}

/// Typed failure signal at the orchestration boundary. The executor converts
/// every one of these into the job's `Failed` state; nothing propagates past
/// the job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchFailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FetchFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailureKind {
    /// No usable extractor binary on this machine.
    ExtractorMissing,
    /// The extractor process could not be spawned.
    Spawn,
    /// The extractor ran and exited non-zero.
    ExtractorFailed { exit_code: Option<i32> },
    /// The extractor reported success but no output file was found.
    OutputMissing,
    Io,
}

impl fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailureKind::ExtractorMissing => write!(f, "extractor missing"),
            FetchFailureKind::Spawn => write!(f, "failed to spawn extractor"),
            FetchFailureKind::ExtractorFailed { exit_code: Some(code) } => {
                write!(f, "extractor exited with {code}")
            }
            FetchFailureKind::ExtractorFailed { exit_code: None } => {
                write!(f, "extractor terminated by signal")
            }
            FetchFailureKind::OutputMissing => write!(f, "output file missing"),
            FetchFailureKind::Io => write!(f, "io error"),
        }
    }
}

/// Events the engine worker reports back over its channel.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    BatchAccepted { jobs: usize },
    /// A new batch was refused because a download is still in flight.
    BatchRejected { downloading: JobIndex },
    JobStarted { index: JobIndex, url: String },
    /// `Ok` carries the output path; `Err` the recorded failure message.
    JobResolved {
        index: JobIndex,
        result: Result<PathBuf, String>,
    },
    /// No `Waiting` job remains; the batch is complete.
    BatchIdle { tally: BatchTally },
}
