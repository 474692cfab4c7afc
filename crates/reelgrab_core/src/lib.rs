//! Reelgrab core: pure queue model, state machine and link classification.
mod batch;
mod links;
mod queue;
mod view_model;

pub use batch::{build_queue, BatchOutcome, LineDiagnostic, SkipReason};
pub use links::{is_valid_video_url, normalize_url, video_id};
pub use queue::{BatchTally, JobIndex, JobRecord, JobStatus, Queue, QueueError};
pub use view_model::{BatchViewModel, JobRowView};
