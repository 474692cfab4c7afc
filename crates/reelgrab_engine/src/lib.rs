//! Reelgrab engine: fetch execution, progress propagation and archive assembly.
mod archive;
mod config;
mod engine;
mod executor;
mod fetch;
mod filename;
mod persist;
mod types;
mod ytdlp;

pub use archive::{assemble, ArchiveError};
pub use config::{EngineConfig, YtDlpSettings};
pub use engine::EngineHandle;
pub use executor::{drain, run_next, shared_queue, QueueProgress, SharedQueue};
pub use fetch::{Fetcher, ProgressSink};
pub use filename::archive_entry_name;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use types::{EngineEvent, FetchError, FetchFailureKind, FetchOutcome};
pub use ytdlp::{download_release_binary, ensure_ytdlp, find_ytdlp, BootstrapError, YtDlpFetcher};
