use std::fs;
use std::io::{self, Cursor, Write};
use std::path::PathBuf;

use reelgrab_core::{JobRecord, JobStatus};
use serde_json::json;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::filename::archive_entry_name;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// A supposedly successful job's output file could not be read, e.g. it
    /// was deleted externally. Distinct from per-job failure; the job stays
    /// `Success`.
    #[error("cannot read output file {path:?}: {source}")]
    MissingOutput {
        path: PathBuf,
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Bundles every successful job's output into one in-memory zip, each entry
/// named by its base filename, plus a `manifest.json` listing the videos.
/// Reads job records only; never mutates them. Idempotent for a given job
/// set. Callers should not invoke this with zero successful jobs.
pub fn assemble(jobs: &[JobRecord]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut manifest = Vec::new();
    for job in jobs {
        if job.status() != JobStatus::Success {
            continue;
        }
        let Some(path) = job.output_path() else {
            continue;
        };
        let bytes = fs::read(path).map_err(|source| ArchiveError::MissingOutput {
            path: path.to_path_buf(),
            source,
        })?;
        let name = archive_entry_name(path);
        writer.start_file(name.as_str(), options)?;
        writer.write_all(&bytes)?;
        manifest.push(json!({ "filename": name, "url": job.url() }));
    }

    let manifest = json!({
        "video_count": manifest.len(),
        "videos": manifest,
    });
    writer.start_file("manifest.json", options)?;
    writer.write_all(manifest.to_string().as_bytes())?;

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
