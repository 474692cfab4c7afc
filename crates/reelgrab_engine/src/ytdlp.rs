use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use grab_logging::grab_info;
use reelgrab_core::video_id;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::config::{EngineConfig, YtDlpSettings};
use crate::fetch::{Fetcher, ProgressSink};
use crate::persist::{ensure_output_dir, PersistError};
use crate::types::{FetchError, FetchFailureKind, FetchOutcome};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("no user data directory to install the extractor into")]
    NoDataDir,
    #[error("release download failed with http status {status}")]
    Http { status: u16 },
    #[error("http error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Production fetcher: one `yt-dlp` subprocess per job, saving into the
/// configured output directory as `video_<id>.<ext>` and forwarding its
/// progress lines to the sink.
pub struct YtDlpFetcher {
    binary: PathBuf,
    output_dir: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(binary: PathBuf, output_dir: PathBuf) -> Self {
        Self { binary, output_dir }
    }

    /// Ensures the output directory and the extractor binary exist, then
    /// builds the fetcher.
    pub async fn from_config(config: &EngineConfig) -> Result<Self, BootstrapError> {
        ensure_output_dir(&config.output_dir)?;
        let binary = ensure_ytdlp(&config.ytdlp).await?;
        Ok(Self::new(binary, config.output_dir.clone()))
    }
}

#[async_trait::async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutcome, FetchError> {
        let mut child = Command::new(&self.binary)
            .args([
                "-f",
                "best",
                "--no-playlist",
                "--no-warnings",
                "--newline",
                "--progress-template",
                "download:%(progress._percent_str)s",
                "-P",
            ])
            .arg(&self.output_dir)
            .args(["-o", "video_%(id)s.%(ext)s", "--", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| FetchError::new(FetchFailureKind::Spawn, err.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::new(FetchFailureKind::Io, "extractor stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::new(FetchFailureKind::Io, "extractor stderr unavailable"))?;

        // Drain stderr concurrently so a chatty extractor cannot block on a
        // full pipe while we read progress from stdout.
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                text.push_str(&line);
                text.push('\n');
            }
            text
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(fraction) = parse_progress_line(&line) {
                sink.report(fraction);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|err| FetchError::new(FetchFailureKind::Io, err.to_string()))?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let message = if stderr_text.trim().is_empty() {
                status.to_string()
            } else {
                stderr_text.trim().to_string()
            };
            return Err(FetchError::new(
                FetchFailureKind::ExtractorFailed {
                    exit_code: status.code(),
                },
                message,
            ));
        }

        // Transfer complete even when the extractor never printed a total.
        sink.report(1.0);

        let output_path =
            find_downloaded_file(&self.output_dir, video_id(url).as_deref()).await?;
        let extension = output_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_string();
        Ok(FetchOutcome {
            output_path,
            extension,
        })
    }
}

/// Percent line emitted under `--progress-template download:...`, as a
/// fraction. Lines that are not progress are ignored.
fn parse_progress_line(line: &str) -> Option<f64> {
    let line = line.trim();
    let pct = if let Some(rest) = line.strip_prefix("download:") {
        rest.trim().trim_end_matches('%')
    } else if line.ends_with('%') {
        line.trim_end_matches('%').split_whitespace().last()?
    } else {
        return None;
    };
    let percent: f64 = pct.trim().parse().ok()?;
    Some((percent / 100.0).clamp(0.0, 1.0))
}

/// Locates the file the extractor just wrote: prefers names containing the
/// video id, otherwise falls back to the newest non-partial file.
async fn find_downloaded_file(
    dir: &Path,
    video_id: Option<&str>,
) -> Result<PathBuf, FetchError> {
    let io_err = |err: std::io::Error| FetchError::new(FetchFailureKind::Io, err.to_string());

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut best: Option<(bool, std::time::SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name.ends_with(".part") || name.ends_with(".ytdl") || name.starts_with('.') {
            continue;
        }

        let matches_id = video_id.is_some_and(|id| name.contains(id));
        let modified = match entry.metadata().await.and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        let candidate = (matches_id, modified, path);
        best = Some(match best.take() {
            Some(current) if (current.0, current.1) >= (candidate.0, candidate.1) => current,
            _ => candidate,
        });
    }

    best.map(|(_, _, path)| path).ok_or_else(|| {
        FetchError::new(
            FetchFailureKind::OutputMissing,
            format!("no output file in {}", dir.display()),
        )
    })
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

fn managed_dir(settings: &YtDlpSettings) -> Option<PathBuf> {
    settings
        .managed_dir
        .clone()
        .or_else(|| dirs::data_dir().map(|dir| dir.join("reelgrab").join("bin")))
}

/// Explicit setting, then `PATH`, then the managed copy.
pub fn find_ytdlp(settings: &YtDlpSettings) -> Option<PathBuf> {
    if let Some(binary) = &settings.binary {
        return binary.exists().then(|| binary.clone());
    }
    if let Ok(found) = which::which(binary_name()) {
        return Some(found);
    }
    let managed = managed_dir(settings)?.join(binary_name());
    managed.exists().then_some(managed)
}

/// Discovers the extractor, downloading the official release binary into the
/// managed directory when none is present.
pub async fn ensure_ytdlp(settings: &YtDlpSettings) -> Result<PathBuf, BootstrapError> {
    if let Some(found) = find_ytdlp(settings) {
        return Ok(found);
    }
    let dir = managed_dir(settings).ok_or(BootstrapError::NoDataDir)?;
    download_release_binary(settings, &dir).await
}

/// Fetches the platform's release asset from `release_base_url` into
/// `target_dir` and marks it executable.
pub async fn download_release_binary(
    settings: &YtDlpSettings,
    target_dir: &Path,
) -> Result<PathBuf, BootstrapError> {
    let asset = if cfg!(windows) {
        "yt-dlp.exe"
    } else if cfg!(target_os = "macos") {
        "yt-dlp_macos"
    } else {
        "yt-dlp"
    };
    let url = format!("{}/{}", settings.release_base_url.trim_end_matches('/'), asset);
    grab_info!("bootstrapping extractor from {}", url);

    tokio::fs::create_dir_all(target_dir).await?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?;
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(BootstrapError::Http {
            status: response.status().as_u16(),
        });
    }
    let bytes = response.bytes().await?;

    let target = target_dir.join(binary_name());
    tokio::fs::write(&target, &bytes).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755)).await?;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::parse_progress_line;

    #[test]
    fn parses_templated_progress_lines() {
        assert_eq!(parse_progress_line("download:  50.0%"), Some(0.5));
        assert_eq!(parse_progress_line("download: 100.0%"), Some(1.0));
        assert_eq!(parse_progress_line("download:   0.0%"), Some(0.0));
    }

    #[test]
    fn parses_plain_percent_lines() {
        assert_eq!(
            parse_progress_line("[download]  12.5% of 10.00MiB"),
            None,
            "mid-line percents are not progress totals"
        );
        assert_eq!(parse_progress_line("[download] 12.5%"), Some(0.125));
    }

    #[test]
    fn ignores_non_progress_lines() {
        assert_eq!(parse_progress_line("[Merger] merging formats"), None);
        assert_eq!(parse_progress_line("download: n/a%"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn clamps_overshoot() {
        assert_eq!(parse_progress_line("download: 101.2%"), Some(1.0));
    }
}
