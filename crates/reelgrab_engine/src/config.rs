use std::path::PathBuf;

/// Where and how the engine runs the extractor.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Destination directory for downloaded media; created if absent.
    pub output_dir: PathBuf,
    pub ytdlp: YtDlpSettings,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ytdlp: YtDlpSettings::default(),
        }
    }

    /// `<user downloads dir>/Facebook_Reels`, falling back to the current
    /// directory when the platform reports no downloads dir.
    pub fn default_output_dir() -> PathBuf {
        dirs::download_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Facebook_Reels")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::default_with_output(Self::default_output_dir())
    }
}

/// Extractor binary discovery and bootstrap settings.
#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    /// Explicit binary path; skips discovery when set.
    pub binary: Option<PathBuf>,
    /// Directory for the managed copy; defaults to the user data dir.
    pub managed_dir: Option<PathBuf>,
    /// Base URL the release binary is fetched from during bootstrap.
    /// Overridable so tests can point it at a local server.
    pub release_base_url: String,
}

impl Default for YtDlpSettings {
    fn default() -> Self {
        Self {
            binary: None,
            managed_dir: None,
            release_base_url: "https://github.com/yt-dlp/yt-dlp/releases/latest/download"
                .to_string(),
        }
    }
}
