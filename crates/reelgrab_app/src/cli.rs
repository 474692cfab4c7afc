//! Argument parsing for the reelgrab CLI.

use std::path::PathBuf;

use crate::logging::LogDestination;

pub const USAGE: &str = "\
Usage: reelgrab [URLS_FILE] [options]

Reads Facebook video/reel links (one per line) from URLS_FILE, or from
stdin when no file is given, and downloads each in submission order.

Options:
  -o, --output <DIR>     destination directory (default: <Downloads>/Facebook_Reels)
      --archive <FILE>   after the batch, write successful downloads into FILE (zip)
      --retry-failed     give failed jobs one more pass after the first drain
      --log <DEST>       log destination: file | terminal | both (default: file)
  -h, --help             show this help
";

pub struct CliArgs {
    pub input: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub retry_failed: bool,
    pub log: LogDestination,
    pub help: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: None,
            archive: None,
            retry_failed: false,
            log: LogDestination::File,
            help: false,
        }
    }
}

pub fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "-o" | "--output" => {
                let value = args.next().ok_or("--output requires a directory")?;
                parsed.output_dir = Some(PathBuf::from(value));
            }
            "--archive" => {
                let value = args.next().ok_or("--archive requires a file path")?;
                parsed.archive = Some(PathBuf::from(value));
            }
            "--retry-failed" => parsed.retry_failed = true,
            "--log" => {
                let value = args.next().ok_or("--log requires a destination")?;
                parsed.log = match value.as_str() {
                    "file" => LogDestination::File,
                    "terminal" => LogDestination::Terminal,
                    "both" => LogDestination::Both,
                    other => return Err(format!("unknown log destination: {other}")),
                };
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            _ => {
                if parsed.input.is_some() {
                    return Err("only one URLS_FILE may be given".to_string());
                }
                parsed.input = Some(PathBuf::from(arg));
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::parse_args;
    use std::path::PathBuf;

    fn parse(parts: &[&str]) -> Result<super::CliArgs, String> {
        parse_args(parts.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_stdin_and_file_logging() {
        let args = parse(&[]).unwrap();
        assert!(args.input.is_none());
        assert!(args.output_dir.is_none());
        assert!(!args.retry_failed);
    }

    #[test]
    fn accepts_file_and_options() {
        let args = parse(&["links.txt", "-o", "/tmp/out", "--archive", "reels.zip", "--retry-failed"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("links.txt")));
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(args.archive, Some(PathBuf::from("reels.zip")));
        assert!(args.retry_failed);
    }

    #[test]
    fn rejects_unknown_options_and_double_input() {
        assert!(parse(&["--frobnicate"]).is_err());
        assert!(parse(&["a.txt", "b.txt"]).is_err());
        assert!(parse(&["--output"]).is_err());
    }
}
