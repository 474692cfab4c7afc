mod cli;
mod logging;

use std::error::Error;
use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use grab_logging::{grab_info, grab_warn};
use reelgrab_core::{build_queue, BatchOutcome, BatchTally, JobStatus, SkipReason};
use reelgrab_engine::{
    assemble, AtomicFileWriter, EngineConfig, EngineEvent, EngineHandle, YtDlpFetcher,
};

use cli::{parse_args, CliArgs, USAGE};

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    if args.help {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    logging::initialize(args.log);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode, Box<dyn Error>> {
    let raw = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let (queue, diagnostics) = match build_queue(&raw) {
        BatchOutcome::NoInput => {
            eprintln!("Please enter at least one URL.");
            return Ok(ExitCode::from(2));
        }
        BatchOutcome::Built { queue, diagnostics } => (queue, diagnostics),
    };
    for diagnostic in &diagnostics {
        if diagnostic.reason == SkipReason::Invalid {
            grab_warn!("line {} skipped: {}", diagnostic.line_no, diagnostic.input);
            println!(
                "skipped invalid or non-video URL (line {}): {}",
                diagnostic.line_no, diagnostic.input
            );
        }
    }
    if queue.is_empty() {
        eprintln!("No valid Facebook video URLs found.");
        return Ok(ExitCode::from(2));
    }

    let config = match &args.output_dir {
        Some(dir) => EngineConfig::default_with_output(dir.clone()),
        None => EngineConfig::default(),
    };
    println!("saving videos to {}", config.output_dir.display());

    let runtime = tokio::runtime::Runtime::new()?;
    let fetcher = runtime.block_on(YtDlpFetcher::from_config(&config))?;
    let handle = EngineHandle::new(Arc::new(fetcher));

    let total = queue.len();
    grab_info!("batch submitted: {} job(s)", total);
    handle.submit(queue);
    handle.run_batch();
    let mut tally = render_until_idle(&handle, total);

    if args.retry_failed && tally.failed > 0 {
        println!("retrying {} failed job(s)", tally.failed);
        for row in handle.view().rows {
            if row.status == JobStatus::Failed {
                handle.retry(row.index);
            }
        }
        handle.run_batch();
        tally = render_until_idle(&handle, total);
    }

    println!(
        "done: {} saved | {} failed | total {}",
        tally.succeeded,
        tally.failed,
        tally.total()
    );

    if let Some(archive_path) = &args.archive {
        if tally.succeeded == 0 {
            eprintln!("nothing to archive: no job succeeded");
        } else {
            write_archive(&handle, archive_path)?;
        }
    }

    Ok(if tally.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Polls the engine, printing one row per job and a carriage-return percent
/// line for the job in flight, until the batch goes idle.
fn render_until_idle(handle: &EngineHandle, total: usize) -> BatchTally {
    let mut in_flight: Option<(usize, u8)> = None;
    loop {
        match handle.try_recv() {
            Some(EngineEvent::JobStarted { index, url }) => {
                println!("[{}/{}] downloading {}", index + 1, total, url);
                in_flight = Some((index, u8::MAX));
            }
            Some(EngineEvent::JobResolved {
                result: Ok(path), ..
            }) => {
                finish_progress_line(&mut in_flight);
                println!("  completed: {}", path.display());
            }
            Some(EngineEvent::JobResolved {
                result: Err(message),
                ..
            }) => {
                finish_progress_line(&mut in_flight);
                println!("  failed: {message}");
            }
            Some(EngineEvent::BatchIdle { tally }) => {
                finish_progress_line(&mut in_flight);
                return tally;
            }
            Some(_) => {}
            None => {
                if let Some((index, shown)) = in_flight {
                    let view = handle.view();
                    if let Some(row) = view.rows.get(index) {
                        if row.status == JobStatus::Downloading && row.percent != shown {
                            print!("\r  {:>3}%", row.percent);
                            let _ = std::io::stdout().flush();
                            in_flight = Some((index, row.percent));
                        }
                    }
                }
                std::thread::sleep(Duration::from_millis(150));
            }
        }
    }
}

fn finish_progress_line(in_flight: &mut Option<(usize, u8)>) {
    if let Some((_, shown)) = in_flight.take() {
        if shown != u8::MAX {
            println!();
        }
    }
}

fn write_archive(handle: &EngineHandle, archive_path: &Path) -> Result<(), Box<dyn Error>> {
    let jobs = {
        let shared = handle.queue();
        let guard = match shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.jobs().to_vec()
    };

    let bytes = assemble(&jobs)?;
    let dir = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("reels_archive.zip");
    let written = AtomicFileWriter::new(dir.to_path_buf()).write(name, &bytes)?;
    println!("archive written to {}", written.display());
    Ok(())
}
