use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

use reelgrab_core::{build_queue, BatchOutcome, JobStatus, Queue};
use reelgrab_engine::{
    drain, run_next, shared_queue, Fetcher, FetchError, FetchFailureKind, FetchOutcome,
    ProgressSink, QueueProgress, SharedQueue,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(grab_logging::initialize_for_tests);
}

fn queue_of(n: usize) -> Queue {
    let text = (0..n)
        .map(|i| format!("https://www.facebook.com/reel/20{i}\n"))
        .collect::<String>();
    match build_queue(&text) {
        BatchOutcome::Built { queue, .. } => queue,
        BatchOutcome::NoInput => unreachable!(),
    }
}

fn ok(name: &str) -> Result<FetchOutcome, FetchError> {
    Ok(FetchOutcome {
        output_path: PathBuf::from(name),
        extension: "mp4".to_string(),
    })
}

fn err(message: &str) -> Result<FetchOutcome, FetchError> {
    Err(FetchError {
        kind: FetchFailureKind::ExtractorFailed { exit_code: Some(1) },
        message: message.to_string(),
    })
}

/// Stub fetcher scripted by call order; records its own call concurrency so
/// tests can verify the single-flight rule.
struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<FetchOutcome, FetchError>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(script: Vec<Result<FetchOutcome, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        _url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutcome, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        sink.report(0.5);
        let result = self.script.lock().unwrap().pop_front().expect("script exhausted");
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[tokio::test]
async fn drain_resolves_jobs_in_order_and_contains_failures() {
    init_logging();
    let queue = shared_queue(queue_of(3));
    let fetcher = ScriptedFetcher::new(vec![ok("video_200.mp4"), err("removed"), ok("video_202.mp4")]);

    let tally = drain(&queue, &fetcher).await;
    assert_eq!(tally.succeeded, 2);
    assert_eq!(tally.failed, 1);
    assert_eq!(tally.waiting, 0);

    let guard = queue.lock().unwrap();
    let statuses: Vec<_> = guard.jobs().iter().map(|j| j.status()).collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Success, JobStatus::Failed, JobStatus::Success]
    );
    assert_eq!(guard.jobs()[1].error(), Some("extractor exited with 1: removed"));
    assert_eq!(
        guard.jobs()[0].output_path(),
        Some(PathBuf::from("video_200.mp4").as_path())
    );
    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_next_signals_idle_exactly_once_at_the_end() {
    init_logging();
    let queue = shared_queue(queue_of(3));
    let fetcher = ScriptedFetcher::new(vec![ok("a.mp4"), err("gone"), ok("c.mp4")]);

    assert_eq!(run_next(&queue, &fetcher).await, Some(0));
    assert_eq!(run_next(&queue, &fetcher).await, Some(1));
    assert_eq!(run_next(&queue, &fetcher).await, Some(2));
    assert_eq!(run_next(&queue, &fetcher).await, None);
}

#[tokio::test]
async fn run_next_on_an_empty_queue_is_idle() {
    init_logging();
    let queue = shared_queue(Queue::default());
    let fetcher = ScriptedFetcher::new(Vec::new());
    assert_eq!(run_next(&queue, &fetcher).await, None);
}

#[tokio::test]
async fn concurrent_invocations_never_overlap_downloads() {
    init_logging();
    let queue = shared_queue(queue_of(2));
    let fetcher = ScriptedFetcher::new(vec![ok("a.mp4"), ok("b.mp4")]);

    let (first, second) = tokio::join!(run_next(&queue, &fetcher), run_next(&queue, &fetcher));

    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
    // Exactly one invocation won the start; the loser yielded without
    // touching the later job.
    let mut results = [first, second];
    results.sort();
    assert_eq!(results, [None, Some(0)]);
    assert_eq!(
        queue.lock().unwrap().jobs()[1].status(),
        JobStatus::Waiting
    );
}

#[tokio::test]
async fn retried_job_runs_before_later_waiting_jobs() {
    init_logging();
    let queue = shared_queue(queue_of(3));
    let fetcher = ScriptedFetcher::new(vec![ok("a.mp4"), err("flaky"), ok("b.mp4"), ok("c.mp4")]);

    assert_eq!(run_next(&queue, &fetcher).await, Some(0));
    assert_eq!(run_next(&queue, &fetcher).await, Some(1));
    queue.lock().unwrap().retry(1).unwrap();

    // Job 2 is still Waiting, but the retried job sits at the lower index
    // and is picked up first.
    assert_eq!(run_next(&queue, &fetcher).await, Some(1));
    assert_eq!(run_next(&queue, &fetcher).await, Some(2));
    assert_eq!(run_next(&queue, &fetcher).await, None);
}

struct ProgressProbe {
    queue: SharedQueue,
}

#[async_trait::async_trait]
impl Fetcher for ProgressProbe {
    async fn fetch(
        &self,
        _url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutcome, FetchError> {
        sink.report(0.25);
        // The fraction lands in the job record while the download is still
        // in flight, not after it resolves.
        assert_eq!(self.queue.lock().unwrap().jobs()[0].progress(), 0.25);
        sink.report(0.9);
        ok("video_200.mp4")
    }
}

#[tokio::test]
async fn progress_reaches_the_job_record_mid_flight() {
    init_logging();
    let queue = shared_queue(queue_of(1));
    let fetcher = ProgressProbe {
        queue: queue.clone(),
    };

    assert_eq!(run_next(&queue, &fetcher).await, Some(0));
    // Success pins progress to 1.0 regardless of the last report.
    assert_eq!(queue.lock().unwrap().jobs()[0].progress(), 1.0);
}

#[tokio::test]
async fn queue_progress_clamps_and_ignores_regressions() {
    init_logging();
    let queue = shared_queue(queue_of(1));
    queue.lock().unwrap().start(0).unwrap();

    let reporter = QueueProgress::new(queue.clone(), 0);
    reporter.report(0.7);
    reporter.report(0.2);
    reporter.report(3.0);
    assert_eq!(queue.lock().unwrap().jobs()[0].progress(), 1.0);

    let reporter_again = QueueProgress::new(queue.clone(), 0);
    reporter_again.report(0.1);
    assert_eq!(queue.lock().unwrap().jobs()[0].progress(), 1.0);
}
