use std::path::PathBuf;
use std::sync::Once;

use reelgrab_core::{build_queue, BatchOutcome, JobStatus, Queue, QueueError};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(grab_logging::initialize_for_tests);
}

fn queue_of(n: usize) -> Queue {
    let text = (0..n)
        .map(|i| format!("https://www.facebook.com/reel/10{i}\n"))
        .collect::<String>();
    match build_queue(&text) {
        BatchOutcome::Built { queue, .. } => queue,
        BatchOutcome::NoInput => unreachable!(),
    }
}

#[test]
fn jobs_begin_waiting_with_no_outputs() {
    init_logging();
    let queue = queue_of(2);
    for job in queue.jobs() {
        assert_eq!(job.status(), JobStatus::Waiting);
        assert_eq!(job.progress(), 0.0);
        assert!(job.output_path().is_none());
        assert!(job.error().is_none());
    }
    assert_eq!(queue.next_waiting(), Some(0));
    assert!(!queue.is_idle());
}

#[test]
fn start_then_success_records_output_and_pins_progress() {
    init_logging();
    let mut queue = queue_of(1);
    queue.start(0).unwrap();
    assert_eq!(queue.jobs()[0].status(), JobStatus::Downloading);
    assert_eq!(queue.downloading(), Some(0));

    queue.set_progress(0, 0.4);
    queue
        .resolve_success(0, PathBuf::from("/tmp/video_101.mp4"))
        .unwrap();

    let job = &queue.jobs()[0];
    assert_eq!(job.status(), JobStatus::Success);
    assert_eq!(job.progress(), 1.0);
    assert_eq!(job.output_path(), Some(PathBuf::from("/tmp/video_101.mp4").as_path()));
    assert!(job.error().is_none());
    assert!(queue.is_idle());
}

#[test]
fn failure_records_message_and_clears_output() {
    init_logging();
    let mut queue = queue_of(1);
    queue.start(0).unwrap();
    queue.resolve_failure(0, "extractor exited with 1".to_string()).unwrap();

    let job = &queue.jobs()[0];
    assert_eq!(job.status(), JobStatus::Failed);
    assert_eq!(job.error(), Some("extractor exited with 1"));
    assert!(job.output_path().is_none());
}

#[test]
fn starting_a_non_waiting_job_is_a_contract_violation() {
    init_logging();
    let mut queue = queue_of(1);
    queue.start(0).unwrap();
    queue.resolve_success(0, PathBuf::from("a.mp4")).unwrap();

    assert_eq!(
        queue.start(0),
        Err(QueueError::IllegalTransition {
            index: 0,
            expected: JobStatus::Waiting,
            actual: JobStatus::Success,
        })
    );
}

#[test]
fn second_start_while_one_is_in_flight_is_rejected() {
    init_logging();
    let mut queue = queue_of(2);
    queue.start(0).unwrap();
    assert_eq!(
        queue.start(1),
        Err(QueueError::AlreadyDownloading { other: 0 })
    );
}

#[test]
fn resolving_a_job_that_is_not_downloading_errors() {
    init_logging();
    let mut queue = queue_of(1);
    assert_eq!(
        queue.resolve_success(0, PathBuf::from("a.mp4")),
        Err(QueueError::IllegalTransition {
            index: 0,
            expected: JobStatus::Downloading,
            actual: JobStatus::Waiting,
        })
    );
    assert_eq!(
        queue.resolve_failure(5, "boom".to_string()),
        Err(QueueError::BadIndex(5))
    );
}

#[test]
fn progress_is_clamped_monotonic_and_ignored_when_not_downloading() {
    init_logging();
    let mut queue = queue_of(1);

    // Not downloading yet: ignored.
    queue.set_progress(0, 0.5);
    assert_eq!(queue.jobs()[0].progress(), 0.0);

    queue.start(0).unwrap();
    queue.set_progress(0, 0.6);
    queue.set_progress(0, 0.3); // regression ignored
    assert_eq!(queue.jobs()[0].progress(), 0.6);

    queue.set_progress(0, 7.0); // clamped
    assert_eq!(queue.jobs()[0].progress(), 1.0);

    queue.resolve_failure(0, "boom".to_string()).unwrap();
    // Late callback after resolution: ignored.
    queue.set_progress(0, 0.1);
    assert_eq!(queue.jobs()[0].progress(), 1.0);
}

#[test]
fn retry_resets_a_failed_job_in_place() {
    init_logging();
    let mut queue = queue_of(3);
    queue.start(0).unwrap();
    queue.resolve_success(0, PathBuf::from("video_100.mp4")).unwrap();
    queue.start(1).unwrap();
    queue.resolve_failure(1, "network".to_string()).unwrap();

    queue.retry(1).unwrap();
    let job = &queue.jobs()[1];
    assert_eq!(job.status(), JobStatus::Waiting);
    assert_eq!(job.progress(), 0.0);
    assert!(job.output_path().is_none());
    assert!(job.error().is_none());

    // The retried job sits at its original index, ahead of job 2.
    assert_eq!(queue.next_waiting(), Some(1));
}

#[test]
fn retry_is_only_legal_from_failed() {
    init_logging();
    let mut queue = queue_of(1);
    assert_eq!(
        queue.retry(0),
        Err(QueueError::IllegalTransition {
            index: 0,
            expected: JobStatus::Failed,
            actual: JobStatus::Waiting,
        })
    );
}

#[test]
fn tally_counts_every_status() {
    init_logging();
    let mut queue = queue_of(3);
    queue.start(0).unwrap();
    queue.resolve_failure(0, "gone".to_string()).unwrap();
    queue.start(1).unwrap();

    let tally = queue.tally();
    assert_eq!(tally.waiting, 1);
    assert_eq!(tally.downloading, 1);
    assert_eq!(tally.succeeded, 0);
    assert_eq!(tally.failed, 1);
    assert_eq!(tally.total(), 3);
}
