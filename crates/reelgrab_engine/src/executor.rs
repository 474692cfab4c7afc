use std::sync::{Arc, Mutex, MutexGuard};

use grab_logging::{grab_error, grab_info, grab_warn};
use reelgrab_core::{BatchTally, JobIndex, Queue};

use crate::fetch::{Fetcher, ProgressSink};

/// The queue is the only shared mutable state between the executor and the
/// presentation layer. Locks are held for state mutation only, never across
/// a fetch await.
pub type SharedQueue = Arc<Mutex<Queue>>;

pub fn shared_queue(queue: Queue) -> SharedQueue {
    Arc::new(Mutex::new(queue))
}

fn lock(queue: &SharedQueue) -> MutexGuard<'_, Queue> {
    // A poisoning panic cannot leave the queue in an illegal state; every
    // transition is applied atomically under the lock.
    match queue.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Progress reporter bound to one job: writes each reported fraction into
/// that job's record and nothing else.
pub struct QueueProgress {
    queue: SharedQueue,
    index: JobIndex,
}

impl QueueProgress {
    pub fn new(queue: SharedQueue, index: JobIndex) -> Self {
        Self { queue, index }
    }
}

impl ProgressSink for QueueProgress {
    fn report(&self, fraction: f64) {
        lock(&self.queue).set_progress(self.index, fraction);
    }
}

/// Runs one unit of work: picks the lowest-index `Waiting` job, resolves it
/// fully through the fetcher, and returns its index. Returns `None` when no
/// `Waiting` job exists — the batch is complete and the caller may stop
/// polling. Any fetcher error is contained here as the job's `Failed` state;
/// nothing escapes the job boundary.
pub async fn run_next(queue: &SharedQueue, fetcher: &dyn Fetcher) -> Option<JobIndex> {
    let (index, url) = {
        let mut guard = lock(queue);
        let index = guard.next_waiting()?;
        if let Err(err) = guard.start(index) {
            grab_error!("refusing to start job {}: {}", index, err);
            return None;
        }
        (index, guard.jobs()[index].url().to_string())
    };

    grab_info!("job {} downloading {}", index, url);
    let reporter = QueueProgress::new(queue.clone(), index);
    let result = fetcher.fetch(&url, &reporter).await;

    let mut guard = lock(queue);
    let applied = match result {
        Ok(outcome) => {
            grab_info!("job {} saved {}", index, outcome.output_path.display());
            guard.resolve_success(index, outcome.output_path)
        }
        Err(err) => {
            grab_warn!("job {} failed: {}", index, err);
            guard.resolve_failure(index, err.to_string())
        }
    };
    if let Err(err) = applied {
        grab_error!("could not resolve job {}: {}", index, err);
    }
    Some(index)
}

/// Cooperative loop in one call: awaits `run_next` until the queue is idle
/// and returns the final tally. Jobs still resolve strictly one at a time,
/// in queue order.
pub async fn drain(queue: &SharedQueue, fetcher: &dyn Fetcher) -> BatchTally {
    while run_next(queue, fetcher).await.is_some() {}
    lock(queue).tally()
}

pub(crate) fn with_queue<T>(queue: &SharedQueue, f: impl FnOnce(&mut Queue) -> T) -> T {
    f(&mut lock(queue))
}
