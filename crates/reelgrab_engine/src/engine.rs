use std::sync::{mpsc, Arc};
use std::thread;

use grab_logging::grab_warn;
use reelgrab_core::{BatchViewModel, JobIndex, JobStatus, Queue};

use crate::executor::{run_next, shared_queue, with_queue, SharedQueue};
use crate::fetch::Fetcher;
use crate::types::EngineEvent;

enum EngineCommand {
    Submit { queue: Queue },
    RunBatch,
    Retry { index: JobIndex },
}

/// Worker-thread wrapper around the executor. Commands are processed
/// strictly one at a time on a single thread, so a submitted batch drains
/// one job after another — single-flight holds by construction. Events come
/// back over a channel polled with [`EngineHandle::try_recv`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    queue: SharedQueue,
}

impl EngineHandle {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let queue = shared_queue(Queue::default());
        let worker_queue = queue.clone();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                handle_command(&runtime, &worker_queue, fetcher.as_ref(), command, &event_tx);
            }
        });

        Self {
            cmd_tx,
            event_rx,
            queue,
        }
    }

    /// Replaces the queue with a freshly built batch. Refused (with a
    /// `BatchRejected` event) while a download is still in flight.
    pub fn submit(&self, queue: Queue) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { queue });
    }

    /// Drains every `Waiting` job in order, emitting `JobStarted` /
    /// `JobResolved` per job and `BatchIdle` at the end.
    pub fn run_batch(&self) {
        let _ = self.cmd_tx.send(EngineCommand::RunBatch);
    }

    /// Resets one `Failed` job back to `Waiting`. Follow with
    /// [`EngineHandle::run_batch`] to execute it.
    pub fn retry(&self, index: JobIndex) {
        let _ = self.cmd_tx.send(EngineCommand::Retry { index });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Snapshot of the shared queue for rendering one poll cycle.
    pub fn view(&self) -> BatchViewModel {
        with_queue(&self.queue, |queue| queue.view())
    }

    /// The shared queue itself, for callers that assemble archives or apply
    /// their own read-only inspection.
    pub fn queue(&self) -> SharedQueue {
        self.queue.clone()
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    queue: &SharedQueue,
    fetcher: &dyn Fetcher,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Submit { queue: next } => {
            let event = with_queue(queue, |current| {
                if let Some(index) = current.downloading() {
                    EngineEvent::BatchRejected { downloading: index }
                } else {
                    let jobs = next.len();
                    *current = next;
                    EngineEvent::BatchAccepted { jobs }
                }
            });
            let _ = event_tx.send(event);
        }
        EngineCommand::Retry { index } => {
            if let Err(err) = with_queue(queue, |q| q.retry(index)) {
                grab_warn!("retry rejected for job {}: {}", index, err);
            }
        }
        EngineCommand::RunBatch => runtime.block_on(async {
            loop {
                let upcoming = with_queue(queue, |q| {
                    q.next_waiting().map(|i| (i, q.jobs()[i].url().to_string()))
                });
                let Some((index, url)) = upcoming else {
                    let tally = with_queue(queue, |q| q.tally());
                    let _ = event_tx.send(EngineEvent::BatchIdle { tally });
                    break;
                };
                let _ = event_tx.send(EngineEvent::JobStarted { index, url });

                if run_next(queue, fetcher).await.is_some() {
                    let result = with_queue(queue, |q| {
                        let job = &q.jobs()[index];
                        match (job.status(), job.output_path()) {
                            (JobStatus::Success, Some(path)) => Ok(path.to_path_buf()),
                            _ => Err(job.error().unwrap_or("unresolved").to_string()),
                        }
                    });
                    let _ = event_tx.send(EngineEvent::JobResolved { index, result });
                }
            }
        }),
    }
}
