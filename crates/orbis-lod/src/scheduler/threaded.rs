//! Worker-pool scheduler backed by crossbeam channels.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use super::{BuildCompletion, BuildScheduler};
use crate::{BuildTask, LodError};

/// Fixed pool of build workers.
///
/// Tasks go out on an unbounded channel; completions come back on a
/// bounded one, so workers stall instead of piling up results when the
/// owner stops draining. A worker that hits a generator panic reports it as
/// a faulted completion and keeps serving.
pub struct ThreadedScheduler {
    task_sender: Option<Sender<BuildTask>>,
    completion_receiver: Option<Receiver<BuildCompletion>>,
    worker_handles: Vec<JoinHandle<()>>,
    pending: usize,
}

impl ThreadedScheduler {
    /// Spawn `worker_count` workers (at least one) posting into a
    /// completion channel of `completion_capacity` entries.
    pub fn new(worker_count: usize, completion_capacity: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<BuildTask>();
        let (done_tx, done_rx) = crossbeam_channel::bounded(completion_capacity.max(1));

        let mut handles = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let rx = task_rx.clone();
            let tx = done_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("patch-build-{i}"))
                .spawn(move || {
                    while let Ok(task) = rx.recv() {
                        let completion = task.run();
                        if let Err(fault) = &completion.outcome {
                            tracing::error!(node = ?completion.node, %fault, "patch build panicked");
                        }
                        if tx.send(completion).is_err() {
                            break;
                        }
                    }
                })
                .expect("failed to spawn patch build worker");
            handles.push(handle);
        }

        tracing::info!(workers = worker_count, completion_capacity, "build scheduler started");

        Self {
            task_sender: Some(task_tx),
            completion_receiver: Some(done_rx),
            worker_handles: handles,
            pending: 0,
        }
    }

    /// One worker per core, leaving two for the main and render threads.
    pub fn with_defaults(completion_capacity: usize) -> Self {
        let workers = num_cpus::get().saturating_sub(2).max(1);
        Self::new(workers, completion_capacity)
    }

    /// Number of worker threads still attached.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_handles.len()
    }

    /// Stop the workers and wait for them to exit.
    ///
    /// Completions not yet drained are dropped. Each worker finishes at
    /// most one more build from the queue; its result is discarded.
    pub fn shutdown(&mut self) {
        self.task_sender.take();
        // Dropping the receiver unblocks workers stuck on a full channel.
        self.completion_receiver.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
        self.pending = 0;
    }
}

impl BuildScheduler for ThreadedScheduler {
    fn queue_work(&mut self, task: BuildTask) -> Result<(), LodError> {
        let sender = self.task_sender.as_ref().ok_or(LodError::SchedulerClosed)?;
        sender.send(task).map_err(|_| LodError::SchedulerClosed)?;
        self.pending += 1;
        Ok(())
    }

    fn drain_completions(&mut self) -> Vec<BuildCompletion> {
        let Some(receiver) = &self.completion_receiver else {
            return Vec::new();
        };
        let completions: Vec<_> = receiver.try_iter().collect();
        self.pending = self.pending.saturating_sub(completions.len());
        completions
    }

    fn pending_count(&self) -> usize {
        self.pending
    }
}

impl Drop for ThreadedScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
