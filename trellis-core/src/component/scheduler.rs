//! Instance-scoped job batching.
//!
//! Reactive re-runs targeting a component are not executed at notification
//! time. They are enqueued on the instance's [`JobQueue`] and coalesced by
//! effect id, then run together when the embedding runtime flushes the
//! instance. Two dependency changes landing between flushes therefore cost
//! one recomputation, not two.
//!
//! The queue has no opinion on when flushes happen; that is the embedding
//! runtime's (or a test's) call.

use std::collections::HashSet;
use std::mem;
use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::reactive::{Job, SchedulerFn};

use super::instance::ComponentHandle;

#[derive(Default)]
struct QueueState {
    jobs: Vec<Job>,
    queued: HashSet<u64>,
}

/// A coalescing queue of deferred reactive jobs.
pub struct JobQueue {
    state: Mutex<QueueState>,
}

impl JobQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Enqueue a job, coalescing repeats.
    ///
    /// Returns `false` if a job with the same id was already pending.
    pub fn enqueue(&self, job: Job) -> bool {
        let mut state = self.state.lock().expect("job queue lock poisoned");
        if !state.queued.insert(job.id()) {
            return false;
        }
        state.jobs.push(job);
        true
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.state.lock().expect("job queue lock poisoned").jobs.len()
    }

    /// Whether no jobs are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every pending job once, in enqueue order.
    ///
    /// Jobs enqueued while the flush is running land in a fresh batch and
    /// are drained before this returns.
    pub fn flush(&self) {
        loop {
            let batch = {
                let mut state = self.state.lock().expect("job queue lock poisoned");
                state.queued.clear();
                mem::take(&mut state.jobs)
            };

            if batch.is_empty() {
                return;
            }

            trace!(jobs = batch.len(), "flushing instance job queue");
            for job in batch {
                job.run();
            }
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a scheduler callback that batches onto `instance`'s job queue.
///
/// The callback holds the queue weakly, so a pending scheduler reference
/// never keeps a torn-down instance's queue alive. Jobs scheduled after
/// teardown are dropped.
pub fn instance_scheduler(instance: &ComponentHandle) -> SchedulerFn {
    let queue: Weak<JobQueue> = Arc::downgrade(instance.jobs());
    Arc::new(move |job| {
        if let Some(queue) = queue.upgrade() {
            queue.enqueue(job);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::instance::ComponentInstance;
    use crate::reactive::{Effect, Signal};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counting_job(id: u64, runs: Arc<AtomicI32>) -> Job {
        Job::new(
            id,
            Arc::new(move || {
                runs.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn enqueue_coalesces_by_id() {
        let queue = JobQueue::new();
        let runs = Arc::new(AtomicI32::new(0));

        assert!(queue.enqueue(counting_job(1, runs.clone())));
        assert!(!queue.enqueue(counting_job(1, runs.clone())));
        assert!(queue.enqueue(counting_job(2, runs.clone())));
        assert_eq!(queue.len(), 2);

        queue.flush();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn flush_runs_jobs_in_enqueue_order() {
        let queue = JobQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in [3u64, 1, 2] {
            let order = order.clone();
            queue.enqueue(Job::new(
                i,
                Arc::new(move || order.lock().unwrap().push(i)),
            ));
        }

        queue.flush();
        assert_eq!(*order.lock().unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn id_can_requeue_after_flush() {
        let queue = JobQueue::new();
        let runs = Arc::new(AtomicI32::new(0));

        queue.enqueue(counting_job(7, runs.clone()));
        queue.flush();

        assert!(queue.enqueue(counting_job(7, runs.clone())));
        queue.flush();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn flush_drains_jobs_enqueued_mid_flush() {
        let queue = Arc::new(JobQueue::new());
        let runs = Arc::new(AtomicI32::new(0));

        let queue_clone = queue.clone();
        let runs_clone = runs.clone();
        queue.enqueue(Job::new(
            1,
            Arc::new(move || {
                let runs = runs_clone.clone();
                queue_clone.enqueue(Job::new(
                    2,
                    Arc::new(move || {
                        runs.fetch_add(10, Ordering::SeqCst);
                    }),
                ));
                runs_clone.fetch_add(1, Ordering::SeqCst);
            }),
        ));

        queue.flush();
        assert_eq!(runs.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn instance_scheduler_batches_effect_reruns() {
        let instance = ComponentInstance::root();
        let signal = Signal::new(0);

        let signal_clone = signal.clone();
        let effect = Effect::with_scheduler(
            move || {
                let _ = signal_clone.get();
            },
            instance_scheduler(&instance),
        );

        assert_eq!(effect.run_count(), 1);

        signal.set(1);
        signal.set(2);
        assert_eq!(effect.run_count(), 1);
        assert_eq!(instance.jobs().len(), 1);

        instance.flush();
        assert_eq!(effect.run_count(), 2);
    }
}
