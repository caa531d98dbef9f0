//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs when its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately to establish its
//!    initial dependencies. The first run is always eager, even for
//!    scheduled effects.
//!
//! 2. When any dependency changes, the effect is notified. A plain effect
//!    re-runs on the spot; an effect created with a scheduler instead hands
//!    the scheduler a [`Job`] and lets it decide when to flush.
//!
//! 3. Before each run, the effect clears its old dependency edges and
//!    tracks fresh ones during execution, so conditional reads are handled
//!    correctly.
//!
//! # Scheduling
//!
//! The scheduler callback is the seam between the reactive substrate and
//! whatever batching policy the embedding runtime uses. The effect makes no
//! assumption beyond "the job eventually runs". Coalescing of repeated
//! notifications is the scheduler's job; the [`Job`] carries the effect id
//! so queues can deduplicate.
//!
//! # Disposal
//!
//! Dropping an Effect unregisters it from the runtime index; a disposed or
//! dropped effect never runs again, even if a job for it is still queued.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tracing::trace;

use super::context::TrackingScope;
use super::observer::{Observer, ObserverId};
use super::runtime::{ObserverHandle, Runtime};

/// A deferred effect re-run, handed to a scheduler callback.
///
/// The id is stable across re-runs of the same effect, so schedulers can
/// coalesce repeated notifications into a single run per flush.
#[derive(Clone)]
pub struct Job {
    id: u64,
    run: Arc<dyn Fn() + Send + Sync>,
}

impl Job {
    pub(crate) fn new(id: u64, run: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self { id, run }
    }

    /// The owning effect's id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Execute the deferred run.
    pub fn run(&self) {
        (self.run)();
    }
}

/// A scheduler callback: receives a job and decides when to run it.
pub type SchedulerFn = Arc<dyn Fn(Job) + Send + Sync>;

static EFFECT_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed) as u64
}

struct EffectInner {
    /// Unique identifier for this effect.
    id: u64,

    /// The observer ID used for dependency tracking.
    observer_id: ObserverId,

    /// The effect body.
    body: Box<dyn Fn() + Send + Sync>,

    /// Optional deferral seam; `None` means re-run synchronously on notify.
    scheduler: Option<SchedulerFn>,

    /// Back-reference for building jobs that re-run this effect.
    self_weak: Weak<EffectInner>,

    /// Whether the effect has been disposed.
    disposed: AtomicBool,

    /// Number of times the body has run.
    run_count: AtomicUsize,
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        Runtime::clear_dependencies(self.observer_id);

        let reads = {
            let _scope = TrackingScope::enter(self.observer_id);
            (self.body)();
            TrackingScope::reads()
        };

        for signal_id in reads {
            Runtime::add_dependency(signal_id, self.observer_id);
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    fn job(&self) -> Job {
        let weak = self.self_weak.clone();
        Job::new(
            self.id,
            Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.execute();
                }
            }),
        )
    }
}

impl Observer for EffectInner {
    fn id(&self) -> ObserverId {
        self.observer_id
    }

    fn notify(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        match &self.scheduler {
            Some(scheduler) => {
                trace!(effect = self.id, "deferring effect re-run to scheduler");
                scheduler(self.job());
            }
            None => self.execute(),
        }
    }
}

/// A side-effecting computation that re-runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let effect = Effect::new(move || {
///     println!("Count is: {}", count.get());
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
    _registration: ObserverHandle,
}

impl Effect {
    /// Create a new effect that re-runs synchronously on dependency change.
    ///
    /// The body runs immediately to establish initial dependencies.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(body, None)
    }

    /// Create a new effect whose re-runs are deferred through `scheduler`.
    ///
    /// The first run still happens eagerly, here, before this returns; only
    /// subsequent dependency-triggered runs go through the scheduler.
    pub fn with_scheduler<F>(body: F, scheduler: SchedulerFn) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(body, Some(scheduler))
    }

    fn build<F>(body: F, scheduler: Option<SchedulerFn>) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|self_weak| EffectInner {
            id: next_effect_id(),
            observer_id: ObserverId::new(),
            body: Box::new(body),
            scheduler,
            self_weak: self_weak.clone(),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let registration = Runtime::register(inner.clone());

        // Eager first run establishes the initial dependency set.
        inner.execute();

        Self {
            inner,
            _registration: registration,
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the observer ID used for dependency tracking.
    pub fn observer_id(&self) -> ObserverId {
        self.inner.observer_id
    }

    /// Re-run the effect body now, re-collecting dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Dispose of the effect. After disposal it will not run again.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
