//! Main-loop integration.
//!
//! The engine never runs user callbacks on its worker thread. Completions
//! hop back to the host application's main loop, which this module models:
//!
//! - [`MainLoop`] - The interface the engine consumes
//! - [`EventPump`] - A minimal, dependency-free implementation of it
//!
//! Hosts with a real event loop implement [`MainLoop`] over it; everyone
//! else pumps an [`EventPump`] from the thread that should observe
//! callbacks.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use digestrs::EventPump;
//!
//! let pump = EventPump::new();
//! pump.invoke_fn(|| println!("runs on the pumping thread"));
//! pump.run_until(|| false, Duration::from_millis(10));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A one-shot callback posted to the loop from any thread.
pub type Task = Box<dyn FnOnce() + Send>;

/// A repeating zero-delay tick; detached when it returns `false`.
pub type TimerTick = Box<dyn FnMut() -> bool + Send>;

/// The main-loop interface the engine consumes.
///
/// Two primitives cover both scheduler modes: `invoke` is the worker-thread
/// feedback hop (queue a task from any thread, run it on the loop thread),
/// and `add_timer` registers the polling scheduler's zero-delay repeating
/// tick.
///
/// The "loop thread" is whatever thread actually drives the implementation;
/// all digest callbacks fire there, in submission order.
pub trait MainLoop: Send + Sync {
    /// Queues `task` to run on the loop thread. Callable from any thread.
    ///
    /// Tasks run in the order they were queued. The engine relies on this:
    /// completion batches and the final teardown are posted as separate
    /// tasks and must be observed in that order.
    fn invoke(&self, task: Task);

    /// Registers a repeating tick, run once per loop iteration with no
    /// delay, until it returns `false`.
    fn add_timer(&self, tick: TimerTick);
}

/// Queue state shared between producers and the pumping thread.
struct PumpState {
    tasks: VecDeque<Task>,
    timers: Vec<TimerTick>,
}

/// A minimal [`MainLoop`]: a task queue plus repeating timers, driven by
/// whichever thread calls [`dispatch`](EventPump::dispatch).
///
/// Tasks run in FIFO order. Timers run one round per dispatch, after the
/// task queue drains; a timer returning `false` is detached. There is no
/// delayed scheduling - the engine only needs zero-delay repetition.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
/// use digestrs::EventPump;
///
/// let pump = EventPump::new();
/// let hits = Arc::new(AtomicUsize::new(0));
///
/// let h = Arc::clone(&hits);
/// pump.add_timer_fn(move || h.fetch_add(1, Ordering::SeqCst) < 2);
///
/// pump.run_until(|| hits.load(Ordering::SeqCst) >= 3, Duration::from_secs(1));
/// assert_eq!(hits.load(Ordering::SeqCst), 3);
/// ```
pub struct EventPump {
    shared: Mutex<PumpState>,
    wakeup: Condvar,
}

fn lock(m: &Mutex<PumpState>) -> MutexGuard<'_, PumpState> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventPump {
    /// Creates an empty pump.
    ///
    /// Returned as an `Arc` because the engine holds the loop as
    /// `Arc<dyn MainLoop>` and workers post to it from other threads.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            shared: Mutex::new(PumpState {
                tasks: VecDeque::new(),
                timers: Vec::new(),
            }),
            wakeup: Condvar::new(),
        })
    }

    /// Convenience: queue a closure without boxing at the call site.
    pub fn invoke_fn(&self, f: impl FnOnce() + Send + 'static) {
        self.invoke(Box::new(f));
    }

    /// Convenience: register a tick closure without boxing at the call site.
    pub fn add_timer_fn(&self, f: impl FnMut() -> bool + Send + 'static) {
        self.add_timer(Box::new(f));
    }

    /// Runs all queued tasks, then one round of timers.
    ///
    /// Returns `true` if work remains: tasks queued during this dispatch or
    /// timers still attached. No internal lock is held while a task or tick
    /// runs, so tasks may queue further work.
    pub fn dispatch(&self) -> bool {
        loop {
            let task = lock(&self.shared).tasks.pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }

        // One round of timers. Ticks may invoke tasks or add timers, so the
        // set is taken out for the duration of the round.
        let timers = std::mem::take(&mut lock(&self.shared).timers);
        let mut kept = Vec::with_capacity(timers.len());
        for mut tick in timers {
            if tick() {
                kept.push(tick);
            }
        }
        let mut state = lock(&self.shared);
        // Timers added during the round land behind the survivors.
        kept.append(&mut state.timers);
        state.timers = kept;

        !state.tasks.is_empty() || !state.timers.is_empty()
    }

    /// Pumps until `done()` returns `true` or `timeout` elapses.
    ///
    /// Blocks on the task queue when idle, so worker-thread completions wake
    /// the loop promptly. Returns whether `done()` was observed `true`.
    pub fn run_until(&self, mut done: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done() {
                return true;
            }
            let busy = self.dispatch();
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if !busy {
                // Idle: sleep until a producer posts, waking periodically to
                // re-check the caller's condition.
                let wait = (deadline - now).min(Duration::from_millis(10));
                let state = lock(&self.shared);
                if state.tasks.is_empty() && state.timers.is_empty() {
                    let _ = self.wakeup.wait_timeout(state, wait);
                }
            }
        }
    }
}

impl MainLoop for EventPump {
    fn invoke(&self, task: Task) {
        lock(&self.shared).tasks.push_back(task);
        self.wakeup.notify_one();
    }

    fn add_timer(&self, tick: TimerTick) {
        lock(&self.shared).timers.push(tick);
        self.wakeup.notify_one();
    }
}
