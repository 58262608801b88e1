//! Shared handle state and the two driver state machines.
//!
//! `Inner` is the refcounted core behind a [`MessageDigest`] handle. It is
//! shared by the public handle, the active scheduler, and any completion
//! tasks queued on the main loop. Three locks partition the state:
//!
//! - the state lock: pending-feed queue, in-flight byte count, dispatch
//!   queue, scheduler bookkeeping;
//! - the backend lock: serializes backend calls against `with_backend`
//!   accessors; backend calls may block, so they never run under the state
//!   lock;
//! - the events lock: the user callbacks, only ever taken on the loop
//!   thread.
//!
//! [`MessageDigest`]: crate::MessageDigest

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::backend::{is_retryable, DigestBackend};
use crate::config::{DigestConfig, SchedulerMode};
use crate::digest::worker::Command;
use crate::digest::{poll, worker, DigestEvents};
use crate::error::DigestError;
use crate::mainloop::MainLoop;

/// One queued input blob and its consumption progress.
pub(crate) struct PendingFeed {
    pub(crate) blob: Bytes,
    pub(crate) offset: usize,
    pub(crate) is_last: bool,
}

/// A completed unit awaiting main-loop delivery (worker mode only).
pub(crate) enum Dispatch {
    Feed(Bytes),
    Digest(Bytes),
}

/// Digest output being drained from the backend.
struct DigestRecv {
    buf: Vec<u8>,
    offset: usize,
}

/// Which scheduler resource, if any, is attached.
pub(crate) enum Scheduler {
    /// No resource yet; the first feed starts one.
    Idle,
    /// Worker thread running, reachable through its command channel.
    Worker(Sender<Command>),
    /// Polling tick attached to the main loop.
    Poll,
}

/// Lockable portion of the handle state.
pub(crate) struct State {
    pub(crate) pending_feed: VecDeque<PendingFeed>,
    pub(crate) accumulated_tx: usize,
    pub(crate) finished: bool,
    pub(crate) scheduler: Scheduler,
    digest: Option<DigestRecv>,
    dispatch: Vec<Dispatch>,
}

/// The shared core of a digest handle.
pub(crate) struct Inner<B> {
    state: Mutex<State>,
    backend: Mutex<B>,
    events: Mutex<DigestEvents>,
    deleted: AtomicBool,
    digest_size: usize,
    config: DigestConfig,
    main_loop: Arc<dyn MainLoop>,
}

fn same_blob(a: &Bytes, b: &Bytes) -> bool {
    a.as_ptr() == b.as_ptr() && a.len() == b.len()
}

impl<B: DigestBackend> Inner<B> {
    pub(crate) fn new(
        backend: B,
        config: DigestConfig,
        events: DigestEvents,
        main_loop: Arc<dyn MainLoop>,
    ) -> Result<Arc<Self>, DigestError> {
        config.validate()?;
        let digest_size = backend.digest_size();
        if digest_size == 0 {
            return Err(DigestError::InvalidArgument {
                message: "backend digest size must be non-zero",
            });
        }

        debug!(
            algorithm = %config.algorithm(),
            digest_size,
            scheduler = ?config.scheduler(),
            "new digest handle"
        );

        Ok(Arc::new(Self {
            state: Mutex::new(State {
                pending_feed: VecDeque::new(),
                accumulated_tx: 0,
                finished: false,
                scheduler: Scheduler::Idle,
                digest: None,
                dispatch: Vec::new(),
            }),
            backend: Mutex::new(backend),
            events: Mutex::new(events),
            deleted: AtomicBool::new(false),
            digest_size,
            config,
            main_loop,
        }))
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_backend(&self) -> MutexGuard<'_, B> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_events(&self) -> MutexGuard<'_, DigestEvents> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn config(&self) -> &DigestConfig {
        &self.config
    }

    pub(crate) fn digest_size(&self) -> usize {
        self.digest_size
    }

    pub(crate) fn main_loop(&self) -> &Arc<dyn MainLoop> {
        &self.main_loop
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }

    pub(crate) fn has_pending_feed(&self) -> bool {
        !self.lock_state().pending_feed.is_empty()
    }

    pub(crate) fn has_digest(&self) -> bool {
        self.lock_state().digest.is_some()
    }

    /// Identity of the head blob, for the worker's yield check.
    pub(crate) fn peek_head_blob(&self) -> Option<Bytes> {
        self.lock_state().pending_feed.front().map(|pf| pf.blob.clone())
    }
}

impl<B: DigestBackend + Send + 'static> Inner<B> {
    /// Validates, enqueues, and kicks the scheduler for one submission.
    pub(crate) fn submit(self: &Arc<Self>, blob: Bytes, is_last: bool) -> Result<(), DigestError> {
        let mut state = self.lock_state();

        if state.finished {
            return Err(DigestError::InvalidArgument {
                message: "stream already finished by an is_last feed",
            });
        }

        let total = state
            .accumulated_tx
            .checked_add(blob.len())
            .ok_or(DigestError::Overflow)?;

        // Exclusive bound: reaching the ceiling is already a rejection.
        let ceiling = self.config.feed_size();
        if ceiling != 0 && total >= ceiling {
            return Err(DigestError::NoSpace {
                requested: total,
                ceiling,
            });
        }

        state.pending_feed.push_back(PendingFeed {
            blob: blob.clone(),
            offset: 0,
            is_last,
        });
        state.accumulated_tx = total;
        if is_last {
            state.finished = true;
        }

        // Append and scheduler start share one critical section, so a
        // failed start unwinds exactly the entry it appended; a concurrent
        // feed cannot slip its own entry onto the tail in between.
        if let Err(e) = self.start_scheduler(&mut state) {
            state.pending_feed.pop_back();
            state.accumulated_tx -= blob.len();
            if is_last {
                state.finished = false;
            }
            return Err(e);
        }
        drop(state);

        debug!(
            algorithm = %self.config.algorithm(),
            bytes = blob.len(),
            is_last,
            "blob queued"
        );
        Ok(())
    }

    fn start_scheduler(self: &Arc<Self>, state: &mut State) -> Result<(), DigestError> {
        match self.config.scheduler() {
            SchedulerMode::Worker => worker::start(self, state),
            SchedulerMode::Poll => poll::start(self, state),
        }
    }

    /// One feed-driver step: slice the head entry, offer it to the backend,
    /// account for whatever was accepted.
    pub(crate) fn feed_step(self: &Arc<Self>) {
        let (blob, offset, mut is_last) = {
            let state = self.lock_state();
            match state.pending_feed.front() {
                Some(pf) => (pf.blob.clone(), pf.offset, pf.is_last),
                None => return,
            }
        };

        let mut len = blob.len() - offset;
        if let Some(max) = self.config.effective_max_block_size() {
            if len > max {
                len = max;
                // The real marker is re-issued on the final slice.
                is_last = false;
            }
        }

        // Backend calls may block; the state lock is not held across them.
        let result = {
            let mut backend = self.lock_backend();
            backend.feed(&blob[offset..offset + len], is_last)
        };

        let n = match result {
            Ok(n) => n,
            Err(e) => {
                if !is_retryable(&e) {
                    warn!(
                        algorithm = %self.config.algorithm(),
                        len,
                        error = %e,
                        "backend feed failed, will retry"
                    );
                }
                return;
            }
        };

        if offset + n < blob.len() {
            // Partially accepted. Re-fetch the head entry: submissions
            // append under the same lock and may have relocated the queue
            // storage since the snapshot.
            let mut state = self.lock_state();
            if let Some(pf) = state.pending_feed.front_mut() {
                pf.offset += n;
                state.accumulated_tx -= n;
            }
            return;
        }

        // Fully consumed. A true is_last here means the final slice of the
        // final blob: the digest becomes receivable.
        if is_last {
            self.setup_receive_digest();
        }

        let input = {
            let mut state = self.lock_state();
            state.accumulated_tx -= n;
            state.pending_feed.pop_front().map(|pf| pf.blob)
        };

        if let Some(input) = input {
            debug!(
                algorithm = %self.config.algorithm(),
                bytes = input.len(),
                "blob fully fed"
            );
            self.report_feed_blob(input);
        }
    }

    /// Allocates the output buffer, exactly once.
    fn setup_receive_digest(&self) {
        let mut state = self.lock_state();
        if state.digest.is_some() {
            warn!(
                algorithm = %self.config.algorithm(),
                "digest buffer already allocated"
            );
            return;
        }
        state.digest = Some(DigestRecv {
            buf: vec![0u8; self.digest_size],
            offset: 0,
        });
        debug!(
            algorithm = %self.config.algorithm(),
            size = self.digest_size,
            "receiving digest"
        );
    }

    /// One digest-receiver step: drain the backend into the output buffer.
    pub(crate) fn digest_step(self: &Arc<Self>) {
        let mut recv = {
            let mut state = self.lock_state();
            match state.digest.take() {
                Some(recv) => recv,
                None => return,
            }
        };

        let result = {
            let mut backend = self.lock_backend();
            backend.read_digest(&mut recv.buf[recv.offset..])
        };

        match result {
            Ok(n) => {
                recv.offset += n;
                if recv.offset < recv.buf.len() {
                    self.lock_state().digest = Some(recv);
                    return;
                }
                debug!(
                    algorithm = %self.config.algorithm(),
                    size = recv.buf.len(),
                    "digest complete"
                );
                self.report_digest_ready(Bytes::from(recv.buf));
            }
            Err(e) => {
                if !is_retryable(&e) {
                    warn!(
                        algorithm = %self.config.algorithm(),
                        error = %e,
                        "backend digest read failed, will retry"
                    );
                }
                self.lock_state().digest = Some(recv);
            }
        }
    }

    /// Reports a fully consumed input blob to the caller.
    fn report_feed_blob(self: &Arc<Self>, input: Bytes) {
        match self.config.scheduler() {
            SchedulerMode::Worker => {
                self.lock_state().dispatch.push(Dispatch::Feed(input));
                self.signal_feedback();
            }
            SchedulerMode::Poll => {
                // The polling tick already runs on the loop thread.
                let mut events = self.lock_events();
                if let Some(cb) = events.on_feed_done.as_mut() {
                    cb(input, Ok(()));
                }
            }
        }
    }

    /// Reports the finished digest to the caller.
    fn report_digest_ready(self: &Arc<Self>, digest: Bytes) {
        match self.config.scheduler() {
            SchedulerMode::Worker => {
                self.lock_state().dispatch.push(Dispatch::Digest(digest));
                self.signal_feedback();
            }
            SchedulerMode::Poll => {
                let mut events = self.lock_events();
                (events.on_digest_ready)(digest);
            }
        }
    }

    fn signal_feedback(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.main_loop.invoke(Box::new(move || inner.feedback()));
    }

    /// Main-loop side of the worker handoff: drains the dispatch queue in
    /// order. A deleted handle still releases the blobs, silently.
    pub(crate) fn feedback(&self) {
        let batch = std::mem::take(&mut self.lock_state().dispatch);
        if batch.is_empty() {
            return;
        }
        let deleted = self.is_deleted();
        let mut events = self.lock_events();
        for entry in batch {
            match entry {
                Dispatch::Feed(blob) => {
                    if !deleted {
                        if let Some(cb) = events.on_feed_done.as_mut() {
                            cb(blob, Ok(()));
                        }
                    }
                }
                Dispatch::Digest(digest) => {
                    if !deleted {
                        (events.on_digest_ready)(digest);
                    }
                }
            }
        }
    }

    /// Final drain after deletion: still-pending feeds surface as canceled;
    /// an undelivered digest is dropped.
    ///
    /// The dispatch queue needs no draining here. The worker posts its
    /// teardown task strictly after every feedback task it signaled, and
    /// main-loop tasks run in submission order, so feedback has already
    /// emptied the queue by the time this runs; poll mode never fills it.
    pub(crate) fn teardown(&self) {
        let (pending, _digest) = {
            let mut state = self.lock_state();
            (
                std::mem::take(&mut state.pending_feed),
                state.digest.take(),
            )
        };

        debug!(
            algorithm = %self.config.algorithm(),
            pending = pending.len(),
            "tearing down digest handle"
        );

        let mut events = self.lock_events();
        for pf in pending {
            if let Some(cb) = events.on_feed_done.as_mut() {
                cb(pf.blob, Err(DigestError::Canceled));
            }
        }
    }

    /// Worker iterate body: drain the head blob until its identity changes,
    /// then drain the digest. Returning yields back to the command channel;
    /// one queued wakeup per submitted feed guarantees progress.
    pub(crate) fn drive(self: &Arc<Self>) {
        if let Some(current) = self.peek_head_blob() {
            while !self.is_deleted() {
                self.feed_step();
                match self.peek_head_blob() {
                    Some(head) if same_blob(&head, &current) => continue,
                    _ => break,
                }
            }
        }

        while self.has_digest() && !self.is_deleted() {
            self.digest_step();
        }
    }
}
