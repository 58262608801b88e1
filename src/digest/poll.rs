//! Timer-mode scheduler.
//!
//! For environments without threads: a zero-delay repeating tick on the main
//! loop performs one feed step and one digest step per round, then detaches
//! itself once no work remains. Backends must be non-blocking here; a
//! would-block result simply leaves the work for the next tick.
//!
//! Callbacks fire inline from the tick, which already runs on the loop
//! thread, so no dispatch queue is involved.

use std::sync::Arc;

use crate::backend::DigestBackend;
use crate::digest::state::{Inner, Scheduler, State};
use crate::error::DigestError;

/// Attaches the polling tick on first use. Runs under the state lock the
/// submitter already holds.
pub(crate) fn start<B: DigestBackend + Send + 'static>(
    inner: &Arc<Inner<B>>,
    state: &mut State,
) -> Result<(), DigestError> {
    if matches!(state.scheduler, Scheduler::Poll) {
        return Ok(());
    }
    state.scheduler = Scheduler::Poll;

    let tick_inner = Arc::clone(inner);
    inner.main_loop().add_timer(Box::new(move || tick(&tick_inner)));
    Ok(())
}

/// One polling round. Returns whether the tick stays attached.
fn tick<B: DigestBackend + Send + 'static>(inner: &Arc<Inner<B>>) -> bool {
    // Teardown after deletion is posted by the handle's drop; the tick just
    // detaches without touching the queues.
    if inner.is_deleted() {
        inner.lock_state().scheduler = Scheduler::Idle;
        return false;
    }

    if inner.has_pending_feed() {
        inner.feed_step();
    }
    if inner.has_digest() {
        inner.digest_step();
    }

    let again = inner.has_pending_feed() || inner.has_digest();
    if !again {
        // Detach; the next feed re-arms the timer.
        inner.lock_state().scheduler = Scheduler::Idle;
    }
    again
}
