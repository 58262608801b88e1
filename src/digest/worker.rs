//! Thread-mode scheduler.
//!
//! One worker thread per handle, created lazily on the first feed. The
//! application thread talks to it through a command channel: `Advance` after
//! every submission, `Cancel` when the handle is dropped. The worker blocks
//! on the channel between drives, so an idle handle costs nothing.
//!
//! Backend calls run on this thread and may block arbitrarily long.
//! Completions never fire here; they hop to the main loop through the
//! dispatch queue.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::backend::DigestBackend;
use crate::digest::state::{Inner, Scheduler, State};
use crate::error::DigestError;

/// Command sent to the worker thread.
pub(crate) enum Command {
    /// New work was queued; drive the state machines.
    Advance,
    /// The handle was dropped; exit and post teardown.
    Cancel,
}

/// Starts the worker on first use, or wakes it. Runs under the state lock
/// the submitter already holds, so a failed spawn unwinds atomically.
pub(crate) fn start<B: DigestBackend + Send + 'static>(
    inner: &Arc<Inner<B>>,
    state: &mut State,
) -> Result<(), DigestError> {
    if let Scheduler::Worker(tx) = &state.scheduler {
        // Wakeups coalesce: the drive loop re-checks the queue, a lost one
        // is harmless as long as each append is followed by at least one.
        let _ = tx.send(Command::Advance);
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let thread_inner = Arc::clone(inner);
    thread::Builder::new()
        .name(format!("digest-{}", inner.config().algorithm()))
        .spawn(move || run(thread_inner, rx))
        .map_err(DigestError::Scheduler)?;

    let _ = tx.send(Command::Advance);
    state.scheduler = Scheduler::Worker(tx);
    Ok(())
}

/// Worker main: await a command, drive, repeat until canceled.
fn run<B: DigestBackend + Send + 'static>(inner: Arc<Inner<B>>, rx: Receiver<Command>) {
    loop {
        match rx.recv() {
            Ok(Command::Advance) => {}
            Ok(Command::Cancel) | Err(_) => break,
        }
        inner.drive();
    }

    debug!(algorithm = %inner.config().algorithm(), "digest worker exiting");

    // The finished hop: teardown runs on the main loop, like every other
    // caller-visible effect.
    let teardown_inner = Arc::clone(&inner);
    inner
        .main_loop()
        .invoke(Box::new(move || teardown_inner.teardown()));
}
