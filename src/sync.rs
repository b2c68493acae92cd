//! The four-phase semaphore handshake between the controller thread and
//! the persistent search worker thread: `wakeup`, `run-ack`, `stop-ack`,
//! `finished-ack`. Generalizes the teacher's spawn-per-search
//! `StopFlag`/`DeadlineTimer` pair into a long-lived worker, matching
//! `original_source/src/semaphore.cpp`'s counting-semaphore handshake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// A counting semaphore built on `parking_lot::{Mutex, Condvar}`: `signal`
/// increments the count and wakes one waiter, `wait` blocks until the
/// count is positive then consumes one unit.
struct Semaphore {
    count: Mutex<u32>,
    cv: Condvar,
}

impl Semaphore {
    fn new() -> Self {
        Semaphore {
            count: Mutex::new(0),
            cv: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cv.notify_one();
    }

    fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.cv.wait(&mut count);
        }
        *count -= 1;
    }
}

/// Shared handshake state between a `SearchController` and its worker
/// thread. `abort` is the cooperative cancellation flag checked at every
/// search node.
pub struct Handshake {
    wakeup: Semaphore,
    run_ack: Semaphore,
    stop_ack: Semaphore,
    finished_ack: Semaphore,
    /// Guards the "is a search winding down right now" transition so a
    /// controller `stop()` and the worker's own natural-completion path
    /// can't race: whichever side takes this lock first decides whether
    /// `stop-ack` needs to be signalled at all.
    transition: Mutex<()>,
    pub abort: AtomicBool,
    /// Set by the worker immediately after waking, cleared (under
    /// `transition`) once it has wound back down to idle.
    pub running: AtomicBool,
    /// Set by the timer thread on timeout when time management is
    /// active; the worker treats this the same as a controller-issued
    /// `stop()`.
    pub timer_stopped: AtomicBool,
}

impl Handshake {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Handshake {
            wakeup: Semaphore::new(),
            run_ack: Semaphore::new(),
            stop_ack: Semaphore::new(),
            finished_ack: Semaphore::new(),
            transition: Mutex::new(()),
            abort: AtomicBool::new(false),
            running: AtomicBool::new(false),
            timer_stopped: AtomicBool::new(false),
        })
    }

    // ---- controller side ----------------------------------------------

    /// Releases `wakeup` then blocks on `run-ack`, so the caller only
    /// returns once the worker has actually begun iterating.
    pub fn start(&self) {
        self.abort.store(false, Ordering::SeqCst);
        self.timer_stopped.store(false, Ordering::SeqCst);
        self.wakeup.signal();
        self.run_ack.wait();
    }

    /// Sets `abort` and, only if the worker is still actively searching,
    /// blocks on `stop-ack`. If the worker has already wound down to idle
    /// (the search finished naturally before `stop()` was called) this
    /// returns immediately — there is nothing left to stop.
    pub fn stop(&self) {
        let guard = self.transition.lock();
        if self.running.load(Ordering::SeqCst) {
            self.abort.store(true, Ordering::SeqCst);
            drop(guard);
            self.stop_ack.wait();
        } else {
            self.abort.store(true, Ordering::SeqCst);
        }
    }

    pub fn wait_for_finished(&self) {
        self.finished_ack.wait();
    }

    /// Releases `wakeup` one final time so a worker blocked waiting for
    /// the next search wakes up and observes shutdown.
    pub fn release_wakeup_for_shutdown(&self) {
        self.wakeup.signal();
    }

    // ---- worker side -----------------------------------------------------

    pub fn worker_wait_for_wakeup(&self) {
        self.wakeup.wait();
    }

    pub fn worker_signal_running(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.run_ack.signal();
    }

    /// Called exactly once by the worker after a search (whether it ran
    /// to completion or was aborted) has fully unwound. Atomically
    /// decides, under `transition`, whether a `stop()` call is currently
    /// waiting on `stop-ack` and therefore needs signalling, then always
    /// signals `finished-ack`.
    pub fn worker_finish(&self) {
        let _guard = self.transition.lock();
        let was_stopped = self.abort.load(Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        if was_stopped {
            self.stop_ack.signal();
        }
        self.finished_ack.signal();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }
}
