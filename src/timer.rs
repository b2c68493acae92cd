//! The on-demand timer thread: sleeps for the search's time budget and,
//! on timeout, sets the cooperative `abort` flag if time management is
//! active for this search.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::sync::Handshake;

struct CancelSignal {
    cancelled: Mutex<bool>,
    cv: Condvar,
}

/// A single-shot deadline timer spawned at the start of a time-managed
/// search and joined when the search ends, generalizing the teacher's
/// `DeadlineTimer` to report through the shared `Handshake` rather than a
/// bespoke stop flag.
pub struct DeadlineTimer {
    cancel: Arc<CancelSignal>,
    handle: Option<JoinHandle<()>>,
}

impl DeadlineTimer {
    /// Spawns a thread that waits up to `budget` for cancellation; if it
    /// times out first, it sets `handshake.timer_stopped` and, when
    /// `manage_time` is true, `handshake.abort`.
    #[must_use]
    pub fn spawn(budget: Duration, handshake: Arc<Handshake>, manage_time: bool) -> Self {
        let cancel = Arc::new(CancelSignal {
            cancelled: Mutex::new(false),
            cv: Condvar::new(),
        });
        let thread_cancel = cancel.clone();

        let handle = std::thread::spawn(move || {
            let mut guard = thread_cancel.cancelled.lock();
            if !*guard {
                let result = thread_cancel.cv.wait_for(&mut guard, budget);
                if result.timed_out() && !*guard {
                    handshake.timer_stopped.store(true, Ordering::SeqCst);
                    if manage_time {
                        handshake.abort.store(true, Ordering::SeqCst);
                    }
                }
            }
        });

        DeadlineTimer {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancels the timer (if it has not already fired) and joins its
    /// thread, mirroring `stop()` on the teacher's `DeadlineTimer`.
    pub fn stop(mut self) {
        {
            let mut guard = self.cancel.cancelled.lock();
            *guard = true;
            self.cancel.cv.notify_one();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            {
                let mut guard = self.cancel.cancelled.lock();
                *guard = true;
                self.cancel.cv.notify_one();
            }
            let _ = handle.join();
        }
    }
}
