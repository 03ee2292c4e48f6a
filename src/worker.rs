//! Background writer thread with explicit wake notification.
//!
//! One worker thread per [`RingWriter`]. The thread parks on a condition
//! variable and runs the drain callback once per wake-up; it never polls.
//! Notifications coalesce: any number of [`NotifyWorker::notify`] calls
//! before the thread wakes produce a single callback invocation, which is
//! correct because the callback drains the whole queue, not one entry.
//!
//! [`RingWriter`]: crate::RingWriter

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct WorkerState {
    notified: bool,
    terminate: bool,
}

#[derive(Debug, Default)]
struct WorkerShared {
    state: Mutex<WorkerState>,
    wakeup: Condvar,
}

/// A dedicated thread that runs a callback whenever it is notified.
///
/// The worker is one-shot: `spawn` starts it, `stop` joins it. Stopping a
/// worker whose callback is mid-execution waits for that callback to
/// finish. Pending notifications at stop time are not processed by the
/// thread; the owner performs its own final drain after the join.
pub(crate) struct NotifyWorker {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
}

impl NotifyWorker {
    /// Spawn the worker thread.
    ///
    /// `priority`, when set, requests `SCHED_FIFO` scheduling at the given
    /// priority for the new thread. This is best-effort: on failure (for
    /// example, missing privileges) a warning is logged and the thread
    /// keeps the default policy.
    pub fn spawn<F>(mut callback: F, priority: Option<i32>) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(WorkerShared::default());
        let thread_shared = Arc::clone(&shared);

        let handle = thread::spawn(move || {
            loop {
                {
                    let mut state = thread_shared.state.lock();
                    while !state.notified && !state.terminate {
                        thread_shared.wakeup.wait(&mut state);
                    }
                    if state.terminate {
                        break;
                    }
                    state.notified = false;
                }
                callback();
            }
            debug!("writer thread exiting");
        });

        if let Some(priority) = priority {
            set_realtime_priority(&handle, priority);
        }

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Wake the worker thread to process pending work.
    pub fn notify(&self) {
        let mut state = self.shared.state.lock();
        state.notified = true;
        self.shared.wakeup.notify_one();
    }

    /// Signal termination and join the thread.
    ///
    /// Blocks until any in-flight callback has returned. Idempotent; safe
    /// to call again after the thread has been joined.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            {
                let mut state = self.shared.state.lock();
                state.terminate = true;
                self.shared.wakeup.notify_one();
            }
            if handle.join().is_err() {
                warn!("writer thread panicked");
            }
        }
    }
}

impl Drop for NotifyWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn set_realtime_priority(handle: &JoinHandle<()>, priority: i32) {
    use std::os::unix::thread::JoinHandleExt;

    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: the pthread handle belongs to a thread we just spawned and
    // still own, and `param` lives across the call.
    let code = unsafe {
        libc::pthread_setschedparam(handle.as_pthread_t(), libc::SCHED_FIFO, &param)
    };
    if code == 0 {
        debug!(priority, "applied SCHED_FIFO priority to writer thread");
    } else {
        warn!(
            priority,
            code, "could not apply SCHED_FIFO priority; keeping default scheduling"
        );
    }
}

#[cfg(not(unix))]
fn set_realtime_priority(_handle: &JoinHandle<()>, priority: i32) {
    warn!(priority, "writer thread priority is not supported on this target");
}
