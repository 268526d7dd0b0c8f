use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::models::error::CaptureError;

/// How long a worker waits on the session lock before re-checking its run flag.
const LOCK_POLL: Duration = Duration::from_millis(5);

/// A named periodic background thread with a cooperative stop flag.
///
/// Cancelling joins the thread, so once `cancel` returns the worker will
/// never run its body again. Workers must only take the session lock via
/// [`lock_while_running`] so a cancel issued under that lock cannot deadlock.
pub(crate) struct Worker {
    name: &'static str,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    /// Spawn a thread that calls `tick` every `interval` until cancelled or
    /// until `tick` returns false.
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> Result<Self, CaptureError>
    where
        F: FnMut(&AtomicBool) -> bool + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                while flag.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    if !flag.load(Ordering::SeqCst) || !tick(&flag) {
                        break;
                    }
                }
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn {} thread: {}", name, e)))?;

        Ok(Self {
            name,
            running,
            handle: Some(handle),
        })
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Called from the worker's own thread (a timer tick that triggers an
    /// auto-stop), the thread is detached instead and exits on its next check.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            log::error!("{} thread panicked", self.name);
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lock `mutex` unless `running` is cleared first.
///
/// Returns `None` once the owning worker has been cancelled, even if the
/// lock became free at the same moment.
pub(crate) fn lock_while_running<'a, T>(
    mutex: &'a Mutex<T>,
    running: &AtomicBool,
) -> Option<MutexGuard<'a, T>> {
    loop {
        if !running.load(Ordering::SeqCst) {
            return None;
        }
        if let Some(guard) = mutex.try_lock_for(LOCK_POLL) {
            return running.load(Ordering::SeqCst).then_some(guard);
        }
    }
}
