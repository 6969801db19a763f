//! Persistence scheduling.
//!
//! A space runs in one of two modes, chosen when it is opened:
//!
//! - **Immediate** (no interval): every mutation flushes before returning.
//! - **Debounced** (interval): mutations only raise the dirty flag; a
//!   background ticker flushes once per interval, and only if something
//!   changed since the last flush.
//!
//! The scheduler owns the dirty flag and the ticker thread. It never owns
//! the space itself: the ticker calls back through a flush closure.

use crate::error::DataSpaceResult;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Name given to ticker threads.
const TICKER_THREAD_NAME: &str = "dataspace-flush";

struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Decides when a space is written to its blob store.
pub struct SaveScheduler {
    interval: Option<Duration>,
    dirty: Arc<AtomicBool>,
    ticker: Mutex<Option<Ticker>>,
}

impl SaveScheduler {
    /// Creates a scheduler; `None` selects immediate mode.
    ///
    /// A zero interval also selects immediate mode.
    #[must_use]
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval: interval.filter(|interval| !interval.is_zero()),
            dirty: Arc::new(AtomicBool::new(false)),
            ticker: Mutex::new(None),
        }
    }

    /// The debounce interval, if any.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Whether mutations flush synchronously.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.interval.is_none()
    }

    /// Records that in-memory state differs from the stored blob.
    pub fn notify_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Whether unflushed changes exist.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clears the dirty flag, returning whether it was set.
    ///
    /// A caller whose flush then fails must call [`Self::notify_dirty`] again.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Whether the ticker thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ticker.lock().is_some()
    }

    /// Starts the ticker in debounced mode.
    ///
    /// Every interval, if the dirty flag is set, it is cleared and `flush`
    /// runs. A failed flush is logged and the flag is raised again so the
    /// next tick retries. Does nothing in immediate mode or if the ticker is
    /// already running.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn start<F>(&self, mut flush: F) -> DataSpaceResult<()>
    where
        F: FnMut() -> DataSpaceResult<()> + Send + 'static,
    {
        let Some(interval) = self.interval else {
            return Ok(());
        };
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            return Ok(());
        }

        let (stop, stopped) = mpsc::channel::<()>();
        let dirty = Arc::clone(&self.dirty);
        let handle = thread::Builder::new()
            .name(TICKER_THREAD_NAME.to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !dirty.swap(false, Ordering::AcqRel) {
                            continue;
                        }
                        if let Err(err) = flush() {
                            dirty.store(true, Ordering::Release);
                            warn!(error = %err, "scheduled flush failed, retrying next tick");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        debug!(interval_ms = interval.as_millis() as u64, "flush ticker started");
        *ticker = Some(Ticker { stop, handle });
        Ok(())
    }

    /// Stops the ticker and waits for it to exit.
    ///
    /// A flush already in progress completes first. Idempotent.
    pub fn stop(&self) {
        let ticker = self.ticker.lock().take();
        if let Some(ticker) = ticker {
            let _ = ticker.stop.send(());
            if ticker.handle.join().is_err() {
                warn!("flush ticker panicked");
            }
            debug!("flush ticker stopped");
        }
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveScheduler")
            .field("interval", &self.interval)
            .field("dirty", &self.is_dirty())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataSpaceError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn counting_flush(count: &Arc<AtomicUsize>) -> impl FnMut() -> DataSpaceResult<()> + Send {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn wait_for(deadline: Duration, condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn immediate_mode() {
        let scheduler = SaveScheduler::new(None);
        assert!(scheduler.is_immediate());
        assert!(SaveScheduler::new(Some(Duration::ZERO)).is_immediate());

        let count = Arc::new(AtomicUsize::new(0));
        scheduler.start(counting_flush(&count)).unwrap();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn dirty_flag_roundtrip() {
        let scheduler = SaveScheduler::new(None);
        assert!(!scheduler.is_dirty());
        scheduler.notify_dirty();
        scheduler.notify_dirty();
        assert!(scheduler.is_dirty());
        assert!(scheduler.take_dirty());
        assert!(!scheduler.take_dirty());
    }

    #[test]
    fn ticker_skips_clean_ticks() {
        let scheduler = SaveScheduler::new(Some(Duration::from_millis(10)));
        let count = Arc::new(AtomicUsize::new(0));
        scheduler.start(counting_flush(&count)).unwrap();

        thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        scheduler.stop();
    }

    #[test]
    fn ticker_coalesces_notifications() {
        let scheduler = SaveScheduler::new(Some(Duration::from_millis(20)));
        let count = Arc::new(AtomicUsize::new(0));
        scheduler.start(counting_flush(&count)).unwrap();

        for _ in 0..50 {
            scheduler.notify_dirty();
        }
        assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) >= 1));
        thread::sleep(Duration::from_millis(60));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_dirty());
        scheduler.stop();
    }

    #[test]
    fn failed_flush_is_retried() {
        let scheduler = SaveScheduler::new(Some(Duration::from_millis(10)));
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&attempts);
        scheduler
            .start(move || {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DataSpaceError::Closed)
                } else {
                    Ok(())
                }
            })
            .unwrap();

        scheduler.notify_dirty();
        assert!(wait_for(Duration::from_secs(2), || attempts.load(Ordering::SeqCst) >= 2));
        assert!(wait_for(Duration::from_secs(1), || !scheduler.is_dirty()));
        scheduler.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let scheduler = SaveScheduler::new(Some(Duration::from_millis(10)));
        let count = Arc::new(AtomicUsize::new(0));
        scheduler.start(counting_flush(&count)).unwrap();
        assert!(scheduler.is_running());

        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());

        scheduler.notify_dirty();
        thread::sleep(Duration::from_millis(40));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
