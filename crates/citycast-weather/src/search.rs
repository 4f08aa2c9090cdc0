//! Search-as-you-type helpers: the minimum query length and a debouncer that
//! only runs the latest submitted job after a quiet period.
//!
//! [`Debouncer`] is for interactive front ends that search on every
//! keystroke; one-shot callers such as the CLI only need [`should_search`].

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

pub const MIN_QUERY_LEN: usize = 3;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Whether `query` is long enough to send to the geocoder
pub fn should_search(query: &str) -> bool {
    should_search_with(query, MIN_QUERY_LEN)
}

pub fn should_search_with(query: &str, min_len: usize) -> bool {
    let trimmed = query.trim();
    !trimmed.is_empty() && trimmed.chars().count() >= min_len
}

/// Runs the most recently submitted job once no new job has arrived for
/// `delay`. Submitting cancels whatever is pending, including a job that
/// already started, so stale results never land after fresh ones.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Drop the pending job, if any
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
