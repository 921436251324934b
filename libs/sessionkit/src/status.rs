//! Per-client session status and its lifecycle.

use crate::error::ClientError;
use arc_swap::ArcSwapOption;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Session state shared by every operation of one client.
///
/// The client hands out `Arc<S>`, so anything an operation mutates (a token
/// set by a login, an "authenticated" flag) needs interior mutability.
pub trait Status: Send + Sync + 'static {
    /// Whether the status currently carries a valid authentication.
    fn is_authenticated(&self) -> bool {
        false
    }

    /// Drop the authentication facet. Called when the service reports the
    /// session as expired, before any renewal attempt.
    fn reset_authentication(&self) {}
}

/// Session-less clients.
impl Status for () {}

/// Lazily initialized, resettable slot for a client's status.
///
/// Reads are lock-free. Initialization, replacement and reset are
/// serialized by one async lock, so concurrent first callers share a single
/// initialization and a reset never interleaves with one. A failed
/// initialization leaves the slot empty and the next caller tries again.
pub struct StatusCell<S> {
    current: ArcSwapOption<S>,
    lock: Mutex<()>,
    epoch: AtomicU64,
}

impl<S> StatusCell<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            lock: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    /// The current status, without initializing it.
    #[must_use]
    pub fn get(&self) -> Option<Arc<S>> {
        self.current.load_full()
    }

    /// Number of statuses installed so far, by initialization or `set`.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Return the current status, running `init` first if there is none.
    ///
    /// `init` runs at most once per empty period no matter how many callers
    /// arrive concurrently; late arrivals wait for it and get its result.
    ///
    /// # Errors
    /// Propagates the error of `init`; nothing is cached in that case.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<S>, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, ClientError>>,
    {
        if let Some(status) = self.get() {
            return Ok(status);
        }

        let _guard = self.lock.lock().await;
        if let Some(status) = self.get() {
            return Ok(status);
        }

        let status = Arc::new(init().await?);
        self.install(Arc::clone(&status));
        Ok(status)
    }

    /// Replace the status unconditionally.
    pub async fn set(&self, status: S) -> Arc<S> {
        let status = Arc::new(status);
        let _guard = self.lock.lock().await;
        self.install(Arc::clone(&status));
        status
    }

    /// Clear the status; the next session-dependent call initializes anew.
    /// Returns whether there was one.
    pub async fn reset(&self) -> bool {
        let _guard = self.lock.lock().await;
        self.current.swap(None).is_some()
    }

    fn install(&self, status: Arc<S>) {
        self.current.store(Some(status));
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}

impl<S> Default for StatusCell<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for StatusCell<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCell")
            .field("initialized", &self.current.load().is_some())
            .field("epoch", &self.epoch())
            .finish()
    }
}
