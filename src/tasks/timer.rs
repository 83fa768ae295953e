//! Expiry Timer Task
//!
//! Spawns one sleeping tokio task per expiring cache entry. Dropping the
//! returned [`ExpiryTimer`] cancels the task.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{CacheError, Result};

/// Handle of the process-wide timer runtime, started on first use.
static BACKGROUND: Mutex<Option<Handle>> = parking_lot::const_mutex(None);

const TIMER_THREAD_NAME: &str = "ttl-cache-timer";

// == Timer Runtime ==
/// The tokio runtime on which expiry timers sleep and fire.
#[derive(Debug, Clone)]
pub struct TimerRuntime {
    handle: Handle,
}

impl TimerRuntime {
    /// Uses a caller-owned tokio runtime. Timers stop firing once that
    /// runtime shuts down.
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// Returns the shared background runtime, starting it if needed.
    ///
    /// The runtime is single-threaded and driven by a dedicated thread that
    /// lives for the rest of the process, so caches built from plain
    /// synchronous code still get their timers fired.
    pub fn background() -> Result<Self> {
        let mut slot = BACKGROUND.lock();
        if let Some(handle) = slot.as_ref() {
            return Ok(Self::from_handle(handle.clone()));
        }

        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| CacheError::Runtime(e.to_string()))?;
        let handle = runtime.handle().clone();

        thread::Builder::new()
            .name(TIMER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(std::future::pending::<()>()))
            .map_err(|e| CacheError::Runtime(e.to_string()))?;

        info!("Started background expiry timer thread '{}'", TIMER_THREAD_NAME);
        *slot = Some(handle.clone());
        Ok(Self::from_handle(handle))
    }

    /// Schedules `on_expire` to run once after `delay`.
    ///
    /// A panic inside `on_expire` is logged and contained; nobody is waiting
    /// on the timer to observe it.
    pub(crate) fn spawn_expiry<F>(&self, delay: Duration, on_expire: F) -> ExpiryTimer
    where
        F: FnOnce() + Send + 'static,
    {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(on_expire)) {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Expiry callback panicked: {}", reason);
            }
        });

        ExpiryTimer { task }
    }
}

// == Expiry Timer ==
/// Owned handle to a scheduled expiry. Aborts the timer task when dropped.
#[derive(Debug)]
pub(crate) struct ExpiryTimer {
    task: JoinHandle<()>,
}

impl ExpiryTimer {
    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
