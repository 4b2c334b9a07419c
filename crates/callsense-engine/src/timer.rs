use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// The per-call elapsed counter and its tick task.
///
/// One tick task per active call. Each tick adds one second while the local
/// running flag is set; pausing clears the flag without touching persisted
/// state. The task is cancelled on `stop` and again on `Drop`, so no tick
/// outlives its call.
pub struct CallTimer {
    elapsed_secs: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl CallTimer {
    /// Spawn the tick task, starting from an already-elapsed number of
    /// seconds (non-zero when reattaching to an interrupted call).
    pub fn start(initial_elapsed_secs: u64) -> Self {
        let elapsed_secs = Arc::new(AtomicU64::new(initial_elapsed_secs));
        let running = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        let tick_elapsed = elapsed_secs.clone();
        let tick_running = running.clone();
        let tick_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // the first tick completes immediately; it is not a second
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = tick_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if tick_running.load(Ordering::Relaxed) {
                            tick_elapsed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
        });

        Self {
            elapsed_secs,
            running,
            cancel,
        }
    }

    pub fn pause(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_secs.load(Ordering::Relaxed)
    }

    /// Cancel the tick task and return the final elapsed count.
    pub fn stop(&self) -> u64 {
        self.cancel.cancel();
        self.elapsed_seconds()
    }
}

impl Drop for CallTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
