//! Background task that periodically snapshots the registry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use blocklocker_store::LockStore;

use crate::error::{LockError, Result};
use crate::registry::Registry;

/// Handle to a running flusher. Dropping it without calling
/// [`FlushHandle::shutdown`] stops the task without a final flush.
pub struct FlushHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    final_flush: Box<dyn FnOnce() -> Result<bool> + Send>,
}

impl FlushHandle {
    /// Stop the task, then flush one last time. Returns whether the final
    /// flush wrote a snapshot.
    pub async fn shutdown(mut self) -> Result<bool> {
        if let Some(stop) = self.stop.take() {
            // The task may already have exited; nothing to signal then.
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "flusher task ended abnormally");
        }
        let final_flush = std::mem::replace(&mut self.final_flush, Box::new(|| Ok(false)));
        let written = tokio::task::spawn_blocking(final_flush)
            .await
            .map_err(|e| LockError::StoreUnavailable(format!("final flush panicked: {e}")))??;
        info!(written, "flusher stopped");
        Ok(written)
    }
}

impl Drop for FlushHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Spawn a flusher using the registry's `persistence_interval_seconds`.
///
/// With an interval of `0` no periodic flushes happen, but
/// [`FlushHandle::shutdown`] still performs the final flush.
pub fn spawn_flusher<S: LockStore + 'static>(registry: Arc<Registry<S>>) -> FlushHandle {
    let period = registry.config().persistence_interval();
    spawn_inner(registry, period)
}

/// Spawn a flusher with an explicit period.
pub fn spawn_flusher_every<S: LockStore + 'static>(
    registry: Arc<Registry<S>>,
    period: Duration,
) -> FlushHandle {
    spawn_inner(registry, Some(period))
}

fn spawn_inner<S: LockStore + 'static>(
    registry: Arc<Registry<S>>,
    period: Option<Duration>,
) -> FlushHandle {
    let (stop_tx, stop_rx) = oneshot::channel();
    let task_registry = Arc::clone(&registry);
    let task = tokio::spawn(run(task_registry, period, stop_rx));
    FlushHandle {
        stop: Some(stop_tx),
        task,
        final_flush: Box::new(move || registry.flush()),
    }
}

async fn run<S: LockStore + 'static>(
    registry: Arc<Registry<S>>,
    period: Option<Duration>,
    mut stop: oneshot::Receiver<()>,
) {
    let Some(period) = period else {
        debug!("periodic flushing disabled");
        let _ = stop.await;
        return;
    };

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let registry = Arc::clone(&registry);
                match tokio::task::spawn_blocking(move || registry.flush()).await {
                    Ok(Ok(true)) => debug!("periodic flush wrote snapshot"),
                    Ok(Ok(false)) => {}
                    Ok(Err(e)) => warn!(error = %e, "periodic flush failed, will retry"),
                    Err(e) => warn!(error = %e, "periodic flush task panicked"),
                }
            }
        }
    }
}
