//! Maintenance Scheduler
//!
//! Invokes a maintenance routine at a fixed interval, one call at a time,
//! until the routine returns `ControlFlow::Break`.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::Result;

/// A periodic maintenance routine.
pub trait Maintain: Send + Sync + 'static {
    /// Runs one cycle. `Break` asks the scheduler to stop calling.
    fn maintain(&self) -> ControlFlow<()>;
}

impl<T: Maintain + ?Sized> Maintain for Arc<T> {
    fn maintain(&self) -> ControlFlow<()> {
        (**self).maintain()
    }
}

/// Spawns a tokio task that calls `target.maintain()` every `interval`.
///
/// The task sleeps before each call, so calls never overlap, and exits on
/// its own once the routine returns `Break`. The returned handle can also be
/// aborted during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Cache::new(1000);
/// let handle = spawn_maintenance_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// cache.close();
/// ```
pub fn spawn_maintenance_task<M: Maintain>(target: M, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cache maintenance task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            if target.maintain().is_break() {
                break;
            }
        }

        info!("Cache maintenance task stopped");
    })
}

/// Spawns an OS thread that calls `target.maintain()` every `interval`.
///
/// Same contract as [`spawn_maintenance_task`] for callers without a tokio
/// runtime.
pub fn spawn_maintenance_thread<M: Maintain>(
    target: M,
    interval: Duration,
) -> Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("cache-maintenance".to_string())
        .spawn(move || {
            debug!(
                "Starting cache maintenance thread with interval of {} ms",
                interval.as_millis()
            );

            loop {
                thread::sleep(interval);

                if target.maintain().is_break() {
                    break;
                }
            }

            info!("Cache maintenance thread stopped");
        })?;
    Ok(handle)
}
