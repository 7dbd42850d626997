//! Mini Cache - soak runner
//!
//! Runs a small concurrent read/write workload against a cache configured
//! from the environment and logs its statistics until shutdown.
//!
//! # Startup Sequence
//! 1. Initialize tracing subscriber for logging
//! 2. Load configuration from environment variables
//! 3. Create the cache and start its maintenance task
//! 4. Start workload and statistics reporter tasks
//! 5. Handle graceful shutdown on SIGINT/SIGTERM

use std::convert::Infallible;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_cache::{spawn_maintenance_task, Cache, Config, Ttl};

/// Number of distinct keys the workload cycles through
const KEY_SPACE: u64 = 10_000;

/// Interval between statistics log lines
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Cache soak runner");

    let config = Config::from_env().context("failed to load cache configuration")?;
    info!(
        "Configuration loaded: capacity={}, maintenance_interval={}ms, default_ttl={}ms",
        config.capacity, config.maintenance_interval_ms, config.default_ttl_ms
    );

    let cache: Cache<String, String> = Cache::new(config.capacity);
    let maintenance = spawn_maintenance_task(cache.clone(), config.maintenance_interval());

    let workers: Vec<JoinHandle<()>> = (0..4)
        .map(|worker| spawn_worker(cache.clone(), worker, config.default_ttl()))
        .collect();
    let reporter = spawn_reporter(cache.clone());

    shutdown_signal().await;

    cache.close();
    for worker in &workers {
        worker.abort();
    }
    reporter.abort();
    maintenance.abort();

    match serde_json::to_string(&cache.stats()) {
        Ok(stats) => info!("Final stats: {}", stats),
        Err(err) => warn!("Failed to serialize final stats: {}", err),
    }
    info!("Shutdown complete");
    Ok(())
}

/// Writes and reads keys in a fixed pattern, with some compute-on-miss calls.
fn spawn_worker(cache: Cache<String, String>, worker: u64, ttl: Ttl) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(1));
        let mut i: u64 = worker;
        loop {
            tick.tick().await;
            i = i.wrapping_add(4);

            let key = format!("key:{}", i % KEY_SPACE);
            cache.set(key, format!("value:{}", i), ttl);

            let read = format!("key:{}", i.wrapping_mul(7) % KEY_SPACE);
            if cache.get(&read).is_none() && i % 16 == 0 {
                let _ = cache.get_or_set_func_lock(
                    read,
                    || Ok::<_, Infallible>(Some(format!("computed:{}", i))),
                    ttl,
                );
            }
        }
    })
}

/// Logs a JSON statistics line at a fixed interval.
fn spawn_reporter(cache: Cache<String, String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(REPORT_INTERVAL);
        tick.tick().await;
        loop {
            tick.tick().await;
            match serde_json::to_string(&cache.stats()) {
                Ok(stats) => info!("Cache stats: {}", stats),
                Err(err) => warn!("Failed to serialize stats: {}", err),
            }
        }
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
