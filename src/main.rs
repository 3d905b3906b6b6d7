use std::sync::Arc;
use std::time::Duration;

use nswatch::LoggingResolver;
use nswatch::MemKvStore;
use nswatch::Result;
use nswatch::WatchSession;
use nswatch::WatcherConfig;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

/// Demo: watch a namespace of an in-memory store while a writer task keeps
/// mutating it, until SIGINT/SIGTERM.
#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = WatcherConfig::load(None)?;

    // Initializing Logs
    init_observability();

    let store = Arc::new(MemKvStore::new());
    let prefix = nswatch::namespace::wrap(&settings.namespace);
    store.put(format!("{}config/mode", prefix), "standby");

    let mut session = WatchSession::builder()
        .client(store.clone())
        .set_config(settings)
        .resolver(LoggingResolver)
        .build()?;
    session.start().await;

    // Initializing Shutdown Signal
    let shutdown = CancellationToken::new();
    let writer = tokio::spawn(write_demo_keys(store, prefix, shutdown.clone()));

    info!("Application started. Waiting for CTRL+C signal...");
    if let Err(e) = wait_for_signal().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
    }

    shutdown.cancel();
    if let Err(e) = writer.await {
        error!("writer stops: {:?}", e);
    }
    session.close().await;

    println!("{}", nswatch::metrics::gather_metrics());
    println!("Exiting program.");
    Ok(())
}

async fn write_demo_keys(
    store: Arc<MemKvStore>,
    prefix: String,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    let mut round: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                round += 1;
                let key = format!("{}workers/{}", prefix, round % 3);
                if round % 4 == 0 {
                    store.delete(&key);
                } else {
                    store.put(&key, format!("round-{}", round));
                }
            }
        }
    }
}

async fn wait_for_signal() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    Ok(())
}

fn init_observability() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base_subscriber = tracing_subscriber::fmt::layer().with_filter(filter);
    tracing_subscriber::registry().with(base_subscriber).init();
}
