//! # bukukami-worker
//!
//! Local reverse proxy running the BukuKami background worker.
//!
//! Point a client at the proxy instead of the story service and the static
//! host: API reads are cached and served offline, static assets come from
//! the install-time snapshot, and notification effects are logged.

use std::sync::Arc;

use bukukami_store::StoreHandle;
use bukukami_worker::platform::{ChannelPlatform, WorkerNotification};
use bukukami_worker::proxy::{self, ProxyState};
use bukukami_worker::{spawn_worker, ReqwestTransport, Worker, WorkerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bukukami_worker=debug,bukukami_store=info")),
        )
        .init();

    info!("Starting BukuKami worker v{}", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env();
    info!(?config, "Loaded configuration");

    // A missing store is not fatal: the worker degrades to network-only.
    let opened = match &config.db_path {
        Some(path) => StoreHandle::open_at(path),
        None => StoreHandle::open_default(),
    };
    let store = match opened {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "Local store unavailable, running without caches");
            None
        }
    };

    let network = Arc::new(ReqwestTransport::new(config.request_timeout)?);

    let (platform, mut effects) = ChannelPlatform::new(64);
    tokio::spawn(async move {
        while let Some(effect) = effects.recv().await {
            match effect {
                WorkerNotification::NotificationShown(n) => {
                    info!(tag = %n.tag, title = %n.title, body = %n.body, "notification")
                }
                WorkerNotification::NotificationClosed { tag } => {
                    info!(tag = %tag, "notification closed")
                }
                WorkerNotification::ClientsClaimed => info!("clients claimed"),
                WorkerNotification::WindowOpened { url } => info!(url = %url, "open window"),
            }
        }
    });

    let listen_addr = config.listen_addr;
    let shared_config = Arc::new(config.clone());
    let worker = Worker::new(config, network, store, Arc::new(platform));
    let handle = spawn_worker(worker);

    let state = ProxyState {
        handle: handle.clone(),
        config: shared_config,
    };

    tokio::select! {
        result = proxy::serve(state, listen_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Proxy server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    if let Err(e) = handle.shutdown().await {
        warn!(error = %e, "Worker already stopped");
    }

    Ok(())
}
