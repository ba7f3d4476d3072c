//! The worker and its event dispatch table.
//!
//! Every background event kind maps to exactly one handler. The only state
//! shared between handlers is the store (named caches) and the platform.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bukukami_shared::http::{HttpRequest, HttpResponse, Transport};
use bukukami_shared::protocol::{Notification, WorkerMessage};
use bukukami_shared::TransportError;
use bukukami_store::StoreHandle;
use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::lifecycle::{ActivateReport, InstallReport};
use crate::platform::Platform;

/// Events delivered to the worker.
#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    /// An intercepted request. The response (or transport failure) goes back
    /// on `respond_to`.
    Fetch {
        request: HttpRequest,
        respond_to: oneshot::Sender<Result<HttpResponse, TransportError>>,
    },
    Push {
        payload: Option<Bytes>,
    },
    Message(WorkerMessage),
    NotificationClick {
        notification: Notification,
        action: Option<String>,
    },
    Shutdown,
}

/// What handling an event produced.
#[derive(Debug)]
pub enum Outcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Responded,
    NotificationShown(Notification),
    WindowOpened(String),
    Stopped,
}

/// The background intermediary between the application and the network.
///
/// Cheap to clone: every field is shared.
#[derive(Clone)]
pub struct Worker {
    pub(crate) config: Arc<WorkerConfig>,
    pub(crate) network: Arc<dyn Transport>,
    pub(crate) store: Option<StoreHandle>,
    pub(crate) platform: Arc<dyn Platform>,
    next_tag: Arc<AtomicU64>,
}

impl Worker {
    /// Without a store the worker degrades to network-only.
    pub fn new(
        config: WorkerConfig,
        network: Arc<dyn Transport>,
        store: Option<StoreHandle>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            network,
            store,
            platform,
            next_tag: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub(crate) fn next_tag(&self) -> String {
        format!("bukukami-{}", self.next_tag.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn dispatch(&self, event: WorkerEvent) -> Result<Outcome, WorkerError> {
        match event {
            WorkerEvent::Install => {
                let report = self.install().await;
                info!(
                    cached = report.cached.len(),
                    skipped = report.skipped.len(),
                    "worker installed"
                );
                Ok(Outcome::Installed(report))
            }
            WorkerEvent::Activate => {
                let report = self.activate().await?;
                info!(
                    deleted = ?report.deleted,
                    claimed = report.claimed,
                    "worker activated"
                );
                Ok(Outcome::Activated(report))
            }
            WorkerEvent::Fetch {
                request,
                respond_to,
            } => {
                let response = self.handle_fetch(request).await;
                if respond_to.send(response).is_err() {
                    debug!("fetch requester went away before the response");
                }
                Ok(Outcome::Responded)
            }
            WorkerEvent::Push { payload } => {
                let notification = self.handle_push(payload.as_deref()).await?;
                Ok(Outcome::NotificationShown(notification))
            }
            WorkerEvent::Message(message) => {
                let notification = self.handle_message(message).await?;
                Ok(Outcome::NotificationShown(notification))
            }
            WorkerEvent::NotificationClick {
                notification,
                action,
            } => {
                let url = self
                    .handle_notification_click(&notification, action.as_deref())
                    .await?;
                Ok(Outcome::WindowOpened(url))
            }
            WorkerEvent::Shutdown => Ok(Outcome::Stopped),
        }
    }
}
