//! Run the worker in a background tokio task.
//!
//! The task installs, activates, then serves events from a bounded command
//! channel. Each event is handled in its own task so interceptions run
//! concurrently. [`WorkerHandle`] is the cloneable sender side.

use async_trait::async_trait;
use bukukami_shared::http::{HttpRequest, HttpResponse, Transport};
use bukukami_shared::protocol::{MessagePort, Notification, WorkerMessage};
use bukukami_shared::TransportError;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::dispatch::{Worker, WorkerEvent};
use crate::error::WorkerError;

/// Capacity of the worker event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerEvent>,
}

pub fn spawn_worker(worker: Worker) -> WorkerHandle {
    let (tx, mut rx) = mpsc::channel::<WorkerEvent>(EVENT_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        for event in [WorkerEvent::Install, WorkerEvent::Activate] {
            if let Err(e) = worker.dispatch(event).await {
                error!(error = %e, "worker lifecycle step failed");
            }
        }

        while let Some(event) = rx.recv().await {
            if matches!(event, WorkerEvent::Shutdown) {
                info!("worker shutdown requested");
                break;
            }
            let worker = worker.clone();
            tokio::spawn(async move {
                if let Err(e) = worker.dispatch(event).await {
                    error!(error = %e, "worker event failed");
                }
            });
        }

        info!("worker event loop stopped");
    });

    WorkerHandle { tx }
}

impl WorkerHandle {
    async fn send_event(&self, event: WorkerEvent) -> Result<(), WorkerError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Deliver a push message from the push service.
    pub async fn push(&self, payload: Option<Bytes>) -> Result<(), WorkerError> {
        self.send_event(WorkerEvent::Push { payload }).await
    }

    pub async fn notification_click(
        &self,
        notification: Notification,
        action: Option<String>,
    ) -> Result<(), WorkerError> {
        self.send_event(WorkerEvent::NotificationClick {
            notification,
            action,
        })
        .await
    }

    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        self.send_event(WorkerEvent::Shutdown).await
    }
}

#[async_trait]
impl Transport for WorkerHandle {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.tx
            .send(WorkerEvent::Fetch {
                request,
                respond_to,
            })
            .await
            .map_err(|_| TransportError::WorkerUnavailable)?;
        response
            .await
            .map_err(|_| TransportError::WorkerUnavailable)?
    }
}

#[async_trait]
impl MessagePort for WorkerHandle {
    async fn post_message(&self, message: WorkerMessage) -> Result<(), TransportError> {
        self.tx
            .send(WorkerEvent::Message(message))
            .await
            .map_err(|_| TransportError::WorkerUnavailable)
    }
}
