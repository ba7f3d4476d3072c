//! Platform services the worker drives: notification display and window
//! clients.
//!
//! [`ChannelPlatform`] forwards every effect as a [`WorkerNotification`] so
//! that a host (a UI shell or the headless proxy) decides what to do with it.

use async_trait::async_trait;
use bukukami_shared::protocol::Notification;
use tokio::sync::mpsc;

use crate::error::WorkerError;

#[async_trait]
pub trait Platform: Send + Sync {
    async fn show_notification(&self, notification: Notification) -> Result<(), WorkerError>;

    async fn close_notification(&self, tag: &str) -> Result<(), WorkerError>;

    /// Take control of every open application instance. Returns how many
    /// were claimed.
    async fn claim_clients(&self) -> Result<usize, WorkerError>;

    /// Focus an application window showing `url`, or open a new one.
    async fn open_window(&self, url: &str) -> Result<(), WorkerError>;
}

/// Effects emitted by [`ChannelPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerNotification {
    NotificationShown(Notification),
    NotificationClosed { tag: String },
    ClientsClaimed,
    WindowOpened { url: String },
}

pub struct ChannelPlatform {
    tx: mpsc::Sender<WorkerNotification>,
}

impl ChannelPlatform {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<WorkerNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    async fn emit(&self, notification: WorkerNotification) -> Result<(), WorkerError> {
        self.tx
            .send(notification)
            .await
            .map_err(|_| WorkerError::Platform("platform receiver dropped".into()))
    }
}

#[async_trait]
impl Platform for ChannelPlatform {
    async fn show_notification(&self, notification: Notification) -> Result<(), WorkerError> {
        self.emit(WorkerNotification::NotificationShown(notification))
            .await
    }

    async fn close_notification(&self, tag: &str) -> Result<(), WorkerError> {
        self.emit(WorkerNotification::NotificationClosed {
            tag: tag.to_string(),
        })
        .await
    }

    async fn claim_clients(&self) -> Result<usize, WorkerError> {
        if self.tx.is_closed() {
            return Ok(0);
        }
        self.emit(WorkerNotification::ClientsClaimed).await?;
        Ok(1)
    }

    async fn open_window(&self, url: &str) -> Result<(), WorkerError> {
        self.emit(WorkerNotification::WindowOpened {
            url: url.to_string(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn effects_arrive_in_order() {
        let (platform, mut rx) = ChannelPlatform::new(8);
        platform
            .show_notification(Notification::simple("t1", "Hi", "there"))
            .await
            .unwrap();
        platform.close_notification("t1").await.unwrap();
        assert_eq!(platform.claim_clients().await.unwrap(), 1);
        platform.open_window("#/").await.unwrap();

        assert!(matches!(rx.recv().await, Some(WorkerNotification::NotificationShown(n)) if n.tag == "t1"));
        assert_eq!(
            rx.recv().await,
            Some(WorkerNotification::NotificationClosed { tag: "t1".into() })
        );
        assert_eq!(rx.recv().await, Some(WorkerNotification::ClientsClaimed));
        assert_eq!(
            rx.recv().await,
            Some(WorkerNotification::WindowOpened { url: "#/".into() })
        );
    }

    #[tokio::test]
    async fn dropped_receiver_claims_nothing() {
        let (platform, rx) = ChannelPlatform::new(1);
        drop(rx);
        assert_eq!(platform.claim_clients().await.unwrap(), 0);
        assert!(platform.open_window("#/").await.is_err());
    }
}
