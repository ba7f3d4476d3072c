//! Push, message and notification-click handlers.

use bukukami_shared::protocol::{Notification, PushPayload, WorkerMessage};
use tracing::debug;

use crate::dispatch::Worker;
use crate::error::WorkerError;

impl Worker {
    /// Show a notification for a push message. Non-JSON payloads become the
    /// body verbatim.
    pub async fn handle_push(&self, payload: Option<&[u8]>) -> Result<Notification, WorkerError> {
        let payload = PushPayload::parse(payload);
        debug!(title = %payload.title, "push received");

        let notification = Notification::simple(self.next_tag(), payload.title, payload.body);
        self.platform.show_notification(notification.clone()).await?;
        Ok(notification)
    }

    pub async fn handle_message(&self, message: WorkerMessage) -> Result<Notification, WorkerError> {
        let notification = Notification::from_message(self.next_tag(), message);
        self.platform.show_notification(notification.clone()).await?;
        Ok(notification)
    }

    /// Close the clicked notification and open the deep link it (or the
    /// clicked action) points at. Returns that link.
    pub async fn handle_notification_click(
        &self,
        notification: &Notification,
        action: Option<&str>,
    ) -> Result<String, WorkerError> {
        self.platform.close_notification(&notification.tag).await?;

        let url = notification.click_target(action);
        debug!(tag = %notification.tag, ?action, url = %url, "notification clicked");
        self.platform.open_window(&url).await?;
        Ok(url)
    }
}
