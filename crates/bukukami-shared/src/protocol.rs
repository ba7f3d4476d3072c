//! Messages exchanged between the foreground application and the background
//! worker, plus the notification and push payload formats.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ACTION_OPEN_ADD_PAGE, ADD_PAGE_URL, NOTIFICATION_ICON, NOTIFICATION_VIBRATE, ROOT_URL,
};
use crate::error::TransportError;

/// A button shown on a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Data carried by a notification and handed back on click.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Structured message posted from the foreground to the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    ShowNotification {
        title: String,
        body: String,
        #[serde(default)]
        actions: Vec<NotificationAction>,
        #[serde(default)]
        data: NotificationData,
    },
}

impl WorkerMessage {
    pub fn show(title: impl Into<String>, body: impl Into<String>) -> Self {
        WorkerMessage::ShowNotification {
            title: title.into(),
            body: body.into(),
            actions: Vec::new(),
            data: NotificationData::default(),
        }
    }
}

/// A system notification as the worker asks the platform to display it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Identifier used to close the notification again.
    pub tag: String,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
    pub require_interaction: bool,
    pub vibrate: Vec<u32>,
}

impl Notification {
    /// A plain notification with the application icon and no actions.
    pub fn simple(tag: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            title: title.into(),
            body: body.into(),
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_ICON.to_string(),
            actions: Vec::new(),
            data: NotificationData::default(),
            require_interaction: false,
            vibrate: Vec::new(),
        }
    }

    /// Build the notification requested by a foreground message. Locally
    /// originated notifications stay until the user interacts with them.
    pub fn from_message(tag: impl Into<String>, message: WorkerMessage) -> Self {
        match message {
            WorkerMessage::ShowNotification {
                title,
                body,
                actions,
                data,
            } => Self {
                actions,
                data,
                require_interaction: true,
                vibrate: NOTIFICATION_VIBRATE.to_vec(),
                ..Self::simple(tag, title, body)
            },
        }
    }

    /// Deep link to open when the notification (or one of its actions) is
    /// clicked.
    pub fn click_target(&self, action: Option<&str>) -> String {
        let fallback = match action {
            Some(ACTION_OPEN_ADD_PAGE) => ADD_PAGE_URL,
            _ => ROOT_URL,
        };
        self.data
            .url
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Payload delivered by the push service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
}

#[derive(Deserialize)]
struct RawPushPayload {
    title: Option<String>,
    body: Option<String>,
}

impl PushPayload {
    pub const DEFAULT_TITLE: &'static str = "Notification";
    pub const DEFAULT_BODY: &'static str = "New message received.";

    /// Parse a push message body: JSON `{ title, body }`, or plain text taken
    /// as the body.
    pub fn parse(data: Option<&[u8]>) -> Self {
        let Some(data) = data else {
            return Self::defaults(None, None);
        };

        match serde_json::from_slice::<RawPushPayload>(data) {
            Ok(raw) => Self::defaults(raw.title, raw.body),
            Err(_) => {
                let text = String::from_utf8_lossy(data).into_owned();
                Self::defaults(None, Some(text))
            }
        }
    }

    fn defaults(title: Option<String>, body: Option<String>) -> Self {
        Self {
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_TITLE.to_string()),
            body: body
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_BODY.to_string()),
        }
    }
}

/// Channel for posting [`WorkerMessage`]s to the background worker.
#[async_trait]
pub trait MessagePort: Send + Sync {
    async fn post_message(&self, message: WorkerMessage) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_message_matches_wire_shape() {
        let json = r##"{
            "type": "SHOW_NOTIFICATION",
            "title": "Time to write",
            "body": "Go",
            "actions": [{ "action": "open-add-page", "title": "Create Story" }],
            "data": { "url": "#/add" }
        }"##;
        let msg: WorkerMessage = serde_json::from_str(json).unwrap();
        let WorkerMessage::ShowNotification { actions, data, .. } = &msg;
        assert_eq!(actions[0].action, ACTION_OPEN_ADD_PAGE);
        assert_eq!(data.url.as_deref(), Some("#/add"));

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["type"], "SHOW_NOTIFICATION");
    }

    #[test]
    fn worker_message_optional_fields_default() {
        let msg: WorkerMessage =
            serde_json::from_str(r#"{"type":"SHOW_NOTIFICATION","title":"t","body":"b"}"#)
                .unwrap();
        assert_eq!(msg, WorkerMessage::show("t", "b"));
    }

    #[test]
    fn push_payload_json() {
        let p = PushPayload::parse(Some(br#"{"title":"New story","body":"Ana posted"}"#));
        assert_eq!(p.title, "New story");
        assert_eq!(p.body, "Ana posted");
    }

    #[test]
    fn push_payload_plain_text_becomes_body() {
        let p = PushPayload::parse(Some(b"hello there"));
        assert_eq!(p.title, PushPayload::DEFAULT_TITLE);
        assert_eq!(p.body, "hello there");
    }

    #[test]
    fn push_payload_missing_fields_use_defaults() {
        assert_eq!(
            PushPayload::parse(None),
            PushPayload {
                title: PushPayload::DEFAULT_TITLE.into(),
                body: PushPayload::DEFAULT_BODY.into(),
            }
        );
        let p = PushPayload::parse(Some(br#"{"title":"Only title"}"#));
        assert_eq!(p.body, PushPayload::DEFAULT_BODY);
    }

    #[test]
    fn click_target_routing() {
        let mut n = Notification::simple("t", "title", "body");
        assert_eq!(n.click_target(None), ROOT_URL);
        assert_eq!(n.click_target(Some(ACTION_OPEN_ADD_PAGE)), ADD_PAGE_URL);
        assert_eq!(n.click_target(Some("dismiss")), ROOT_URL);

        n.data.url = Some("#/stories/42".into());
        assert_eq!(n.click_target(None), "#/stories/42");
        assert_eq!(n.click_target(Some(ACTION_OPEN_ADD_PAGE)), "#/stories/42");
    }

    #[test]
    fn message_notifications_require_interaction() {
        let n = Notification::from_message("tag-1", WorkerMessage::show("a", "b"));
        assert!(n.require_interaction);
        assert_eq!(n.vibrate, vec![200, 100, 200]);
        assert_eq!(n.icon, NOTIFICATION_ICON);
    }
}
