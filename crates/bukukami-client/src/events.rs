//! Short user-facing notices sent from the components to the UI.

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Informational message to show as-is.
    Info(String),
    /// A submission could not be sent and was queued.
    StoryQueued { temp_id: i64 },
    /// A queued submission reached the server.
    StorySynced { temp_id: i64 },
    Subscribed,
    Unsubscribed,
    Error(String),
}

impl Notice {
    pub fn text(&self) -> String {
        match self {
            Notice::Info(msg) | Notice::Error(msg) => msg.clone(),
            Notice::StoryQueued { .. } => "You appear to be offline. Your story will be sent \
                 automatically once you are back online."
                .to_string(),
            Notice::StorySynced { .. } => "A story saved while offline has been published.".to_string(),
            Notice::Subscribed => "You are now subscribed to notifications.".to_string(),
            Notice::Unsubscribed => "You have unsubscribed from notifications.".to_string(),
        }
    }
}

/// Sender side of the notice channel. Cloneable; a closed or absent
/// receiver is logged, never an error.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl Notices {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Notices go nowhere.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, notice: Notice) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.send(notice) {
            tracing::error!(notice = ?e.0, "Failed to emit notice");
        }
    }
}
