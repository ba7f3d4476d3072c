//! Periodic "time to write" reminder.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bukukami_shared::constants::{ACTION_OPEN_ADD_PAGE, ADD_PAGE_URL};
use bukukami_shared::protocol::{MessagePort, NotificationAction, NotificationData, WorkerMessage};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

pub fn reminder_message() -> WorkerMessage {
    WorkerMessage::ShowNotification {
        title: "Time to write".to_string(),
        body: "Time to create an awesome story, don't fall behind the other authors.".to_string(),
        actions: vec![NotificationAction {
            action: ACTION_OPEN_ADD_PAGE.to_string(),
            title: "Create Story".to_string(),
        }],
        data: NotificationData {
            url: Some(ADD_PAGE_URL.to_string()),
        },
    }
}

/// Owned periodic timer. At most one timer task runs at a time; dropping
/// the timer stops it.
pub struct ReminderTimer {
    port: Arc<dyn MessagePort>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderTimer {
    pub fn new(port: Arc<dyn MessagePort>, interval: Duration) -> Self {
        Self {
            port,
            interval,
            task: Mutex::new(None),
        }
    }

    /// Start posting reminders, replacing any running timer. The first
    /// reminder fires one full interval from now.
    pub fn start(&self) {
        let port = self.port.clone();
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match port.post_message(reminder_message()).await {
                    Ok(()) => debug!("reminder posted"),
                    Err(e) => warn!(error = %e, "failed to post reminder"),
                }
            }
        });

        let Ok(mut slot) = self.task.lock() else {
            handle.abort();
            return;
        };
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
        debug!(interval = ?period, "reminder timer started");
    }

    /// Stop the timer. Stopping an idle timer does nothing.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                debug!("reminder timer stopped");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for ReminderTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
