//! Direct story submission with an offline fallback to the outbox.

use std::sync::Arc;

use bukukami_shared::types::NewStory;
use bukukami_shared::AppError;
use bukukami_store::StoreHandle;
use tracing::{info, warn};

use crate::api::StoryService;
use crate::events::{Notice, Notices};
use crate::outbox::Outbox;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted by the server, with its confirmation message.
    Sent(String),
    /// Queued for later delivery under this temp id.
    Queued(i64),
}

pub struct StorySubmitter {
    service: Arc<dyn StoryService>,
    store: Option<StoreHandle>,
    outbox: Arc<Outbox>,
    notices: Notices,
}

impl StorySubmitter {
    pub fn new(
        service: Arc<dyn StoryService>,
        store: Option<StoreHandle>,
        outbox: Arc<Outbox>,
        notices: Notices,
    ) -> Self {
        Self {
            service,
            store,
            outbox,
            notices,
        }
    }

    pub async fn submit(&self, story: NewStory) -> Result<SubmitOutcome, AppError> {
        validate(&story)?;

        let reason = match self.service.submit_story(&story).await {
            Ok(message) => {
                info!("story submitted");
                return Ok(SubmitOutcome::Sent(message));
            }
            Err(AppError::NetworkUnavailable(reason)) => reason,
            Err(e) => return Err(e),
        };

        let Some(store) = &self.store else {
            warn!("offline and no local store, story cannot be queued");
            return Err(AppError::NetworkUnavailable(reason));
        };

        let temp_id = store.with(|db| db.add_pending_story(story))?;
        self.notices.emit(Notice::StoryQueued { temp_id });

        let report = self.outbox.drain().await;
        if report.sent.contains(&temp_id) {
            info!(temp_id, "queued story went through on immediate retry");
        }
        Ok(SubmitOutcome::Queued(temp_id))
    }
}

fn validate(story: &NewStory) -> Result<(), AppError> {
    if story.description.trim().is_empty() {
        return Err(AppError::InvalidInput("Description must not be empty.".into()));
    }
    if story.photo.data.is_empty() {
        return Err(AppError::InvalidInput("A photo is required.".into()));
    }
    Ok(())
}
