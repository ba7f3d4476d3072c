//! Paged story feed with an offline fallback to the local story cache.

use std::sync::Arc;

use bukukami_shared::types::Story;
use bukukami_shared::AppError;
use bukukami_store::StoreHandle;
use tracing::{debug, warn};

use crate::api::StoryService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Network,
    /// Served from the local cache because the network was unavailable.
    Cache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    pub stories: Vec<Story>,
    pub source: FeedSource,
    pub can_load_more: bool,
}

pub struct StoryFeed {
    service: Arc<dyn StoryService>,
    store: Option<StoreHandle>,
    page_size: u32,
    page: u32,
    stories: Vec<Story>,
    source: FeedSource,
    can_load_more: bool,
}

impl StoryFeed {
    pub fn new(service: Arc<dyn StoryService>, store: Option<StoreHandle>, page_size: u32) -> Self {
        Self {
            service,
            store,
            page_size: page_size.max(1),
            page: 0,
            stories: Vec::new(),
            source: FeedSource::Network,
            can_load_more: true,
        }
    }

    pub fn view(&self) -> FeedView {
        FeedView {
            stories: self.stories.clone(),
            source: self.source,
            can_load_more: self.can_load_more,
        }
    }

    /// Reload from the first page.
    pub async fn refresh(&mut self) -> Result<FeedView, AppError> {
        match self.fetch(1).await {
            Ok(stories) => {
                self.page = 1;
                self.can_load_more = stories.len() == self.page_size as usize;
                self.stories = stories;
                self.source = FeedSource::Network;
                Ok(self.view())
            }
            Err(AppError::NetworkUnavailable(reason)) => self.fall_back(reason),
            Err(e) => Err(e),
        }
    }

    /// Append the next page. Without more pages the current view is
    /// returned unchanged.
    pub async fn load_next(&mut self) -> Result<FeedView, AppError> {
        if self.page == 0 || self.source == FeedSource::Cache {
            return self.refresh().await;
        }
        if !self.can_load_more {
            return Ok(self.view());
        }

        let next = self.page + 1;
        let stories = self.fetch(next).await?;
        self.page = next;
        self.can_load_more = stories.len() == self.page_size as usize;
        self.stories.extend(stories);
        Ok(self.view())
    }

    async fn fetch(&self, page: u32) -> Result<Vec<Story>, AppError> {
        let stories = self.service.list_stories(page, self.page_size).await?;
        if let Some(store) = &self.store {
            if let Err(e) = store.with(|db| db.save_stories(&stories)) {
                warn!(error = %e, "failed to cache stories");
            }
        }
        debug!(page, count = stories.len(), "feed page loaded");
        Ok(stories)
    }

    fn fall_back(&mut self, reason: String) -> Result<FeedView, AppError> {
        let cached = match &self.store {
            Some(store) => store.with(|db| db.cached_stories()).unwrap_or_else(|e| {
                warn!(error = %e, "story cache unreadable");
                Vec::new()
            }),
            None => Vec::new(),
        };

        if cached.is_empty() {
            return Err(AppError::NetworkUnavailable(reason));
        }

        debug!(count = cached.len(), "serving cached stories");
        self.stories = cached;
        self.source = FeedSource::Cache;
        self.can_load_more = false;
        Ok(self.view())
    }
}
