//! Store-only records. The records shared with the network layer
//! ([`Story`], [`Bookmark`], [`PushSubscription`]) live in `bukukami-shared`.
//!
//! [`Story`]: bukukami_shared::types::Story
//! [`Bookmark`]: bukukami_shared::types::Bookmark
//! [`PushSubscription`]: bukukami_shared::types::PushSubscription

use bukukami_shared::http::HttpResponse;
use bukukami_shared::types::{NewStory, Photo};
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A story submission waiting in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingStory {
    /// Assigned by the store on first insert; `None` before that.
    pub temp_id: Option<i64>,
    pub description: String,
    pub photo: Photo,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl PendingStory {
    pub fn new(story: NewStory) -> Self {
        Self {
            temp_id: None,
            description: story.description,
            photo: story.photo,
            lat: story.lat,
            lon: story.lon,
            created_at: Utc::now(),
        }
    }

    /// The submission to replay against the remote API.
    pub fn to_new_story(&self) -> NewStory {
        NewStory {
            description: self.description.clone(),
            photo: self.photo.clone(),
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// A response held in one of the worker's named caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            stored_at: Utc::now(),
        }
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}
