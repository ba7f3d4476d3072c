//! # bukukami-client
//!
//! Foreground side of the BukuKami offline core: the story API client, the
//! paged feed with its offline cache, direct submission with an outbox for
//! stories written offline, and the push subscription lifecycle with its
//! periodic writing reminder. [`App`] wires them to an in-process
//! [`bukukami_worker`] through which every request flows.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod events;
pub mod feed;
pub mod outbox;
pub mod push;
pub mod reminder;
pub mod submit;

use tracing_subscriber::{fmt, EnvFilter};

pub use api::{LoginResult, PushRegistry, RemoteApi, StoryService};
pub use app::{App, AppChannels, AppParts};
pub use config::ClientConfig;
pub use events::{Notice, Notices};
pub use feed::{FeedSource, FeedView, StoryFeed};
pub use outbox::{DrainReport, Outbox, RetryPolicy};
pub use push::{
    PermissionState, PushManager, PushPlatform, SubscribeOutcome, SubscribeReport,
    SubscriptionState, UnsubscribeOutcome,
};
pub use reminder::ReminderTimer;
pub use submit::{StorySubmitter, SubmitOutcome};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// per-crate filter. Call once, before [`App::start`].
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("bukukami_client=debug,bukukami_worker=info,bukukami_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
