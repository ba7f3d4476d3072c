//! # bukukami-worker
//!
//! The background intermediary between the BukuKami application and the
//! network. It applies a caching policy per route (network-first for API
//! reads, cache-first for static assets), snapshots the static asset
//! manifest on install, prunes stale cache generations on activate, and turns
//! push messages and foreground requests into system notifications.
//!
//! Run it in-process with [`spawn_worker`] and route requests through the
//! returned [`WorkerHandle`], or run the `bukukami-worker` binary as a local
//! reverse proxy.

pub mod config;
pub mod dispatch;
pub mod fetch;
pub mod lifecycle;
pub mod platform;
pub mod proxy;
pub mod push;
pub mod routes;
pub mod spawn;
pub mod transport;

mod error;

#[cfg(test)]
mod testing;

pub use config::WorkerConfig;
pub use dispatch::{Outcome, Worker, WorkerEvent};
pub use error::WorkerError;
pub use lifecycle::{ActivateReport, InstallReport};
pub use platform::{ChannelPlatform, Platform, WorkerNotification};
pub use spawn::{spawn_worker, WorkerHandle};
pub use transport::ReqwestTransport;
