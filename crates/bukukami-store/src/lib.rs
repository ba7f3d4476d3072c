//! # bukukami-store
//!
//! Durable on-device storage for BukuKami, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] that wraps a
//! `rusqlite::Connection`, runs additive schema migrations on open and
//! provides a generic keyed-collection API ([`Record`]) plus typed helpers
//! for stories, pending submissions, bookmarks, push subscriptions, the
//! worker's named response caches and durable flags. [`StoreHandle`] shares
//! one database between the foreground and the background worker.

pub mod bookmarks;
pub mod caches;
pub mod collection;
pub mod database;
pub mod flags;
pub mod handle;
pub mod migrations;
pub mod models;
pub mod pending;
pub mod stories;
pub mod subscriptions;

mod error;

pub use collection::{Collection, Record};
pub use database::Database;
pub use error::{Result, StoreError};
pub use flags::{FLAG_ACCESS_TOKEN, FLAG_SUBSCRIBED};
pub use handle::StoreHandle;
pub use models::*;
