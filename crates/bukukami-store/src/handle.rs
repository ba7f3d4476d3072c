use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Cloneable, thread-safe handle to the local store.
///
/// The foreground components and the background worker share one handle.
/// The lock is only taken inside [`StoreHandle::with`], which runs a
/// synchronous closure, so it is never held across an `.await`.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<Database>>,
}

impl StoreHandle {
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open_default() -> Result<Self> {
        Database::open_default().map(Self::new)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Database::open_at(path).map(Self::new)
    }

    /// Run `f` with exclusive access to the database.
    pub fn with<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        f(&db)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}
