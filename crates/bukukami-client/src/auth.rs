//! Access token storage.

use std::sync::Mutex;

use bukukami_shared::AppError;
use bukukami_store::{StoreHandle, FLAG_ACCESS_TOKEN};

/// Where the signed-in user's bearer token lives.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

/// Empty strings and the literals `"null"` / `"undefined"` mean no token.
pub fn normalize_token(raw: Option<String>) -> Option<String> {
    raw.filter(|t| {
        let t = t.trim();
        !t.is_empty() && t != "null" && t != "undefined"
    })
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        let token = self.token.lock().ok()?.clone();
        normalize_token(token)
    }

    fn set_token(&self, token: &str) -> Result<(), AppError> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| AppError::StorageUnavailable("token lock poisoned".into()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| AppError::StorageUnavailable("token lock poisoned".into()))?;
        *slot = None;
        Ok(())
    }
}

/// Token persisted in the local store's flag table.
#[derive(Debug, Clone)]
pub struct StoredTokenStore {
    store: StoreHandle,
}

impl StoredTokenStore {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }
}

impl TokenStore for StoredTokenStore {
    fn token(&self) -> Option<String> {
        match self.store.with(|db| db.get_flag(FLAG_ACCESS_TOKEN)) {
            Ok(token) => normalize_token(token),
            Err(e) => {
                tracing::error!(error = %e, "failed to read access token");
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<(), AppError> {
        Ok(self.store.with(|db| db.set_flag(FLAG_ACCESS_TOKEN, token))?)
    }

    fn clear(&self) -> Result<(), AppError> {
        self.store.with(|db| db.remove_flag(FLAG_ACCESS_TOKEN))?;
        Ok(())
    }
}
