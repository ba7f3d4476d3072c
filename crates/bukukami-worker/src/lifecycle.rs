//! Install and activate.

use bukukami_shared::http::HttpRequest;
use bukukami_store::{StoreError, StoreHandle};
use futures::future::join_all;
use tracing::{info, warn};

use crate::dispatch::Worker;
use crate::error::WorkerError;

/// Result of snapshotting the static asset manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    /// Stale cache generations that were deleted.
    pub deleted: Vec<String>,
    pub claimed: usize,
}

impl Worker {
    /// Fetch every manifest asset into the static cache. An asset that
    /// fails to fetch (or returns a non-2xx) is skipped.
    pub async fn install(&self) -> InstallReport {
        let mut report = InstallReport::default();

        let Some(store) = &self.store else {
            warn!("no store available, static assets will not be cached");
            report.skipped = self.config.static_assets.clone();
            return report;
        };

        let fetches = self.config.static_assets.iter().map(|path| async move {
            let url = match self.config.static_origin.join(path) {
                Ok(url) => url,
                Err(e) => return (path, Err(e.to_string())),
            };
            let request = HttpRequest::get(url);
            let key = request.cache_key();
            match self.network.send(request).await {
                Ok(response) if response.is_success() => (path, Ok((key, response))),
                Ok(response) => (path, Err(format!("status {}", response.status))),
                Err(e) => (path, Err(e.to_string())),
            }
        });

        for (path, result) in join_all(fetches).await {
            let stored = result.and_then(|(key, response)| {
                store
                    .with(|db| db.cache_put(&self.config.static_cache_name, &key, &response))
                    .map_err(|e| e.to_string())
            });
            match stored {
                Ok(()) => report.cached.push(path.clone()),
                Err(reason) => {
                    warn!(asset = %path, %reason, "skipping static asset");
                    report.skipped.push(path.clone());
                }
            }
        }

        report
    }

    /// Delete every cache generation except the current ones, then claim
    /// all open clients. A store failure stops the pruning but not the claim.
    pub async fn activate(&self) -> Result<ActivateReport, WorkerError> {
        let mut report = ActivateReport::default();

        if let Some(store) = &self.store {
            if let Err(e) = self.prune_caches(store, &mut report.deleted) {
                warn!(error = %e, "cache pruning failed, keeping remaining generations");
            }
        }

        report.claimed = self.platform.claim_clients().await?;
        Ok(report)
    }

    fn prune_caches(&self, store: &StoreHandle, deleted: &mut Vec<String>) -> Result<(), StoreError> {
        let current = self.config.current_caches();
        let names = store.with(|db| db.cache_names())?;
        for name in names.into_iter().filter(|n| !current.contains(&n.as_str())) {
            let removed = store.with(|db| db.cache_delete(&name))?;
            info!(cache = %name, entries = removed, "deleted stale cache generation");
            deleted.push(name);
        }
        Ok(())
    }
}
