//! Per-route fetch policies.

use bukukami_shared::http::{HttpRequest, HttpResponse};
use bukukami_shared::TransportError;
use tracing::{debug, warn};

use crate::dispatch::Worker;
use crate::routes::{classify, RouteClass};

impl Worker {
    /// Route an intercepted request to its caching policy.
    pub async fn handle_fetch(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let class = classify(&request, &self.config.api_origin());
        debug!(method = %request.method, url = %request.url, ?class, "intercepted request");

        match class {
            RouteClass::ApiRead => Ok(self.network_first(request).await),
            RouteClass::ApiPassthrough => self.network.send(request).await,
            RouteClass::Static => self.cache_first(request).await,
        }
    }

    /// Network-first, cache-fallback.
    ///
    /// 2xx responses are copied into the API cache. A transport error or a
    /// 5xx falls back to the cached copy; a 4xx is returned as-is. With
    /// nothing cached a transport error yields the synthesized offline 503.
    pub async fn network_first(&self, request: HttpRequest) -> HttpResponse {
        let key = request.cache_key();

        match self.network.send(request).await {
            Ok(response) if response.is_success() => {
                self.store_api_copy(&key, &response);
                response
            }
            Ok(response) if response.status < 500 => response,
            Ok(response) => {
                warn!(key = %key, status = response.status, "server error, trying API cache");
                self.api_cache_lookup(&key).unwrap_or(response)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "network unavailable, trying API cache");
                self.api_cache_lookup(&key)
                    .unwrap_or_else(HttpResponse::offline)
            }
        }
    }

    /// Cache-first, network-fallback. Nothing is written back.
    pub async fn cache_first(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = request.cache_key();
        if let Some(store) = &self.store {
            match store.with(|db| db.cache_match_any(&key)) {
                Ok(Some(entry)) => {
                    debug!(key = %key, "served from cache");
                    return Ok(entry.into_response());
                }
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "cache lookup failed"),
            }
        }
        self.network.send(request).await
    }

    fn store_api_copy(&self, key: &str, response: &HttpResponse) {
        let Some(store) = &self.store else {
            return;
        };
        let cache = &self.config.api_cache_name;
        if let Err(e) = store.with(|db| db.cache_put(cache, key, response)) {
            warn!(key = %key, error = %e, "failed to cache API response");
        }
    }

    fn api_cache_lookup(&self, key: &str) -> Option<HttpResponse> {
        let store = self.store.as_ref()?;
        match store.with(|db| db.cache_match(&self.config.api_cache_name, key)) {
            Ok(Some(entry)) => {
                debug!(key = %key, stored_at = %entry.stored_at, "serving cached API response");
                Some(entry.into_response())
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "API cache lookup failed");
                None
            }
        }
    }
}
