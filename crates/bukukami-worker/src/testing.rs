use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bukukami_shared::http::{HttpRequest, HttpResponse, Transport};
use bukukami_shared::TransportError;
use bukukami_store::StoreHandle;

use crate::config::WorkerConfig;
use crate::dispatch::Worker;
use crate::platform::{ChannelPlatform, WorkerNotification};

/// Answers by exact URL. Unknown URLs and everything while offline fail
/// with a network error.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, HttpResponse>>,
    offline: AtomicBool,
    seen: Mutex<Vec<HttpRequest>>,
}

impl FakeNetwork {
    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeNetwork {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Network("connection refused".into()));
        }
        self.routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| TransportError::Network(format!("no route to {}", request.url)))
    }
}

pub struct Harness {
    pub worker: Worker,
    pub network: Arc<FakeNetwork>,
    pub store: StoreHandle,
    pub effects: tokio::sync::mpsc::Receiver<WorkerNotification>,
    _dir: tempfile::TempDir,
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreHandle::open_at(&dir.path().join("worker.db")).unwrap();
    let network = Arc::new(FakeNetwork::default());
    let (platform, effects) = ChannelPlatform::new(32);
    let worker = Worker::new(
        WorkerConfig::default(),
        network.clone(),
        Some(store.clone()),
        Arc::new(platform),
    );
    Harness {
        worker,
        network,
        store,
        effects,
        _dir: dir,
    }
}
