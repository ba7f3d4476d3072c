//! The application shell: owns every foreground component and the in-process
//! worker, and exposes the operations the UI calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bukukami_shared::http::Transport;
use bukukami_shared::types::{ApplicationServerKey, Bookmark, NewStory, Story};
use bukukami_shared::AppError;
use bukukami_store::{PendingStory, StoreHandle};
use bukukami_worker::{
    spawn_worker, ChannelPlatform, Platform, ReqwestTransport, Worker, WorkerHandle,
    WorkerNotification,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::api::{LoginResult, RemoteApi};
use crate::auth::{MemoryTokenStore, StoredTokenStore, TokenStore};
use crate::config::ClientConfig;
use crate::events::{Notice, Notices};
use crate::feed::{FeedView, StoryFeed};
use crate::outbox::{DrainReport, Outbox, RetryPolicy};
use crate::push::{PushManager, PushPlatform, SubscriptionState};
use crate::reminder::ReminderTimer;
use crate::submit::{StorySubmitter, SubmitOutcome};

/// Capacity of the worker effect channel created by [`App::start`].
const EFFECT_CHANNEL_CAPACITY: usize = 64;

/// Injected dependencies of an [`App`].
pub struct AppParts {
    pub network: Arc<dyn Transport>,
    pub worker_platform: Arc<dyn Platform>,
    pub push_platform: Arc<dyn PushPlatform>,
    pub store: Option<StoreHandle>,
}

/// Receivers the UI listens on.
pub struct AppChannels {
    pub notices: mpsc::UnboundedReceiver<Notice>,
    /// Notifications and windows requested by the worker. `None` when the
    /// caller supplied its own [`Platform`].
    pub worker_effects: Option<mpsc::Receiver<WorkerNotification>>,
}

pub struct App {
    worker: WorkerHandle,
    api: Arc<RemoteApi>,
    store: Option<StoreHandle>,
    outbox: Arc<Outbox>,
    feed: Mutex<StoryFeed>,
    submitter: StorySubmitter,
    push: PushManager,
    notices: Notices,
    online: AtomicBool,
}

impl App {
    /// Open the store, spawn the worker over the real network and build the
    /// components. Must be called from within a tokio runtime.
    ///
    /// A store that fails to open is not fatal: the app runs network-only
    /// and reports it once as a notice.
    pub fn start(
        config: ClientConfig,
        push_platform: Arc<dyn PushPlatform>,
    ) -> Result<(App, AppChannels), AppError> {
        let opened = match &config.worker.db_path {
            Some(path) => StoreHandle::open_at(path),
            None => StoreHandle::open_default(),
        };
        let (store, store_error) = match opened {
            Ok(store) => (Some(store), None),
            Err(e) => {
                warn!(error = %e, "Local store unavailable, running network-only");
                (None, Some(AppError::from(e)))
            }
        };

        let network: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::new(config.worker.request_timeout)?);
        let (platform, effects) = ChannelPlatform::new(EFFECT_CHANNEL_CAPACITY);

        let (app, mut channels) = Self::with_parts(
            config,
            AppParts {
                network,
                worker_platform: Arc::new(platform),
                push_platform,
                store,
            },
        )?;
        channels.worker_effects = Some(effects);

        if let Some(e) = store_error {
            app.notices.emit(Notice::Error(e.user_message()));
        }

        Ok((app, channels))
    }

    /// Build the app from explicit parts. Must be called from within a tokio
    /// runtime.
    pub fn with_parts(config: ClientConfig, parts: AppParts) -> Result<(App, AppChannels), AppError> {
        let server_key = ApplicationServerKey::from_base64url(&config.vapid_public_key)
            .map_err(|e| AppError::InvalidInput(format!("invalid VAPID public key: {e}")))?;

        let AppParts {
            network,
            worker_platform,
            push_platform,
            store,
        } = parts;

        let (notices, notice_rx) = Notices::channel();

        let worker = Worker::new(config.worker.clone(), network, store.clone(), worker_platform);
        let handle = spawn_worker(worker);
        let port = Arc::new(handle.clone());

        let tokens: Arc<dyn TokenStore> = match &store {
            Some(store) => Arc::new(StoredTokenStore::new(store.clone())),
            None => Arc::new(MemoryTokenStore::default()),
        };
        let api = Arc::new(RemoteApi::new(
            port.clone(),
            config.api_base_url().clone(),
            tokens,
        ));

        let policy = RetryPolicy {
            base: config.retry_base,
            max: config.retry_max,
            ..RetryPolicy::default()
        };
        let outbox = Arc::new(Outbox::new(
            api.clone(),
            store.clone(),
            notices.clone(),
            policy,
        ));
        let feed = StoryFeed::new(api.clone(), store.clone(), config.page_size);
        let submitter = StorySubmitter::new(
            api.clone(),
            store.clone(),
            outbox.clone(),
            notices.clone(),
        );
        let push = PushManager::new(
            push_platform,
            api.clone(),
            store.clone(),
            port.clone(),
            notices.clone(),
            ReminderTimer::new(port, config.reminder_interval),
            server_key,
        );
        push.resume();

        info!(
            api = %config.api_base_url(),
            store = store.is_some(),
            "application started"
        );

        let app = App {
            worker: handle,
            api,
            store,
            outbox,
            feed: Mutex::new(feed),
            submitter,
            push,
            notices,
            online: AtomicBool::new(true),
        };
        let channels = AppChannels {
            notices: notice_rx,
            worker_effects: None,
        };
        Ok((app, channels))
    }

    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record a connectivity change. Coming back online drains the outbox
    /// with every backoff forgotten.
    pub async fn set_online(&self, online: bool) -> Option<DrainReport> {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if !online || was_online {
            if !online && was_online {
                info!("connectivity lost");
            }
            return None;
        }

        info!("connectivity restored, draining outbox");
        self.outbox.reset_backoff();
        Some(self.outbox.drain().await)
    }

    /// Drain the outbox now, honouring backoff.
    pub async fn sync(&self) -> DrainReport {
        self.outbox.drain().await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String, AppError> {
        self.api.register_user(name, email, password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError> {
        self.api.login(email, password).await
    }

    pub fn logout(&self) -> Result<(), AppError> {
        self.api.logout()
    }

    pub fn is_signed_in(&self) -> bool {
        self.api.is_signed_in()
    }

    pub async fn submit_story(&self, story: NewStory) -> Result<SubmitOutcome, AppError> {
        self.submitter.submit(story).await
    }

    pub async fn refresh_feed(&self) -> Result<FeedView, AppError> {
        self.feed.lock().await.refresh().await
    }

    pub async fn load_more(&self) -> Result<FeedView, AppError> {
        self.feed.lock().await.load_next().await
    }

    /// Returns whether notifications are on afterwards.
    pub async fn toggle_push(&self) -> Result<bool, AppError> {
        self.push.toggle().await
    }

    pub fn push_state(&self) -> SubscriptionState {
        self.push.state()
    }

    /// Returns whether the story is bookmarked afterwards.
    pub fn toggle_bookmark(&self, story: &Story) -> Result<bool, AppError> {
        let store = self.require_store()?;
        let bookmark = Bookmark::from(story);
        Ok(store.with(|db| db.toggle_bookmark(&bookmark))?)
    }

    pub fn is_bookmarked(&self, id: &str) -> Result<bool, AppError> {
        let store = self.require_store()?;
        Ok(store.with(|db| db.is_bookmarked(id))?)
    }

    pub fn bookmarks(&self) -> Result<Vec<Bookmark>, AppError> {
        let store = self.require_store()?;
        Ok(store.with(|db| db.bookmarks())?)
    }

    /// Stories still waiting in the outbox.
    pub fn pending_stories(&self) -> Result<Vec<PendingStory>, AppError> {
        let store = self.require_store()?;
        Ok(store.with(|db| db.pending_stories())?)
    }

    /// Stop the worker. Components keep working until dropped but every
    /// request fails as if offline.
    pub async fn shutdown(&self) {
        if let Err(e) = self.worker.shutdown().await {
            warn!(error = %e, "Worker already stopped");
        }
    }

    fn require_store(&self) -> Result<&StoreHandle, AppError> {
        self.store
            .as_ref()
            .ok_or_else(|| AppError::StorageUnavailable("no local store".into()))
    }
}
