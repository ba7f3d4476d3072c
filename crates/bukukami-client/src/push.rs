//! Push subscription lifecycle.
//!
//! `Unsubscribed -> Subscribing -> Subscribed -> Unsubscribing -> Unsubscribed`.
//!
//! The platform subscription is the source of truth for whether the user is
//! subscribed. The local record, the server registration and the durable
//! flag are mirrors; a failure to update one of them is reported as a
//! warning and never rolled back.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bukukami_shared::protocol::{MessagePort, WorkerMessage};
use bukukami_shared::types::{ApplicationServerKey, PushSubscription};
use bukukami_shared::{AppError, Permission};
use bukukami_store::{StoreHandle, FLAG_SUBSCRIBED};
use tracing::{info, warn};

use crate::api::PushRegistry;
use crate::events::{Notice, Notices};
use crate::reminder::ReminderTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not decided yet; asking is allowed.
    Prompt,
}

/// The platform push service.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    async fn permission(&self) -> PermissionState;
    async fn request_permission(&self) -> PermissionState;
    async fn subscription(&self) -> Result<Option<PushSubscription>, AppError>;
    async fn subscribe(&self, key: &ApplicationServerKey) -> Result<PushSubscription, AppError>;
    async fn unsubscribe(&self, endpoint: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
    Unsubscribing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeReport {
    pub subscription: PushSubscription,
    /// Mirror steps that failed; the platform subscription stands.
    pub warnings: Vec<AppError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed(SubscribeReport),
    AlreadySubscribed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Unsubscribed { warnings: Vec<AppError> },
    NotSubscribed,
}

pub struct PushManager {
    platform: Arc<dyn PushPlatform>,
    registry: Arc<dyn PushRegistry>,
    store: Option<StoreHandle>,
    port: Arc<dyn MessagePort>,
    notices: Notices,
    reminder: ReminderTimer,
    server_key: ApplicationServerKey,
    state: Mutex<SubscriptionState>,
}

impl PushManager {
    pub fn new(
        platform: Arc<dyn PushPlatform>,
        registry: Arc<dyn PushRegistry>,
        store: Option<StoreHandle>,
        port: Arc<dyn MessagePort>,
        notices: Notices,
        reminder: ReminderTimer,
        server_key: ApplicationServerKey,
    ) -> Self {
        Self {
            platform,
            registry,
            store,
            port,
            notices,
            reminder,
            server_key,
            state: Mutex::new(SubscriptionState::Unsubscribed),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(SubscriptionState::Unsubscribed)
    }

    pub fn reminder_running(&self) -> bool {
        self.reminder.is_running()
    }

    fn set_state(&self, next: SubscriptionState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Move into a transient state unless another transition is running.
    fn begin(&self, transient: SubscriptionState) -> Result<SubscriptionState, AppError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Busy)?;
        match *state {
            SubscriptionState::Subscribing | SubscriptionState::Unsubscribing => Err(AppError::Busy),
            previous => {
                *state = transient;
                Ok(previous)
            }
        }
    }

    /// Re-arm the reminder after a restart if the durable flag says the user
    /// was subscribed.
    pub fn resume(&self) {
        let Some(store) = &self.store else {
            return;
        };
        match store.with(|db| db.get_flag(FLAG_SUBSCRIBED)) {
            Ok(Some(flag)) if flag == "true" => {
                info!("resuming reminder for subscribed user");
                self.set_state(SubscriptionState::Subscribed);
                self.reminder.start();
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "cannot read subscription flag"),
        }
    }

    pub async fn subscribe(&self) -> Result<SubscribeOutcome, AppError> {
        self.begin(SubscriptionState::Subscribing)?;

        match self.platform.subscription().await {
            Ok(Some(_)) => {
                self.set_state(SubscriptionState::Subscribed);
                return Ok(SubscribeOutcome::AlreadySubscribed);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "cannot query platform subscription"),
        }

        let mut permission = self.platform.permission().await;
        if permission == PermissionState::Prompt {
            permission = self.platform.request_permission().await;
        }
        if permission != PermissionState::Granted {
            self.set_state(SubscriptionState::Unsubscribed);
            let err = AppError::PermissionDenied(Permission::Notification);
            self.notices.emit(Notice::Error(err.user_message()));
            return Err(err);
        }

        let subscription = match self.platform.subscribe(&self.server_key).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.set_state(SubscriptionState::Unsubscribed);
                let err = AppError::PushUnavailable(e.to_string());
                self.notices.emit(Notice::Error(err.user_message()));
                return Err(err);
            }
        };
        info!(endpoint = %subscription.endpoint, "platform subscription created");

        let mut warnings: Vec<AppError> = Vec::new();

        match &self.store {
            Some(store) => {
                if let Err(e) = store.with(|db| db.save_subscription(&subscription)) {
                    warnings.push(e.into());
                }
            }
            None => warnings.push(AppError::StorageUnavailable("no local store".into())),
        }

        if let Err(e) = self.registry.register(&subscription).await {
            warnings.push(e);
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.with(|db| db.set_flag(FLAG_SUBSCRIBED, "true")) {
                warnings.push(e.into());
            }
        }

        self.reminder.start();

        if let Err(e) = self
            .port
            .post_message(WorkerMessage::show(
                "Notifications enabled",
                "You are now subscribed to notifications.",
            ))
            .await
        {
            warnings.push(e.into());
        }

        self.set_state(SubscriptionState::Subscribed);
        self.notices.emit(Notice::Subscribed);
        for warning in &warnings {
            warn!(error = %warning, "subscription step failed");
            self.notices.emit(Notice::Error(warning.user_message()));
        }

        Ok(SubscribeOutcome::Subscribed(SubscribeReport {
            subscription,
            warnings,
        }))
    }

    pub async fn unsubscribe(&self) -> Result<UnsubscribeOutcome, AppError> {
        let previous = self.begin(SubscriptionState::Unsubscribing)?;

        let subscription = match self.platform.subscription().await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => {
                self.set_state(SubscriptionState::Unsubscribed);
                self.notices
                    .emit(Notice::Info("There is no active subscription.".into()));
                return Ok(UnsubscribeOutcome::NotSubscribed);
            }
            Err(e) => {
                self.set_state(previous);
                return Err(AppError::PushUnavailable(e.to_string()));
            }
        };

        let mut warnings: Vec<AppError> = Vec::new();

        if let Err(e) = self.registry.unregister(&subscription.endpoint).await {
            warnings.push(e);
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.with(|db| db.remove_subscription(&subscription.endpoint)) {
                warnings.push(e.into());
            }
        }

        if let Err(e) = self.platform.unsubscribe(&subscription.endpoint).await {
            self.set_state(SubscriptionState::Subscribed);
            let err = AppError::PushUnavailable(e.to_string());
            self.notices.emit(Notice::Error(err.user_message()));
            return Err(err);
        }
        info!(endpoint = %subscription.endpoint, "platform subscription revoked");

        if let Some(store) = &self.store {
            if let Err(e) = store.with(|db| db.remove_flag(FLAG_SUBSCRIBED)) {
                warnings.push(e.into());
            }
        }

        self.reminder.stop();

        if let Err(e) = self
            .port
            .post_message(WorkerMessage::show(
                "Unsubscribed",
                "You have unsubscribed from notifications.",
            ))
            .await
        {
            warnings.push(e.into());
        }

        self.set_state(SubscriptionState::Unsubscribed);
        self.notices.emit(Notice::Unsubscribed);
        for warning in &warnings {
            warn!(error = %warning, "unsubscribe step failed");
            self.notices.emit(Notice::Error(warning.user_message()));
        }

        Ok(UnsubscribeOutcome::Unsubscribed { warnings })
    }

    /// Subscribe or unsubscribe depending on whether a platform subscription
    /// exists. Returns whether the user is subscribed afterwards.
    pub async fn toggle(&self) -> Result<bool, AppError> {
        if self.platform.subscription().await?.is_some() {
            self.unsubscribe().await?;
            Ok(false)
        } else {
            self.subscribe().await?;
            Ok(true)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use bukukami_shared::constants::DEFAULT_VAPID_PUBLIC_KEY;
    use bukukami_shared::types::SubscriptionKeys;

    use super::*;
    use crate::reminder::tests::RecordingPort;

    pub struct FakePushPlatform {
        pub permission: Mutex<PermissionState>,
        /// Answer to a permission prompt.
        pub prompt_answer: PermissionState,
        pub current: Mutex<Option<PushSubscription>>,
        pub fail_subscribe: bool,
        pub fail_unsubscribe: Mutex<bool>,
    }

    impl Default for FakePushPlatform {
        fn default() -> Self {
            Self {
                permission: Mutex::new(PermissionState::Prompt),
                prompt_answer: PermissionState::Granted,
                current: Mutex::new(None),
                fail_subscribe: false,
                fail_unsubscribe: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl PushPlatform for FakePushPlatform {
        async fn permission(&self) -> PermissionState {
            *self.permission.lock().unwrap()
        }

        async fn request_permission(&self) -> PermissionState {
            *self.permission.lock().unwrap() = self.prompt_answer;
            self.prompt_answer
        }

        async fn subscription(&self) -> Result<Option<PushSubscription>, AppError> {
            Ok(self.current.lock().unwrap().clone())
        }

        async fn subscribe(&self, key: &ApplicationServerKey) -> Result<PushSubscription, AppError> {
            assert_eq!(key.as_bytes().len(), 65);
            if self.fail_subscribe {
                return Err(AppError::PushUnavailable("push service unreachable".into()));
            }
            let sub = PushSubscription {
                endpoint: "https://push.example/sub-1".into(),
                keys: SubscriptionKeys {
                    p256dh: "BPub".into(),
                    auth: "auth".into(),
                },
            };
            *self.current.lock().unwrap() = Some(sub.clone());
            Ok(sub)
        }

        async fn unsubscribe(&self, _endpoint: &str) -> Result<(), AppError> {
            if *self.fail_unsubscribe.lock().unwrap() {
                return Err(AppError::PushUnavailable("revoke failed".into()));
            }
            *self.current.lock().unwrap() = None;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeRegistry {
        pub registered: Mutex<Vec<String>>,
        pub offline: bool,
    }

    #[async_trait]
    impl PushRegistry for FakeRegistry {
        async fn register(&self, subscription: &PushSubscription) -> Result<(), AppError> {
            if self.offline {
                return Err(AppError::NetworkUnavailable("offline".into()));
            }
            self.registered
                .lock()
                .unwrap()
                .push(subscription.endpoint.clone());
            Ok(())
        }

        async fn unregister(&self, endpoint: &str) -> Result<(), AppError> {
            if self.offline {
                return Err(AppError::NetworkUnavailable("offline".into()));
            }
            self.registered.lock().unwrap().retain(|e| e != endpoint);
            Ok(())
        }
    }

    struct Setup {
        manager: PushManager,
        platform: Arc<FakePushPlatform>,
        registry: Arc<FakeRegistry>,
        port: Arc<RecordingPort>,
        store: StoreHandle,
        notices: tokio::sync::mpsc::UnboundedReceiver<Notice>,
        _dir: tempfile::TempDir,
    }

    fn setup_with(platform: FakePushPlatform, registry: FakeRegistry) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreHandle::open_at(&dir.path().join("test.db")).unwrap();
        let platform = Arc::new(platform);
        let registry = Arc::new(registry);
        let port = Arc::new(RecordingPort::default());
        let (notices, notice_rx) = Notices::channel();
        let manager = PushManager::new(
            platform.clone(),
            registry.clone(),
            Some(store.clone()),
            port.clone(),
            notices,
            ReminderTimer::new(port.clone(), Duration::from_secs(60)),
            ApplicationServerKey::from_base64url(DEFAULT_VAPID_PUBLIC_KEY).unwrap(),
        );
        Setup {
            manager,
            platform,
            registry,
            port,
            store,
            notices: notice_rx,
            _dir: dir,
        }
    }

    fn setup() -> Setup {
        setup_with(FakePushPlatform::default(), FakeRegistry::default())
    }

    #[tokio::test]
    async fn subscribe_mirrors_everywhere() {
        let s = setup();
        let outcome = s.manager.subscribe().await.unwrap();
        let SubscribeOutcome::Subscribed(report) = outcome else {
            panic!("expected a new subscription");
        };
        assert!(report.warnings.is_empty());

        assert_eq!(s.manager.state(), SubscriptionState::Subscribed);
        assert_eq!(s.store.with(|db| db.subscriptions()).unwrap(), vec![report.subscription.clone()]);
        assert_eq!(*s.registry.registered.lock().unwrap(), vec![report.subscription.endpoint]);
        assert_eq!(
            s.store.with(|db| db.get_flag(FLAG_SUBSCRIBED)).unwrap().as_deref(),
            Some("true")
        );
        assert!(s.manager.reminder_running());
        assert_eq!(s.port.titles(), vec!["Notifications enabled"]);
    }

    #[tokio::test]
    async fn toggle_twice_leaves_nothing_behind() {
        let s = setup();
        assert!(s.manager.toggle().await.unwrap());
        assert!(!s.manager.toggle().await.unwrap());

        assert!(s.platform.current.lock().unwrap().is_none());
        assert!(s.store.with(|db| db.subscriptions()).unwrap().is_empty());
        assert_eq!(s.store.with(|db| db.get_flag(FLAG_SUBSCRIBED)).unwrap(), None);
        assert!(!s.manager.reminder_running());
        assert_eq!(s.manager.state(), SubscriptionState::Unsubscribed);
        assert!(s.registry.registered.lock().unwrap().is_empty());
        assert_eq!(s.port.titles(), vec!["Notifications enabled", "Unsubscribed"]);
    }

    #[tokio::test]
    async fn denied_permission_aborts() {
        let platform = FakePushPlatform {
            prompt_answer: PermissionState::Denied,
            ..FakePushPlatform::default()
        };
        let s = setup_with(platform, FakeRegistry::default());

        assert_eq!(
            s.manager.subscribe().await,
            Err(AppError::PermissionDenied(Permission::Notification))
        );
        assert_eq!(s.manager.state(), SubscriptionState::Unsubscribed);
        assert!(s.platform.current.lock().unwrap().is_none());
        assert!(!s.manager.reminder_running());
    }

    #[tokio::test]
    async fn platform_failure_is_push_unavailable() {
        let platform = FakePushPlatform {
            fail_subscribe: true,
            ..FakePushPlatform::default()
        };
        let s = setup_with(platform, FakeRegistry::default());

        assert!(matches!(
            s.manager.subscribe().await,
            Err(AppError::PushUnavailable(_))
        ));
        assert_eq!(s.manager.state(), SubscriptionState::Unsubscribed);
        assert!(s.store.with(|db| db.subscriptions()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_failure_is_reported_not_rolled_back() {
        let registry = FakeRegistry {
            offline: true,
            ..FakeRegistry::default()
        };
        let s = setup_with(FakePushPlatform::default(), registry);

        let SubscribeOutcome::Subscribed(report) = s.manager.subscribe().await.unwrap() else {
            panic!("expected a new subscription");
        };
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(report.warnings[0], AppError::NetworkUnavailable(_)));
        // The local record stays.
        assert_eq!(s.store.with(|db| db.subscriptions()).unwrap().len(), 1);
        assert!(s.platform.current.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn unsubscribe_surfaces_server_failure() {
        let mut s = setup();
        s.manager.subscribe().await.unwrap();
        while s.notices.try_recv().is_ok() {}

        // Registry goes away between the two transitions.
        let offline = Arc::new(FakeRegistry {
            offline: true,
            ..FakeRegistry::default()
        });
        let manager = PushManager {
            registry: offline,
            ..s.manager
        };

        let UnsubscribeOutcome::Unsubscribed { warnings } = manager.unsubscribe().await.unwrap() else {
            panic!("expected an unsubscription");
        };
        assert_eq!(warnings.len(), 1);
        assert!(s.platform.current.lock().unwrap().is_none());
        assert_eq!(s.notices.try_recv().unwrap(), Notice::Unsubscribed);
        assert_eq!(
            s.notices.try_recv().unwrap(),
            Notice::Error(warnings[0].user_message())
        );
    }

    #[tokio::test]
    async fn already_subscribed_is_reported() {
        let s = setup();
        s.manager.subscribe().await.unwrap();
        assert_eq!(
            s.manager.subscribe().await.unwrap(),
            SubscribeOutcome::AlreadySubscribed
        );
    }

    #[tokio::test]
    async fn unsubscribe_without_subscription_is_a_no_op() {
        let s = setup();
        assert_eq!(
            s.manager.unsubscribe().await.unwrap(),
            UnsubscribeOutcome::NotSubscribed
        );
        assert!(s.port.titles().is_empty());
    }

    #[tokio::test]
    async fn failed_revoke_keeps_subscribed() {
        let s = setup();
        s.manager.subscribe().await.unwrap();
        *s.platform.fail_unsubscribe.lock().unwrap() = true;

        assert!(matches!(
            s.manager.unsubscribe().await,
            Err(AppError::PushUnavailable(_))
        ));
        assert_eq!(s.manager.state(), SubscriptionState::Subscribed);
        assert!(s.manager.reminder_running());
        assert_eq!(
            s.store.with(|db| db.get_flag(FLAG_SUBSCRIBED)).unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn transitions_do_not_overlap() {
        let s = setup();
        s.manager.begin(SubscriptionState::Subscribing).unwrap();
        assert_eq!(s.manager.subscribe().await, Err(AppError::Busy));
        assert_eq!(s.manager.unsubscribe().await, Err(AppError::Busy));
    }

    #[tokio::test]
    async fn resume_rearms_from_flag() {
        let s = setup();
        s.manager.resume();
        assert!(!s.manager.reminder_running());

        s.store.with(|db| db.set_flag(FLAG_SUBSCRIBED, "true")).unwrap();
        s.manager.resume();
        assert!(s.manager.reminder_running());
        assert_eq!(s.manager.state(), SubscriptionState::Subscribed);
    }
}
