//! Outbox sync engine: replays queued story submissions.
//!
//! Pending records are attempted one at a time, oldest first. A record is
//! deleted only after the server accepted that exact submission; a failure
//! leaves it in place, schedules a capped exponential backoff for it and
//! moves on to the next record.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bukukami_store::StoreHandle;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::StoryService;
use crate::events::{Notice, Notices};

/// Capped exponential backoff with additive jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max: Duration,
    /// Upper bound of the random extra delay, as a fraction of the delay.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            max: Duration::from_secs(300),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `failures` consecutive failures,
    /// without jitter.
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max)
            .min(self.max)
    }

    fn jittered(&self, failures: u32) -> Duration {
        let delay = self.delay(failures);
        if self.jitter <= 0.0 {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
        delay + delay.mul_f64(extra)
    }
}

#[derive(Debug, Clone, Copy)]
struct Backoff {
    failures: u32,
    next_attempt: Instant,
}

/// Result of one drain cycle, by temp id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub sent: Vec<i64>,
    pub failed: Vec<i64>,
    /// Still backing off; not attempted this cycle.
    pub deferred: Vec<i64>,
}

pub struct Outbox {
    service: Arc<dyn StoryService>,
    store: Option<StoreHandle>,
    notices: Notices,
    policy: RetryPolicy,
    backoff: Mutex<HashMap<i64, Backoff>>,
    drain_lock: tokio::sync::Mutex<()>,
}

impl Outbox {
    pub fn new(
        service: Arc<dyn StoryService>,
        store: Option<StoreHandle>,
        notices: Notices,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            store,
            notices,
            policy,
            backoff: Mutex::new(HashMap::new()),
            drain_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Forget every backoff so the next drain attempts all records.
    pub fn reset_backoff(&self) {
        if let Ok(mut backoff) = self.backoff.lock() {
            backoff.clear();
        }
    }

    /// Attempt every pending record once, in insertion order.
    pub async fn drain(&self) -> DrainReport {
        let _guard = self.drain_lock.lock().await;
        let mut report = DrainReport::default();

        let Some(store) = &self.store else {
            return report;
        };

        let pending = match store.with(|db| db.pending_stories()) {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "cannot read outbox");
                return report;
            }
        };
        if pending.is_empty() {
            return report;
        }

        info!(count = pending.len(), "draining outbox");
        self.forget_missing(pending.iter().filter_map(|p| p.temp_id));

        for record in pending {
            let Some(temp_id) = record.temp_id else {
                continue;
            };

            if let Some(wait) = self.remaining_backoff(temp_id) {
                debug!(temp_id, ?wait, "record still backing off");
                report.deferred.push(temp_id);
                continue;
            }

            match self.service.submit_story(&record.to_new_story()).await {
                Ok(message) => {
                    info!(temp_id, %message, "queued story sent");
                    match store.with(|db| db.remove_pending_story(temp_id)) {
                        Ok(_) => {
                            self.clear_backoff(temp_id);
                            self.notices.emit(Notice::StorySynced { temp_id });
                            report.sent.push(temp_id);
                        }
                        Err(e) => {
                            let delay = self.record_failure(temp_id);
                            error!(
                                temp_id,
                                error = %e,
                                retry_in = ?delay,
                                "sent story could not be removed, it will be resent"
                            );
                            report.failed.push(temp_id);
                        }
                    }
                }
                Err(e) => {
                    let delay = self.record_failure(temp_id);
                    warn!(temp_id, error = %e, retry_in = ?delay, "queued story not sent");
                    report.failed.push(temp_id);
                }
            }
        }

        report
    }

    fn remaining_backoff(&self, temp_id: i64) -> Option<Duration> {
        let backoff = self.backoff.lock().ok()?;
        let entry = backoff.get(&temp_id)?;
        let now = Instant::now();
        (entry.next_attempt > now).then(|| entry.next_attempt - now)
    }

    fn record_failure(&self, temp_id: i64) -> Duration {
        let Ok(mut backoff) = self.backoff.lock() else {
            return Duration::ZERO;
        };
        let failures = backoff.get(&temp_id).map_or(0, |b| b.failures) + 1;
        let delay = self.policy.jittered(failures);
        backoff.insert(
            temp_id,
            Backoff {
                failures,
                next_attempt: Instant::now() + delay,
            },
        );
        delay
    }

    fn clear_backoff(&self, temp_id: i64) {
        if let Ok(mut backoff) = self.backoff.lock() {
            backoff.remove(&temp_id);
        }
    }

    fn forget_missing(&self, present: impl Iterator<Item = i64>) {
        let present: std::collections::HashSet<i64> = present.collect();
        if let Ok(mut backoff) = self.backoff.lock() {
            backoff.retain(|id, _| present.contains(id));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use bukukami_shared::types::{NewStory, Photo, Story};
    use bukukami_shared::AppError;

    use super::*;

    /// Fails submissions whose description is in `failing`; records every
    /// attempted description.
    #[derive(Default)]
    pub struct FakeStories {
        pub failing: Mutex<HashSet<String>>,
        pub attempts: Mutex<Vec<String>>,
        pub offline: std::sync::atomic::AtomicBool,
        pub pages: Mutex<Vec<Vec<Story>>>,
    }

    impl FakeStories {
        pub fn fail(&self, description: &str) {
            self.failing.lock().unwrap().insert(description.to_string());
        }

        pub fn heal(&self, description: &str) {
            self.failing.lock().unwrap().remove(description);
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline
                .store(offline, std::sync::atomic::Ordering::SeqCst);
        }

        fn is_offline(&self) -> bool {
            self.offline.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoryService for FakeStories {
        async fn list_stories(&self, page: u32, _size: u32) -> Result<Vec<Story>, AppError> {
            if self.is_offline() {
                return Err(AppError::NetworkUnavailable("offline".into()));
            }
            let pages = self.pages.lock().unwrap();
            Ok(pages.get(page as usize - 1).cloned().unwrap_or_default())
        }

        async fn submit_story(&self, story: &NewStory) -> Result<String, AppError> {
            self.attempts.lock().unwrap().push(story.description.clone());
            if self.is_offline() {
                return Err(AppError::NetworkUnavailable("offline".into()));
            }
            if self.failing.lock().unwrap().contains(&story.description) {
                return Err(AppError::RemoteRejected {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok("Story created successfully".into())
        }
    }

    pub fn new_story(description: &str) -> NewStory {
        NewStory {
            description: description.into(),
            photo: Photo::jpeg(vec![0xFF, 0xD8]),
            lat: None,
            lon: None,
        }
    }

    fn setup(policy: RetryPolicy) -> (Outbox, Arc<FakeStories>, StoreHandle, tokio::sync::mpsc::UnboundedReceiver<Notice>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreHandle::open_at(&dir.path().join("test.db")).unwrap();
        let stories = Arc::new(FakeStories::default());
        let (notices, rx) = Notices::channel();
        let outbox = Outbox::new(stories.clone(), Some(store.clone()), notices, policy);
        (outbox, stories, store, rx, dir)
    }

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        }
    }

    fn queue(store: &StoreHandle, description: &str) -> i64 {
        store
            .with(|db| db.add_pending_story(new_story(description)))
            .unwrap()
    }

    #[test]
    fn delay_doubles_and_caps() {
        let policy = no_jitter();
        assert_eq!(policy.delay(1), Duration::from_secs(5));
        assert_eq!(policy.delay(2), Duration::from_secs(10));
        assert_eq!(policy.delay(3), Duration::from_secs(20));
        assert_eq!(policy.delay(7), Duration::from_secs(300));
        assert_eq!(policy.delay(40), Duration::from_secs(300));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let d = policy.jittered(2);
            assert!(d >= Duration::from_secs(10) && d <= Duration::from_secs(12));
        }
    }

    #[tokio::test]
    async fn failing_middle_record_stays() {
        let (outbox, stories, store, mut rx, _dir) = setup(no_jitter());
        let a = queue(&store, "one");
        let b = queue(&store, "two");
        let c = queue(&store, "three");
        stories.fail("two");

        let report = outbox.drain().await;
        assert_eq!(report.sent, vec![a, c]);
        assert_eq!(report.failed, vec![b]);
        assert_eq!(*stories.attempts.lock().unwrap(), vec!["one", "two", "three"]);

        let left: Vec<_> = store
            .with(|db| db.pending_stories())
            .unwrap()
            .into_iter()
            .filter_map(|p| p.temp_id)
            .collect();
        assert_eq!(left, vec![b]);

        assert_eq!(rx.try_recv().unwrap(), Notice::StorySynced { temp_id: a });
        assert_eq!(rx.try_recv().unwrap(), Notice::StorySynced { temp_id: c });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_defers_then_retries() {
        let (outbox, stories, store, _rx, _dir) = setup(no_jitter());
        let a = queue(&store, "flaky");
        let b = queue(&store, "fine");
        stories.fail("flaky");

        let first = outbox.drain().await;
        assert_eq!(first.failed, vec![a]);
        assert_eq!(first.sent, vec![b]);

        // Inside the 5 s window the record is not attempted.
        tokio::time::advance(Duration::from_secs(3)).await;
        let second = outbox.drain().await;
        assert_eq!(second.deferred, vec![a]);
        assert_eq!(stories.attempts.lock().unwrap().len(), 2);

        // Second failure doubles the delay to 10 s.
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(outbox.drain().await.failed, vec![a]);
        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(outbox.drain().await.deferred, vec![a]);

        stories.heal("flaky");
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(outbox.drain().await.sent, vec![a]);
        assert!(store.with(|db| db.pending_stories()).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_backoff_allows_immediate_retry() {
        let (outbox, stories, store, _rx, _dir) = setup(no_jitter());
        let a = queue(&store, "x");
        stories.set_offline(true);
        assert_eq!(outbox.drain().await.failed, vec![a]);

        stories.set_offline(false);
        assert_eq!(outbox.drain().await.deferred, vec![a]);
        outbox.reset_backoff();
        assert_eq!(outbox.drain().await.sent, vec![a]);
    }

    #[tokio::test(start_paused = true)]
    async fn undeletable_record_is_not_reported_synced() {
        let (outbox, stories, store, mut rx, _dir) = setup(no_jitter());
        let a = queue(&store, "x");
        store
            .with(|db| {
                Ok(db.conn().execute_batch(
                    "CREATE TRIGGER keep_pending BEFORE DELETE ON pending_stories
                     BEGIN SELECT RAISE(ABORT, 'read-only'); END;",
                )?)
            })
            .unwrap();

        let first = outbox.drain().await;
        assert!(first.sent.is_empty());
        assert_eq!(first.failed, vec![a]);
        assert!(rx.try_recv().is_err());
        assert_eq!(store.with(|db| db.pending_stories()).unwrap().len(), 1);

        // The resend waits for the backoff instead of going out at once.
        assert_eq!(outbox.drain().await.deferred, vec![a]);
        assert_eq!(stories.attempts.lock().unwrap().len(), 1);

        store
            .with(|db| Ok(db.conn().execute_batch("DROP TRIGGER keep_pending")?))
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(outbox.drain().await.sent, vec![a]);
        assert_eq!(rx.try_recv().unwrap(), Notice::StorySynced { temp_id: a });
    }

    #[tokio::test]
    async fn no_store_is_a_no_op() {
        let stories = Arc::new(FakeStories::default());
        let outbox = Outbox::new(stories.clone(), None, Notices::disabled(), no_jitter());
        assert_eq!(outbox.drain().await, DrainReport::default());
        assert!(stories.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_drains_do_not_double_send() {
        let (outbox, stories, store, _rx, _dir) = setup(no_jitter());
        queue(&store, "only");

        let outbox = Arc::new(outbox);
        let (r1, r2) = tokio::join!(outbox.drain(), outbox.drain());
        assert_eq!(r1.sent.len() + r2.sent.len(), 1);
        assert_eq!(stories.attempts.lock().unwrap().len(), 1);
    }
}
