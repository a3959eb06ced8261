//! Live segment log of the current pairing
//!
//! The latest list is published through a `tokio::sync::watch` channel, so
//! observers can either read it or wait for the next change.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use tokio::{sync::watch, task::JoinHandle};

use crate::domain::{Notice, Notifier, PairingKey, RemoteStore, SegmentLogRecord};

pub struct LogFeed {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    entries: watch::Sender<Vec<SegmentLogRecord>>,
    /// Bumped by every `watch`; a task only publishes while its value is current
    generation: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LogFeed {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (entries, _) = watch::channel(Vec::new());
        Self {
            store,
            notifier,
            entries,
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Follow the records of `pairing_key`, replacing any previous subscription.
    ///
    /// The list is cleared immediately and stays empty while unpaired.
    pub fn watch(&self, pairing_key: Option<PairingKey>) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = task.take() {
            previous.abort();
        }
        // abort() does not stop a task that is being polled right now
        let current = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.send_replace(Vec::new());

        let Some(pairing_key) = pairing_key else {
            return;
        };

        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let entries = self.entries.clone();
        let generation = self.generation.clone();
        *task = Some(tokio::spawn(async move {
            let mut subscription = match store.subscribe_records(&pairing_key).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    tracing::warn!("Failed to subscribe to records of '{}': {}", pairing_key, e);
                    notifier.notify(Notice::destructive(
                        "Error",
                        "Could not fetch our focus journal.",
                    ));
                    return;
                }
            };

            while let Some(mut records) = subscription.next().await {
                records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
                tracing::debug!("{} log entries for '{}'", records.len(), pairing_key);
                if !publish_if_current(&entries, &generation, current, records) {
                    return;
                }
            }

            if generation.load(Ordering::SeqCst) != current {
                tracing::debug!("Record subscription for '{}' ended", pairing_key);
                return;
            }
            tracing::warn!("Lost the record subscription of '{}'", pairing_key);
            notifier.notify(Notice::destructive(
                "Error",
                "Lost our focus journal. Link your partner again to reconnect.",
            ));
        }));
    }

    /// Whether a record subscription is currently being followed
    pub fn is_live(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Receiver that observes every replacement of the list
    pub fn subscribe(&self) -> watch::Receiver<Vec<SegmentLogRecord>> {
        self.entries.subscribe()
    }

    /// Latest list, newest first
    pub fn latest(&self) -> Vec<SegmentLogRecord> {
        self.entries.borrow().clone()
    }
}

/// Replace the list unless a newer `watch` has taken over.
///
/// The check runs under the channel's write lock, so it cannot interleave with
/// the clear done by `watch`.
fn publish_if_current(
    entries: &watch::Sender<Vec<SegmentLogRecord>>,
    generation: &AtomicU64,
    current: u64,
    records: Vec<SegmentLogRecord>,
) -> bool {
    entries.send_if_modified(|list| {
        if generation.load(Ordering::SeqCst) != current {
            return false;
        }
        *list = records;
        true
    })
}

impl Drop for LogFeed {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{
        NewSegmentRecord, ParticipantId, StoreError, TimerMode, notifier::MockNotifier,
    };
    use crate::infrastructure::store::{InMemoryRemoteStore, StoreOperation};

    fn key(a: &str, b: &str) -> PairingKey {
        PairingKey::derive(&ParticipantId::new(a).unwrap(), &ParticipantId::new(b).unwrap())
            .unwrap()
    }

    fn record(key: &PairingKey, minutes: u32) -> NewSegmentRecord {
        NewSegmentRecord {
            pairing_key: key.clone(),
            segment_kind: TimerMode::Focus,
            duration_minutes: minutes,
        }
    }

    async fn wait_for_len(
        receiver: &mut watch::Receiver<Vec<SegmentLogRecord>>,
        len: usize,
    ) -> Vec<SegmentLogRecord> {
        tokio::time::timeout(
            Duration::from_secs(2),
            receiver.wait_for(|records| records.len() == len),
        )
        .await
        .expect("timed out waiting for log entries")
        .expect("log feed closed")
        .clone()
    }

    #[tokio::test]
    async fn test_watch_lists_newest_first_and_follows_appends() {
        // テスト項目: 既存のレコードが新しい順に並び、追記に追従する
        // given (前提条件):
        let store = InMemoryRemoteStore::new();
        let ab = key("ALICE", "BOB");
        store.append_record(record(&ab, 25)).await.unwrap();
        store.append_record(record(&ab, 5)).await.unwrap();
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let feed = LogFeed::new(Arc::new(store.clone()), Arc::new(notifier));
        let mut receiver = feed.subscribe();

        // when (操作):
        feed.watch(Some(ab.clone()));
        let initial = wait_for_len(&mut receiver, 2).await;
        store.append_record(record(&ab, 12)).await.unwrap();
        let updated = wait_for_len(&mut receiver, 3).await;

        // then (期待する結果):
        assert_eq!(initial[0].duration_minutes, 5);
        assert_eq!(initial[1].duration_minutes, 25);
        assert_eq!(updated[0].duration_minutes, 12);
        assert_eq!(feed.latest(), updated);
    }

    #[tokio::test]
    async fn test_watch_switches_key_and_clears_when_unpaired() {
        // テスト項目: キーが変わると以前の購読は破棄され、未ペアリングでは空になる
        // given (前提条件):
        let store = InMemoryRemoteStore::new();
        let ab = key("ALICE", "BOB");
        let ac = key("ALICE", "CAROL");
        store.append_record(record(&ab, 25)).await.unwrap();
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let feed = LogFeed::new(Arc::new(store.clone()), Arc::new(notifier));
        let mut receiver = feed.subscribe();
        feed.watch(Some(ab.clone()));
        wait_for_len(&mut receiver, 1).await;

        // when (操作):
        feed.watch(Some(ac.clone()));
        store.append_record(record(&ab, 5)).await.unwrap();
        let after_switch = feed.latest();
        feed.watch(None);

        // then (期待する結果):
        assert!(after_switch.is_empty());
        assert!(feed.latest().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_failure_notifies() {
        // テスト項目: 購読に失敗すると破壊的な通知が出る
        // given (前提条件):
        let store = InMemoryRemoteStore::new();
        store
            .inject_failure(StoreOperation::SubscribeRecords, StoreError::Closed)
            .await;
        let (sent_tx, sent_rx) = tokio::sync::oneshot::channel::<()>();
        let sent_tx = Mutex::new(Some(sent_tx));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|notice| notice.description == "Could not fetch our focus journal.")
            .times(1)
            .returning(move |_| {
                if let Some(tx) = sent_tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            });
        let feed = LogFeed::new(Arc::new(store), Arc::new(notifier));

        // when (操作):
        feed.watch(Some(key("ALICE", "BOB")));

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(2), sent_rx)
            .await
            .expect("notice was not sent")
            .unwrap();
        assert!(feed.latest().is_empty());
    }

    #[tokio::test]
    async fn test_closed_subscription_notifies() {
        // テスト項目: ストア側で購読が閉じられると破壊的な通知が出る
        // given (前提条件):
        let store = InMemoryRemoteStore::new();
        let ab = key("ALICE", "BOB");
        store.append_record(record(&ab, 25)).await.unwrap();
        let (sent_tx, sent_rx) = tokio::sync::oneshot::channel::<()>();
        let sent_tx = Mutex::new(Some(sent_tx));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|notice| notice.title == "Error" && notice.description.starts_with("Lost"))
            .times(1)
            .returning(move |_| {
                if let Some(tx) = sent_tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            });
        let feed = LogFeed::new(Arc::new(store.clone()), Arc::new(notifier));
        let mut receiver = feed.subscribe();
        feed.watch(Some(ab));
        wait_for_len(&mut receiver, 1).await;

        // when (操作):
        store.close_subscriptions().await;

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(2), sent_rx)
            .await
            .expect("notice was not sent")
            .unwrap();
        for _ in 0..100 {
            if !feed.is_live() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!feed.is_live());
    }

    #[tokio::test]
    async fn test_list_of_a_replaced_watch_is_not_published() {
        // テスト項目: 新しい watch の後は、古い購読のリストが公開されない
        // given (前提条件):
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let feed = LogFeed::new(Arc::new(InMemoryRemoteStore::new()), Arc::new(notifier));
        feed.watch(None);
        let stale = feed.generation.load(Ordering::SeqCst);
        feed.watch(None);
        let records = vec![SegmentLogRecord {
            id: "r1".to_string(),
            pairing_key: "ALICE_BOB".to_string(),
            recorded_at: 1,
            segment_kind: TimerMode::Focus,
            duration_minutes: 25,
        }];

        // when (操作):
        let published_stale =
            publish_if_current(&feed.entries, &feed.generation, stale, records.clone());
        let current = feed.generation.load(Ordering::SeqCst);
        let published_current =
            publish_if_current(&feed.entries, &feed.generation, current, records.clone());

        // then (期待する結果):
        assert!(!published_stale);
        assert!(published_current);
        assert_eq!(feed.latest(), records);
    }
}
