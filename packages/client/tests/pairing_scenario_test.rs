//! End-to-end scenarios of two participants sharing one in-memory store.

use std::{sync::Arc, time::Duration};

use tandem_client::{
    domain::{Notice, PairingKey, RunState, SharedSessionDocument, TickOutcome, TimerMode},
    infrastructure::{
        notifier::ChannelNotifier, preference::InMemoryPreferenceStore,
        store::InMemoryRemoteStore,
    },
    usecase::{CompletionPolicy, Phase, SessionController, SessionSnapshot, SyncOutcome},
};
use tokio::sync::mpsc;

/// One participant with its own preferences and notice channel
struct Participant {
    controller: SessionController,
    notices: mpsc::UnboundedReceiver<Notice>,
}

impl Participant {
    fn new(store: &InMemoryRemoteStore, policy: CompletionPolicy) -> Self {
        let (notifier, notices) = ChannelNotifier::new();
        let controller = SessionController::new(
            Arc::new(store.clone()),
            Arc::new(InMemoryPreferenceStore::new()),
            Arc::new(notifier),
            policy,
        );
        Self {
            controller,
            notices,
        }
    }

    async fn pair(&self, self_id: &str, partner_id: &str) {
        self.controller.set_self_id(self_id).await.unwrap();
        self.controller.set_partner_id(partner_id).await.unwrap();
    }

    /// Wait until the snapshot satisfies `predicate`
    async fn eventually(&self, predicate: impl Fn(&SessionSnapshot) -> bool) -> SessionSnapshot {
        for _ in 0..200 {
            let snapshot = self.controller.snapshot().await;
            if predicate(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "condition not reached; last snapshot: {:?}",
            self.controller.snapshot().await
        );
    }

    fn drain_titles(&mut self) -> Vec<String> {
        let mut titles = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            titles.push(notice.title);
        }
        titles
    }
}

async fn wait_for_document(
    store: &InMemoryRemoteStore,
    key: &PairingKey,
    predicate: impl Fn(&SharedSessionDocument) -> bool,
) -> SharedSessionDocument {
    for _ in 0..200 {
        if let Some(document) = store.document(key).await
            && predicate(&document)
        {
            return document;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("document condition not reached: {:?}", store.document(key).await);
}

/// ALICE pairs first (and creates the document), then BOB joins and hydrates
async fn alice_and_bob(
    store: &InMemoryRemoteStore,
    policy: CompletionPolicy,
) -> (Participant, Participant, PairingKey) {
    let alice = Participant::new(store, policy);
    alice.pair("alice", "bob").await;
    let key = alice.controller.snapshot().await.pairing_key.unwrap();
    wait_for_document(store, &key, |_| true).await;

    let bob = Participant::new(store, policy);
    bob.pair("BOB", "Alice").await;
    bob.eventually(|s| s.phase == Phase::Stopped).await;
    (alice, bob, key)
}

#[tokio::test]
async fn test_alice_starts_and_bob_mirrors() {
    // テスト項目: ALICE が開始すると BOB が running を反映し、ALICE 自身は上書きされない
    // given (前提条件):
    let store = InMemoryRemoteStore::new();
    let (alice, bob, key) = alice_and_bob(&store, CompletionPolicy::default()).await;

    let document = store.document(&key).await.unwrap();
    assert_eq!(key.as_str(), "ALICE_BOB");
    assert_eq!(document.active_mode, TimerMode::Focus);
    assert_eq!(document.remaining_seconds, 1500);
    assert_eq!(document.run_state, RunState::Stopped);
    assert_eq!(document.last_writer, "ALICE");

    // when (操作):
    let outcome = alice.controller.start().await;
    alice.controller.tick().await;
    alice.controller.tick().await;

    // then (期待する結果):
    assert_eq!(outcome, Some(SyncOutcome::Patched));
    let mirrored = bob.eventually(|s| s.phase == Phase::Running).await;
    assert_eq!(mirrored.timer.remaining_seconds, 1500);
    assert_eq!(mirrored.pairing_key, Some(key.clone()));

    let own = alice.controller.snapshot().await;
    assert_eq!(own.phase, Phase::Running);
    assert_eq!(own.timer.remaining_seconds, 1498);
}

#[tokio::test]
async fn test_pause_from_partner_is_adopted() {
    // テスト項目: BOB の一時停止が ALICE に反映され、ALICE の再開で経過時間の基準が保たれる
    // given (前提条件):
    let store = InMemoryRemoteStore::new();
    let (alice, bob, _key) = alice_and_bob(&store, CompletionPolicy::default()).await;
    alice.controller.start().await;
    bob.eventually(|s| s.phase == Phase::Running).await;
    for _ in 0..10 {
        bob.controller.tick().await;
    }

    // when (操作):
    bob.controller.pause().await;

    // then (期待する結果):
    let paused = alice.eventually(|s| s.phase == Phase::Paused).await;
    assert_eq!(paused.timer.remaining_seconds, 1490);
    assert_eq!(paused.timer.elapsed_seconds(), 10);
}

#[tokio::test]
async fn test_zero_crossing_writes_exactly_one_focus_record() {
    // テスト項目: 両者が同時に 0 へ向かっても、単一書き込みポリシーでは focus の記録は 1 件だけ
    // given (前提条件):
    let store = InMemoryRemoteStore::new();
    let (mut alice, mut bob, key) =
        alice_and_bob(&store, CompletionPolicy::LowestIdentifier).await;
    alice.controller.apply_settings(1, 1).await.unwrap();
    bob.eventually(|s| s.timer.remaining_seconds == 60).await;
    alice.controller.start().await;
    bob.eventually(|s| s.phase == Phase::Running).await;
    alice.drain_titles();
    bob.drain_titles();

    // when (操作):
    let mut alice_outcome = TickOutcome::Idle;
    for _ in 0..60 {
        alice_outcome = alice.controller.tick().await;
        bob.controller.tick().await;
    }

    // then (期待する結果):
    assert_eq!(
        alice_outcome,
        TickOutcome::SegmentComplete {
            mode: TimerMode::Focus,
            elapsed_seconds: 60
        }
    );

    let records = store.records(&key).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].segment_kind, TimerMode::Focus);
    assert_eq!(records[0].duration_minutes, 1);

    let document = wait_for_document(&store, &key, |d| d.active_mode == TimerMode::Break).await;
    assert_eq!(document.run_state, RunState::Stopped);
    assert_eq!(document.remaining_seconds, 60);
    assert!(alice.drain_titles().contains(&"Focus Time complete!".to_string()));
    let bob_view = bob.eventually(|s| s.timer.active_mode == TimerMode::Break).await;
    assert_eq!(bob_view.phase, Phase::Stopped);
    assert!(!bob.drain_titles().iter().any(|title| title == "Sync Error"));
}

#[tokio::test]
async fn test_missing_document_is_recreated() {
    // テスト項目: 共有ドキュメントが消えても再作成され、その後の操作が同期される
    // given (前提条件):
    let store = InMemoryRemoteStore::new();
    let (alice, bob, key) = alice_and_bob(&store, CompletionPolicy::default()).await;

    // when (操作):
    assert!(store.delete_document(&key).await);
    wait_for_document(&store, &key, |_| true).await;
    alice.controller.start().await;

    // then (期待する結果):
    let document = wait_for_document(&store, &key, |d| d.run_state == RunState::Running).await;
    assert_eq!(document.last_writer, "ALICE");
    bob.eventually(|s| s.phase == Phase::Running).await;
}

#[tokio::test]
async fn test_settings_reflow_reaches_partner() {
    // テスト項目: 停止中に集中 10 分を設定すると両者とも残り 600 秒になる
    // given (前提条件):
    let store = InMemoryRemoteStore::new();
    let (mut alice, bob, key) = alice_and_bob(&store, CompletionPolicy::default()).await;
    alice.drain_titles();

    // when (操作):
    let outcome = alice.controller.apply_settings(10, 5).await.unwrap();

    // then (期待する結果):
    assert_eq!(outcome, Some(SyncOutcome::Patched));
    assert_eq!(alice.controller.snapshot().await.timer.remaining_seconds, 600);
    let mirrored = bob
        .eventually(|s| s.timer.durations.focus_minutes() == 10)
        .await;
    assert_eq!(mirrored.timer.remaining_seconds, 600);
    assert_eq!(store.document(&key).await.unwrap().focus_duration_minutes, 10);
    assert_eq!(alice.drain_titles(), vec!["Settings Synced".to_string()]);
}

#[tokio::test]
async fn test_disconnect_keeps_document_and_clears_log() {
    // テスト項目: パートナー解除で購読とログは消えるが、共有ドキュメントは残る
    // given (前提条件):
    let store = InMemoryRemoteStore::new();
    let (alice, _bob, key) = alice_and_bob(&store, CompletionPolicy::default()).await;
    alice.controller.start().await;
    for _ in 0..120 {
        alice.controller.tick().await;
    }
    alice.controller.stop().await;
    alice.eventually(|s| s.log_entries.len() == 1).await;

    // when (操作):
    alice.controller.disconnect_partner().await;

    // then (期待する結果):
    let snapshot = alice.controller.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Unpaired);
    assert!(snapshot.log_entries.is_empty());
    assert_eq!(snapshot.timer.remaining_seconds, 1500);
    assert!(store.document(&key).await.is_some());
    assert_eq!(store.records(&key).await.len(), 1);
}
