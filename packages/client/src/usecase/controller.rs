//! Session controller
//!
//! ## 責務
//!
//! - 利用者の操作（ID 設定・ペアリング・開始/一時停止/停止/モード切替・設定変更）を受け付ける
//! - ペアリングキーの変化に応じてドキュメント購読とログ購読を張り替える
//! - ローカルのカウントダウンを駆動し、セグメント完了時に記録と同期を行う
//!
//! ## 設計ノート
//!
//! - 状態は `tokio::sync::Mutex` の内側にあり、ストアへの await 中は保持しない
//! - 購読タスクとティッカーは `Weak` 参照のみを持ち、コントローラの破棄で止まる
//! - ペアリングキーが変わった後に届いた古い購読のイベントは捨てる

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::domain::{
    DocumentSeed, Notice, Notifier, PairingKey, ParticipantId, PreferenceKey,
    PreferenceStore, RemoteStore, RunState, SegmentLogRecord, StatePatch, TickOutcome, TimerMode,
    TimerState, ValidationError, load_durations, reduce,
};

use super::{
    log_feed::LogFeed,
    recorder::Recorder,
    settings::SettingsPropagator,
    synchronizer::{DocumentFeed, SyncContext, SyncEvent, SyncOutcome, Synchronizer},
};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Which client writes the zero-crossing record and transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Every client that reaches zero records and pushes
    #[default]
    EveryClient,
    /// Only the participant whose id sorts first records and pushes;
    /// the other one switches locally and converges through the store
    LowestIdentifier,
}

impl CompletionPolicy {
    fn owns_completion(self, self_id: &ParticipantId, partner_id: &ParticipantId) -> bool {
        match self {
            Self::EveryClient => true,
            Self::LowestIdentifier => self_id < partner_id,
        }
    }
}

/// Derived controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unpaired,
    Stopped,
    Running,
    Paused,
}

/// Observable state for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub self_id: Option<ParticipantId>,
    pub partner_id: Option<ParticipantId>,
    pub pairing_key: Option<PairingKey>,
    pub timer: TimerState,
    pub phase: Phase,
    pub log_entries: Vec<SegmentLogRecord>,
}

impl SessionSnapshot {
    pub fn is_paired(&self) -> bool {
        self.pairing_key.is_some()
    }
}

struct SessionState {
    self_id: Option<ParticipantId>,
    partner_id: Option<ParticipantId>,
    timer: TimerState,
    context: Option<SyncContext>,
    listener: Option<JoinHandle<()>>,
}

impl SessionState {
    fn pairing(&self) -> Option<SyncContext> {
        let self_id = self.self_id.as_ref()?;
        let partner_id = self.partner_id.as_ref()?;
        let key = PairingKey::derive(self_id, partner_id).ok()?;
        Some(SyncContext {
            key,
            self_id: self_id.clone(),
        })
    }

    fn phase(&self) -> Phase {
        if self.context.is_none() {
            return Phase::Unpaired;
        }
        match self.timer.run_state {
            RunState::Stopped => Phase::Stopped,
            RunState::Running => Phase::Running,
            RunState::Paused => Phase::Paused,
        }
    }
}

struct Inner {
    state: Mutex<SessionState>,
    synchronizer: Synchronizer,
    recorder: Recorder,
    log_feed: LogFeed,
    settings: SettingsPropagator,
    preferences: Arc<dyn PreferenceStore>,
    notifier: Arc<dyn Notifier>,
    policy: CompletionPolicy,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(listener) = self.state.get_mut().listener.take() {
            listener.abort();
        }
    }
}

/// Mode/transition controller of one participant
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        preferences: Arc<dyn PreferenceStore>,
        notifier: Arc<dyn Notifier>,
        policy: CompletionPolicy,
    ) -> Self {
        let synchronizer = Synchronizer::new(store.clone(), notifier.clone());
        let recorder = Recorder::new(store.clone(), notifier.clone());
        let log_feed = LogFeed::new(store, notifier.clone());
        let settings =
            SettingsPropagator::new(preferences.clone(), synchronizer.clone(), notifier.clone());
        let timer = TimerState::new(load_durations(preferences.as_ref()));

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState {
                    self_id: None,
                    partner_id: None,
                    timer,
                    context: None,
                    listener: None,
                }),
                synchronizer,
                recorder,
                log_feed,
                settings,
                preferences,
                notifier,
                policy,
            }),
        }
    }

    /// Restore identifiers and durations from the preference store and pair if possible
    pub async fn restore(&self) {
        let stored_id = |key: PreferenceKey| {
            self.inner
                .preferences
                .get(key)
                .and_then(|raw| ParticipantId::new(&raw).ok())
        };
        {
            let mut state = self.inner.state.lock().await;
            state.self_id = stored_id(PreferenceKey::SelfId);
            state.partner_id = stored_id(PreferenceKey::PartnerId);
            state.timer = TimerState::new(load_durations(self.inner.preferences.as_ref()));
            tracing::info!(
                "Restored session (self: {:?}, partner: {:?})",
                state.self_id.as_ref().map(ParticipantId::as_str),
                state.partner_id.as_ref().map(ParticipantId::as_str)
            );
        }
        self.refresh_pairing().await;
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock().await;
        SessionSnapshot {
            self_id: state.self_id.clone(),
            partner_id: state.partner_id.clone(),
            pairing_key: state.context.as_ref().map(|context| context.key.clone()),
            timer: state.timer.clone(),
            phase: state.phase(),
            log_entries: self.inner.log_feed.latest(),
        }
    }

    /// Log entries of the current pairing, newest first
    pub fn log_entries(&self) -> watch::Receiver<Vec<SegmentLogRecord>> {
        self.inner.log_feed.subscribe()
    }

    // ---- identity ----

    pub async fn set_self_id(&self, raw: &str) -> Result<(), ValidationError> {
        let self_id = match ParticipantId::new(raw) {
            Ok(id) => id,
            Err(e) => {
                self.notify(Notice::destructive("Oops!", "Please enter a User ID."));
                return Err(e);
            }
        };

        {
            let mut state = self.inner.state.lock().await;
            if state.partner_id.as_ref() == Some(&self_id) {
                drop(state);
                self.notify(Notice::destructive(
                    "Oops!",
                    "Your ID can't be your partner's ID.",
                ));
                return Err(ValidationError::SelfPairing);
            }
            state.self_id = Some(self_id.clone());
        }

        self.persist(PreferenceKey::SelfId, Some(self_id.as_str()));
        self.notify(Notice::info(
            "Welcome!",
            format!("Your ID is {}. Connect with your partner!", self_id),
        ));
        self.refresh_pairing().await;
        Ok(())
    }

    pub async fn set_partner_id(&self, raw: &str) -> Result<(), ValidationError> {
        let partner_id = match ParticipantId::new(raw) {
            Ok(id) => id,
            Err(e) => {
                self.notify(Notice::destructive(
                    "Oops!",
                    "Please enter your partner's User ID.",
                ));
                return Err(e);
            }
        };

        {
            let mut state = self.inner.state.lock().await;
            if state.self_id.as_ref() == Some(&partner_id) {
                drop(state);
                self.notify(Notice::destructive(
                    "Oops!",
                    "Partner ID can't be your own ID.",
                ));
                return Err(ValidationError::SelfPairing);
            }
            state.partner_id = Some(partner_id.clone());
        }

        self.persist(PreferenceKey::PartnerId, Some(partner_id.as_str()));
        self.notify(Notice::info(
            "Partner Linked!",
            format!("Ready for focused time with {}!", partner_id),
        ));
        self.refresh_pairing().await;
        Ok(())
    }

    /// Forget the partner; the shared document is left as it is
    pub async fn disconnect_partner(&self) {
        self.inner.state.lock().await.partner_id = None;
        self.persist(PreferenceKey::PartnerId, None);
        self.notify(Notice::info(
            "Partner Disconnected",
            "You can link with your partner again anytime.",
        ));
        self.refresh_pairing().await;
    }

    pub async fn logout(&self) {
        {
            let mut state = self.inner.state.lock().await;
            state.self_id = None;
            state.partner_id = None;
            state.timer = TimerState::new(load_durations(self.inner.preferences.as_ref()));
        }
        self.persist(PreferenceKey::SelfId, None);
        self.persist(PreferenceKey::PartnerId, None);
        self.refresh_pairing().await;
        self.notify(Notice::info(
            "Logged Out",
            "Come back soon for more focus time!",
        ));
    }

    // ---- timer actions ----

    /// Start or resume; `None` if nothing was pushed
    pub async fn start(&self) -> Option<SyncOutcome> {
        let (context, patch, local) = {
            let mut state = self.inner.state.lock().await;
            let Some(context) = state.context.clone() else {
                drop(state);
                self.not_connected();
                return None;
            };
            if !state.timer.start() {
                return None;
            }
            let timer = &state.timer;
            let patch = StatePatch::new()
                .run_state(RunState::Running)
                .remaining(timer.remaining_seconds)
                .mode(timer.active_mode);
            (context, patch, timer.clone())
        };
        Some(self.inner.synchronizer.push(&context, patch, &local).await)
    }

    pub async fn pause(&self) -> Option<SyncOutcome> {
        let (context, patch, local) = {
            let mut state = self.inner.state.lock().await;
            let Some(context) = state.context.clone() else {
                drop(state);
                self.not_connected();
                return None;
            };
            if !state.timer.pause() {
                return None;
            }
            let patch = StatePatch::new()
                .run_state(RunState::Paused)
                .remaining(state.timer.remaining_seconds);
            (context, patch, state.timer.clone())
        };
        Some(self.inner.synchronizer.push(&context, patch, &local).await)
    }

    /// Stop and reset the current mode, recording the aborted segment
    pub async fn stop(&self) -> Option<SyncOutcome> {
        let (context, mode, elapsed, patch, local) = {
            let mut state = self.inner.state.lock().await;
            let Some(context) = state.context.clone() else {
                drop(state);
                self.not_connected();
                return None;
            };
            let mode = state.timer.active_mode;
            let elapsed = state.timer.stop();
            let patch = StatePatch::new()
                .run_state(RunState::Stopped)
                .remaining(state.timer.remaining_seconds)
                .mode(mode);
            (context, mode, elapsed, patch, state.timer.clone())
        };

        if elapsed > 0 {
            self.inner
                .recorder
                .record(mode, elapsed, Some(&context.key))
                .await;
        }
        Some(self.inner.synchronizer.push(&context, patch, &local).await)
    }

    pub async fn switch_mode(&self, mode: TimerMode) -> Option<SyncOutcome> {
        let (context, previous, elapsed, patch, local) = {
            let mut state = self.inner.state.lock().await;
            let Some(context) = state.context.clone() else {
                drop(state);
                self.not_connected();
                return None;
            };
            let (previous, elapsed) = state.timer.switch_mode(mode);
            let patch = StatePatch::new()
                .mode(mode)
                .run_state(RunState::Stopped)
                .remaining(state.timer.remaining_seconds);
            (context, previous, elapsed, patch, state.timer.clone())
        };

        if elapsed > 0 {
            self.inner
                .recorder
                .record(previous, elapsed, Some(&context.key))
                .await;
        }
        Some(self.inner.synchronizer.push(&context, patch, &local).await)
    }

    /// Apply new durations locally and share them when paired
    pub async fn apply_settings(
        &self,
        focus_minutes: u32,
        break_minutes: u32,
    ) -> Result<Option<SyncOutcome>, ValidationError> {
        let (context, patch, local) = {
            let mut state = self.inner.state.lock().await;
            let patch =
                self.inner
                    .settings
                    .apply_locally(&mut state.timer, focus_minutes, break_minutes)?;
            (state.context.clone(), patch, state.timer.clone())
        };
        Ok(self
            .inner
            .settings
            .propagate(context.as_ref(), patch, &local)
            .await)
    }

    /// Advance the local countdown by one second
    pub async fn tick(&self) -> TickOutcome {
        let (outcome, completion) = {
            let mut state = self.inner.state.lock().await;
            let outcome = state.timer.tick();
            let owner = match (&state.self_id, &state.partner_id) {
                (Some(self_id), Some(partner_id)) => {
                    self.inner.policy.owns_completion(self_id, partner_id)
                }
                _ => true,
            };
            (outcome, (state.context.clone(), owner, state.timer.clone()))
        };

        if let TickOutcome::SegmentComplete {
            mode,
            elapsed_seconds,
        } = outcome
        {
            let (context, owner, local) = completion;
            self.complete_segment(mode, elapsed_seconds, context, owner, local)
                .await;
        }
        outcome
    }

    async fn complete_segment(
        &self,
        mode: TimerMode,
        elapsed_seconds: u32,
        context: Option<SyncContext>,
        owner: bool,
        local: TimerState,
    ) {
        self.notify(Notice::info(
            format!("{} complete!", mode.label()),
            format!("Let's start our {}.", local.active_mode.label()),
        ));

        let Some(context) = context else {
            return;
        };
        if !owner {
            tracing::debug!(
                "Leaving the {:?} completion of '{}' to the partner",
                mode,
                context.key
            );
            return;
        }

        self.inner
            .recorder
            .record(mode, elapsed_seconds, Some(&context.key))
            .await;
        let patch = StatePatch::new()
            .mode(local.active_mode)
            .remaining(local.remaining_seconds)
            .run_state(RunState::Stopped);
        self.inner.synchronizer.push(&context, patch, &local).await;
    }

    /// Drive [`tick`](Self::tick) once per second until the controller is dropped
    pub fn spawn_ticker(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                SessionController { inner }.tick().await;
            }
        })
    }

    // ---- pairing ----

    /// Re-derive the pairing key and re-wire the subscriptions if it changed
    async fn refresh_pairing(&self) {
        let context = {
            let mut state = self.inner.state.lock().await;
            let context = state.pairing();
            let listening = state
                .listener
                .as_ref()
                .is_some_and(|listener| !listener.is_finished())
                && self.inner.log_feed.is_live();
            if context == state.context && (context.is_none() || listening) {
                return;
            }

            if let Some(listener) = state.listener.take() {
                listener.abort();
            }
            if let Some(previous) = state.context.take()
                && Some(&previous) != context.as_ref()
            {
                tracing::info!("Left shared session '{}'", previous.key);
                if context.is_none() {
                    state.timer = TimerState::new(load_durations(self.inner.preferences.as_ref()));
                }
            }
            state.context = context.clone();
            context
        };

        self.inner
            .log_feed
            .watch(context.as_ref().map(|context| context.key.clone()));

        let Some(context) = context else {
            return;
        };
        tracing::info!("Joining shared session '{}'", context.key);
        let Some(feed) = self
            .inner
            .synchronizer
            .attach(context.clone())
            .await
        else {
            return;
        };

        let listener = tokio::spawn(listen(Arc::downgrade(&self.inner), feed));
        let mut state = self.inner.state.lock().await;
        if state.context.as_ref() == Some(&context) {
            if let Some(stale) = state.listener.replace(listener) {
                stale.abort();
            }
        } else {
            listener.abort();
        }
    }

    fn persist(&self, key: PreferenceKey, value: Option<&str>) {
        let result = match value {
            Some(value) => self.inner.preferences.set(key, value),
            None => self.inner.preferences.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist {}: {}", key.as_str(), e);
        }
    }

    fn not_connected(&self) {
        self.notify(Notice::destructive(
            "Not Connected",
            "Please set your User ID and connect with your partner first.",
        ));
    }

    fn notify(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }
}

async fn listen(inner: Weak<Inner>, mut feed: DocumentFeed) {
    let context = feed.context().clone();
    while let Some(event) = feed.next().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let mut state = inner.state.lock().await;
        if state.context.as_ref() != Some(&context) {
            tracing::debug!("Dropping update for stale key '{}'", context.key);
            break;
        }
        match event {
            SyncEvent::Change(change) => {
                reduce(&mut state.timer, &change);
            }
            SyncEvent::Missing => {
                // ローカルを初期状態にしてから作成する。作成より後の操作は
                // パッチ (必要なら再作成) として書き込まれる
                let durations = state.timer.durations;
                state.timer = TimerState::new(durations);
                drop(state);
                let seed = DocumentSeed::initial(&durations, &context.self_id);
                inner.synchronizer.initialize(&context, seed).await;
            }
        }
    }

    // 購読がストア側で閉じられた。キーが現行のままなら利用者に知らせ、
    // 次の ID 操作で張り直せるようにする
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut state = inner.state.lock().await;
    if state.context.as_ref() != Some(&context) {
        tracing::debug!("Document listener for '{}' finished", context.key);
        return;
    }
    if state
        .listener
        .as_ref()
        .is_some_and(|listener| listener.id() == tokio::task::id())
    {
        state.listener = None;
    }
    drop(state);
    tracing::warn!("Lost the subscription to shared session '{}'", context.key);
    inner.notifier.notify(Notice::destructive(
        "Sync Error",
        "Lost connection to our shared session. Link your partner again to reconnect.",
    ));
}
