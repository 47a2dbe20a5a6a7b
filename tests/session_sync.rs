//! End-to-end session behavior against an in-process fake server: transport
//! selection and fallback, cadence adaptation, edge delivery, hint
//! bookkeeping, and terminal error paths. Time is always paused.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::yield_now;
use tokio::time::advance;

use wadoru::{
    ApiError, Backend, Cadence, EffectCall, MemoryProfileStore, RecordingEffects, Session,
    SessionCmd, SessionConfig, SessionHandle, StreamHandle, SyncMode,
};
use wadoru_core::{
    CloseCall, DailyDoubleTile, GuessRecord, GuessReply, HintReply, LeaderboardEntry, LetterResult,
    ServerUpdate, StateSnapshot, StreamMessage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchFailure {
    Gone,
    Network,
}

#[derive(Default)]
struct FakeInner {
    snapshot: StateSnapshot,
    fetch_failure: Option<FetchFailure>,
    guess_reply: Option<GuessReply>,
    hint_reply: Option<HintReply>,
    stream_ok: bool,
    fetches: usize,
    heartbeats: usize,
    registers: usize,
    resets: usize,
    chats: usize,
}

#[derive(Clone, Default)]
struct FakeBackend {
    inner: Arc<Mutex<FakeInner>>,
}

impl FakeBackend {
    fn with_stream() -> Self {
        let backend = Self::default();
        backend.inner.lock().unwrap().stream_ok = true;
        backend
    }

    fn set_snapshot(&self, snapshot: StateSnapshot) {
        self.inner.lock().unwrap().snapshot = snapshot;
    }

    fn set_failure(&self, failure: Option<FetchFailure>) {
        self.inner.lock().unwrap().fetch_failure = failure;
    }

    fn fetches(&self) -> usize {
        self.inner.lock().unwrap().fetches
    }

    fn heartbeats(&self) -> usize {
        self.inner.lock().unwrap().heartbeats
    }
}

impl Backend for FakeBackend {
    async fn fetch_state(&self, _emoji: Option<String>) -> Result<StateSnapshot, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetches += 1;
        match inner.fetch_failure {
            Some(FetchFailure::Gone) => Err(ApiError::LobbyGone),
            Some(FetchFailure::Network) => Err(ApiError::Network("connection refused".into())),
            None => Ok(inner.snapshot.clone()),
        }
    }

    async fn heartbeat(&self, _emoji: String) -> Result<(), ApiError> {
        self.inner.lock().unwrap().heartbeats += 1;
        Ok(())
    }

    async fn register_identity(&self, _emoji: String) -> Result<(), ApiError> {
        self.inner.lock().unwrap().registers += 1;
        Ok(())
    }

    async fn submit_guess(&self, _emoji: String, _guess: String) -> Result<GuessReply, ApiError> {
        self.inner
            .lock()
            .unwrap()
            .guess_reply
            .clone()
            .ok_or(ApiError::Rejected {
                msg: "not a word".to_string(),
            })
    }

    async fn claim_hint(&self, _emoji: String, _col: u32) -> Result<HintReply, ApiError> {
        self.inner
            .lock()
            .unwrap()
            .hint_reply
            .clone()
            .ok_or(ApiError::Rejected {
                msg: "no hint".to_string(),
            })
    }

    async fn send_chat(&self, _emoji: String, _text: String) -> Result<(), ApiError> {
        self.inner.lock().unwrap().chats += 1;
        Ok(())
    }

    async fn reset_round(&self) -> Result<(), ApiError> {
        self.inner.lock().unwrap().resets += 1;
        Ok(())
    }

    async fn open_stream(
        &self,
        _tx: UnboundedSender<SessionCmd>,
    ) -> Result<StreamHandle, ApiError> {
        if self.inner.lock().unwrap().stream_ok {
            Ok(StreamHandle::from_task(tokio::spawn(async {
                std::future::pending::<()>().await;
            })))
        } else {
            Err(ApiError::StreamUnsupported)
        }
    }
}

type TestSession = Session<FakeBackend, RecordingEffects, MemoryProfileStore>;

const CONFIG: SessionConfig = SessionConfig {
    fast_poll: Duration::from_secs(2),
    slow_poll: Duration::from_secs(30),
    inactivity: Duration::from_secs(90),
    redirect_delay: Duration::from_secs(3),
    reload_grace: Duration::from_secs(1),
};

async fn started(
    backend: FakeBackend,
    profile: MemoryProfileStore,
) -> (TestSession, SessionHandle, RecordingEffects) {
    let effects = RecordingEffects::new();
    let (mut session, handle) = Session::new(backend, effects.clone(), profile, CONFIG);
    session.start().await;
    drive(&mut session).await;
    (session, handle, effects)
}

/// Let spawned request tasks and timers deliver, then drain the mailbox.
/// Yields and pumps are interleaved so a command that spawns a follow-up
/// task (a fetch, a timer) has its completion drained in the same call.
async fn drive(session: &mut TestSession) -> bool {
    for _ in 0..4 {
        yield_now().await;
        if !session.pump() {
            return false;
        }
    }
    true
}

fn guess_row(word: &str, emoji: &str) -> GuessRecord {
    GuessRecord {
        guess: word.to_string(),
        result: vec![LetterResult::Absent; 5],
        emoji: emoji.to_string(),
        ts: None,
        points: None,
    }
}

fn count<F: Fn(&EffectCall) -> bool>(effects: &RecordingEffects, pred: F) -> usize {
    effects.calls().iter().filter(|c| pred(c)).count()
}

#[tokio::test(start_paused = true)]
async fn no_stream_falls_back_to_fast_polling() {
    let backend = FakeBackend::default();
    let (session, _handle, effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    assert_eq!(session.connection().mode, SyncMode::Poll);
    assert_eq!(session.poll_cadence(), Some(Cadence::Fast));
    assert_eq!(backend.fetches(), 1, "initial fetch only");
    assert!(session.snapshot().is_some());
    assert_eq!(count(&effects, |c| matches!(c, EffectCall::Render { .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn identical_polls_render_without_edges() {
    let backend = FakeBackend::default();
    backend.set_snapshot(StateSnapshot {
        guesses: vec![guess_row("crane", "🦊")],
        ..StateSnapshot::default()
    });
    let (mut session, _handle, effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;

    assert_eq!(backend.fetches(), 3);
    assert_eq!(count(&effects, |c| matches!(c, EffectCall::Render { .. })), 3);
    assert_eq!(
        count(&effects, |c| matches!(c, EffectCall::GuessLanded { .. })),
        0,
        "a board restored on the first apply must not animate"
    );
}

#[tokio::test(start_paused = true)]
async fn a_new_guess_lands_exactly_once() {
    let backend = FakeBackend::default();
    let (mut session, _handle, effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    backend.set_snapshot(StateSnapshot {
        guesses: vec![guess_row("crane", "🐙")],
        leaderboard: vec![LeaderboardEntry {
            emoji: "🐙".to_string(),
            score: 3.0,
            last_active: 0.0,
        }],
        ..StateSnapshot::default()
    });
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    // Same snapshot again.
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;

    assert_eq!(
        effects.count_of(&EffectCall::GuessLanded { index: 0 }),
        1,
        "edge must fire exactly once across repeated snapshots"
    );
}

#[tokio::test(start_paused = true)]
async fn idle_sessions_poll_slow_until_activity() {
    let backend = FakeBackend::default();
    let (mut session, _handle, _effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    // No activity across the inactivity threshold; ticks keep firing and
    // the first tick past the threshold downgrades the cadence.
    for _ in 0..46 {
        advance(CONFIG.fast_poll).await;
        drive(&mut session).await;
    }
    assert_eq!(session.poll_cadence(), Some(Cadence::Slow));

    // Activity mid-way through a slow period restores fast immediately.
    advance(Duration::from_secs(10)).await;
    let fetches_before = backend.fetches();
    session.handle(SessionCmd::Activity);
    drive(&mut session).await;
    assert_eq!(session.poll_cadence(), Some(Cadence::Fast));
    assert_eq!(
        backend.fetches(),
        fetches_before + 1,
        "activity issues an out-of-band fetch"
    );

    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    assert_eq!(backend.fetches(), fetches_before + 2);
}

#[tokio::test(start_paused = true)]
async fn activity_sends_a_heartbeat_when_identified() {
    let backend = FakeBackend::default();
    let profile = MemoryProfileStore::with_identity("🦊");
    let (mut session, _handle, _effects) = started(backend.clone(), profile).await;
    assert_eq!(session.emoji(), Some("🦊"));

    session.handle(SessionCmd::Activity);
    drive(&mut session).await;
    assert_eq!(backend.heartbeats(), 1);
}

#[tokio::test(start_paused = true)]
async fn lobby_gone_redirects_once_and_never_retries() {
    let backend = FakeBackend::default();
    let (mut session, _handle, effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    backend.set_failure(Some(FetchFailure::Gone));
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;

    assert!(session.is_terminal());
    assert_eq!(effects.count_of(&EffectCall::SessionExpired), 1);
    let fetches_at_expiry = backend.fetches();

    // Just before the redirect delay: nothing yet, and no retry traffic.
    advance(CONFIG.redirect_delay - Duration::from_millis(1)).await;
    assert!(drive(&mut session).await);
    assert_eq!(effects.count_of(&EffectCall::RedirectHome), 0);
    assert_eq!(backend.fetches(), fetches_at_expiry);

    advance(Duration::from_millis(1)).await;
    assert!(!drive(&mut session).await, "redirect ends the session");
    assert_eq!(effects.count_of(&EffectCall::RedirectHome), 1);
}

#[tokio::test(start_paused = true)]
async fn network_blips_report_lost_then_reconnected_once() {
    let backend = FakeBackend::default();
    let (mut session, _handle, effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    backend.set_failure(Some(FetchFailure::Network));
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    assert_eq!(
        effects.count_of(&EffectCall::ConnectionLost),
        1,
        "repeat failures must not re-announce"
    );
    assert_eq!(session.poll_cadence(), Some(Cadence::Fast), "cadence unchanged");

    backend.set_failure(None);
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    assert_eq!(effects.count_of(&EffectCall::Reconnected), 1);
}

#[tokio::test(start_paused = true)]
async fn stream_mode_runs_without_a_poll_timer() {
    let backend = FakeBackend::with_stream();
    let (mut session, handle, effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    assert_eq!(session.connection().mode, SyncMode::Stream);
    assert_eq!(session.poll_cadence(), None);

    let fetches = backend.fetches();
    advance(Duration::from_secs(120)).await;
    drive(&mut session).await;
    assert_eq!(backend.fetches(), fetches, "no poll traffic while streaming");

    // Pushed snapshots apply like any other.
    handle
        .sender()
        .send(SessionCmd::StreamEvent(wadoru::StreamEvent::Message(
            StreamMessage::Snapshot(StateSnapshot {
                guesses: vec![guess_row("crane", "🐙")],
                ..StateSnapshot::default()
            }),
        )))
        .unwrap();
    drive(&mut session).await;
    assert_eq!(effects.count_of(&EffectCall::GuessLanded { index: 0 }), 1);
}

#[tokio::test(start_paused = true)]
async fn a_stale_fetch_never_rolls_back_a_pushed_snapshot() {
    let backend = FakeBackend::with_stream();
    let effects = RecordingEffects::new();
    let (mut session, handle) = Session::new(
        backend.clone(),
        effects.clone(),
        MemoryProfileStore::new(),
        CONFIG,
    );
    session.start().await;

    // The initial fetch is still in flight (its reply sits in the mailbox
    // behind this push). The push wins; the older empty board is dropped.
    handle
        .sender()
        .send(SessionCmd::StreamEvent(wadoru::StreamEvent::Message(
            StreamMessage::Snapshot(StateSnapshot {
                guesses: vec![guess_row("crane", "🐙")],
                ..StateSnapshot::default()
            }),
        )))
        .unwrap();
    drive(&mut session).await;

    assert_eq!(session.snapshot().map(StateSnapshot::guess_count), Some(1));
    assert_eq!(count(&effects, |c| matches!(c, EffectCall::Render { .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn stream_close_falls_back_to_polling_for_good() {
    let backend = FakeBackend::with_stream();
    let (mut session, handle, _effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    handle
        .sender()
        .send(SessionCmd::StreamEvent(wadoru::StreamEvent::Closed))
        .unwrap();
    drive(&mut session).await;

    assert_eq!(session.connection().mode, SyncMode::Poll);
    assert_eq!(session.poll_cadence(), Some(Cadence::Fast));

    let fetches = backend.fetches();
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    assert_eq!(backend.fetches(), fetches + 1);
}

#[tokio::test(start_paused = true)]
async fn server_update_notifies_then_reloads_after_grace() {
    let backend = FakeBackend::with_stream();
    let (mut session, handle, effects) = started(backend.clone(), MemoryProfileStore::new()).await;

    handle
        .sender()
        .send(SessionCmd::StreamEvent(wadoru::StreamEvent::Message(
            StreamMessage::ServerUpdate(ServerUpdate {
                message: "Maintenance".to_string(),
                delay_seconds: 5,
            }),
        )))
        .unwrap();
    drive(&mut session).await;

    assert!(session.is_terminal());
    assert_eq!(
        effects.count_of(&EffectCall::ServerNotice {
            message: "Maintenance".to_string()
        }),
        1
    );

    let fetches = backend.fetches();
    advance(Duration::from_millis(5_999)).await;
    assert!(drive(&mut session).await);
    assert_eq!(effects.count_of(&EffectCall::Reload), 0);

    advance(Duration::from_millis(1)).await;
    assert!(!drive(&mut session).await, "reload ends the session");
    assert_eq!(effects.count_of(&EffectCall::Reload), 1);
    assert_eq!(backend.fetches(), fetches, "no traffic after the notice");
}

#[tokio::test(start_paused = true)]
async fn hint_arms_on_fresh_board_and_expires_when_played() {
    let backend = FakeBackend::default();
    backend.set_snapshot(StateSnapshot {
        daily_double_available: Some(false),
        ..StateSnapshot::default()
    });
    let profile = MemoryProfileStore::with_identity("🦊");
    let (mut session, _handle, effects) = started(backend.clone(), profile).await;

    backend.set_snapshot(StateSnapshot {
        daily_double_available: Some(true),
        ..StateSnapshot::default()
    });
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    assert_eq!(session.hint_state().pending_row, Some(0));
    assert_eq!(effects.count_of(&EffectCall::DailyDoubleArmed { row: 0 }), 1);

    // Row 0 gets played before any claim: the arm silently expires.
    backend.set_snapshot(StateSnapshot {
        guesses: vec![guess_row("crane", "🐙")],
        daily_double_available: Some(true),
        ..StateSnapshot::default()
    });
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    assert!(session.hint_state().is_empty());
    assert_eq!(effects.count_of(&EffectCall::HintCleared), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_pending_hint_clears_when_availability_drops() {
    let backend = FakeBackend::default();
    backend.set_snapshot(StateSnapshot {
        daily_double_available: Some(false),
        ..StateSnapshot::default()
    });
    let mut profile = MemoryProfileStore::with_identity("🦊");
    {
        use wadoru::ProfileStore;
        profile.save_hints(
            "🦊",
            &wadoru_core::HintState {
                pending_row: Some(2),
                revealed_hint: None,
            },
        );
    }
    let (session, _handle, effects) = started(backend, profile).await;

    assert!(session.hint_state().is_empty());
    assert_eq!(effects.count_of(&EffectCall::HintCleared), 1);
}

#[tokio::test(start_paused = true)]
async fn daily_double_guess_arms_the_next_row() {
    let backend = FakeBackend::default();
    backend.inner.lock().unwrap().guess_reply = Some(GuessReply {
        status: "ok".to_string(),
        points_delta: 2.0,
        won: false,
        over: false,
        daily_double: true,
        daily_double_available: true,
        daily_double_tile: Some(DailyDoubleTile { row: 0, col: 3 }),
        close_call: None,
        state: Some(StateSnapshot {
            guesses: vec![guess_row("crane", "🦊")],
            daily_double_available: Some(true),
            ..StateSnapshot::default()
        }),
    });
    let profile = MemoryProfileStore::with_identity("🦊");
    let (mut session, _handle, effects) = started(backend, profile).await;

    session.handle(SessionCmd::SubmitGuess("crane".to_string()));
    drive(&mut session).await;

    assert_eq!(session.hint_state().pending_row, Some(1));
    assert_eq!(effects.count_of(&EffectCall::DailyDoubleArmed { row: 1 }), 1);
    assert_eq!(
        count(&effects, |c| matches!(c, EffectCall::GuessResult { .. })),
        1
    );
    // The embedded reply state applied without waiting for a poll.
    assert_eq!(session.snapshot().map(StateSnapshot::guess_count), Some(1));
}

#[tokio::test(start_paused = true)]
async fn a_near_miss_guess_reports_the_close_call() {
    let backend = FakeBackend::default();
    backend.inner.lock().unwrap().guess_reply = Some(GuessReply {
        status: "error".to_string(),
        points_delta: 0.0,
        won: false,
        over: true,
        daily_double: false,
        daily_double_available: false,
        daily_double_tile: None,
        close_call: Some(CloseCall {
            delta_ms: 240,
            winner: Some("🐼".to_string()),
        }),
        state: None,
    });
    let profile = MemoryProfileStore::with_identity("🦊");
    let (mut session, _handle, effects) = started(backend, profile).await;

    session.handle(SessionCmd::SubmitGuess("crane".to_string()));
    drive(&mut session).await;

    assert_eq!(
        count(&effects, |c| matches!(
            c,
            EffectCall::GuessResult {
                close_call: true,
                ..
            }
        )),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn claiming_a_hint_stores_the_revealed_letter() {
    let backend = FakeBackend::default();
    backend.inner.lock().unwrap().hint_reply = Some(HintReply {
        status: "ok".to_string(),
        row: 1,
        col: 2,
        letter: "e".to_string(),
        daily_double_available: false,
    });
    // Keep availability up so reconciliation does not clear the arm first.
    backend.set_snapshot(StateSnapshot {
        guesses: vec![guess_row("crane", "🦊")],
        daily_double_available: Some(true),
        ..StateSnapshot::default()
    });
    let mut profile = MemoryProfileStore::with_identity("🦊");
    {
        use wadoru::ProfileStore;
        profile.save_hints("🦊", &wadoru_core::HintState::armed(1));
    }
    let (mut session, _handle, effects) = started(backend, profile).await;
    assert_eq!(session.hint_state().pending_row, Some(1));

    session.handle(SessionCmd::ClaimHint { col: 2 });
    drive(&mut session).await;

    assert_eq!(
        effects.count_of(&EffectCall::HintRevealed {
            row: 1,
            col: 2,
            letter: 'e'
        }),
        1
    );
    assert_eq!(session.hint_state().pending_row, None);
    assert_eq!(
        session.hint_state().revealed_hint.map(|h| h.letter),
        Some('e')
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_guess_surfaces_the_server_message() {
    let backend = FakeBackend::default();
    let profile = MemoryProfileStore::with_identity("🦊");
    let (mut session, _handle, effects) = started(backend, profile).await;

    session.handle(SessionCmd::SubmitGuess("zzzzz".to_string()));
    drive(&mut session).await;
    assert_eq!(
        effects.count_of(&EffectCall::RequestRejected {
            msg: "not a word".to_string()
        }),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn removal_from_the_lobby_is_reported() {
    let backend = FakeBackend::default();
    backend.set_snapshot(StateSnapshot {
        active_emojis: vec!["🦊".to_string(), "🐙".to_string()],
        ..StateSnapshot::default()
    });
    let profile = MemoryProfileStore::with_identity("🦊");
    let (mut session, _handle, effects) = started(backend.clone(), profile).await;

    backend.set_snapshot(StateSnapshot {
        active_emojis: vec!["🐙".to_string()],
        ..StateSnapshot::default()
    });
    advance(CONFIG.fast_poll).await;
    drive(&mut session).await;
    assert_eq!(effects.count_of(&EffectCall::RemovedFromGame), 1);
}

#[tokio::test(start_paused = true)]
async fn identity_switch_registers_and_loads_fresh_hints() {
    let backend = FakeBackend::default();
    let (mut session, _handle, _effects) = started(backend.clone(), MemoryProfileStore::new()).await;
    assert_eq!(session.emoji(), None);

    session.handle(SessionCmd::SetIdentity("🦀".to_string()));
    drive(&mut session).await;
    assert_eq!(session.emoji(), Some("🦀"));
    assert_eq!(backend.inner.lock().unwrap().registers, 1);
    assert!(session.hint_state().is_empty());

    session.handle(SessionCmd::SignOut);
    assert_eq!(session.emoji(), None);
}
