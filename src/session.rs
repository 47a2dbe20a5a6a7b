use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use wadoru_core::{GuessReply, HintReply, HintState, RevealedHint, StateSnapshot, StreamMessage};

use crate::activity::ActivityMonitor;
use crate::api::Backend;
use crate::effects::GameEffects;
use crate::error::ApiError;
use crate::hint::HintLedger;
use crate::persisted::ProfileStore;
use crate::poll::{Cadence, PollScheduler};
use crate::schedule::Scheduler;
use crate::store::{DiffContext, Edge, StateStore};
use crate::stream::StreamHandle;

const REDIRECT_TASK: &str = "redirect";
const RELOAD_TASK: &str = "reload";

/// Which transport currently drives state refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Push stream attached; no poll timer runs.
    Stream,
    /// Timed polling, fast or slow cadence.
    Poll,
}

/// Transport status owned and mutated only by the session loop.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionState {
    pub mode: SyncMode,
    pub had_network_error: bool,
}

/// One inbound push-stream notification.
#[derive(Debug)]
pub enum StreamEvent {
    Message(StreamMessage),
    /// Transport error or end-of-stream. Terminal; the stream is never
    /// reopened within a session.
    Closed,
}

/// Everything that can advance a session: user intents, timer fires, and
/// completions of spawned network calls. All of it funnels through one
/// channel so state mutation stays single-threaded.
#[derive(Debug)]
pub enum SessionCmd {
    /// Raw user interaction reported by the frontend.
    Activity,
    PollTick,
    StreamEvent(StreamEvent),
    FetchDone {
        seq: u64,
        result: Result<StateSnapshot, ApiError>,
    },
    GuessDone {
        result: Result<GuessReply, ApiError>,
    },
    HintDone {
        result: Result<HintReply, ApiError>,
    },
    PostDone {
        what: &'static str,
        result: Result<(), ApiError>,
    },
    SubmitGuess(String),
    SendChat(String),
    ClaimHint {
        col: u32,
    },
    ResetRound,
    SetChatOpen(bool),
    SetIdentity(String),
    SignOut,
    Redirect,
    Reload,
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub fast_poll: Duration,
    pub slow_poll: Duration,
    /// Idle time after which polling drops to the slow cadence.
    pub inactivity: Duration,
    /// Delay before the home redirect once the lobby is gone.
    pub redirect_delay: Duration,
    /// Added on top of a server-update's own delay before reloading.
    pub reload_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fast_poll: Duration::from_secs(2),
            slow_poll: Duration::from_secs(30),
            inactivity: Duration::from_secs(90),
            redirect_delay: Duration::from_secs(3),
            reload_grace: Duration::from_secs(1),
        }
    }
}

/// Cloneable front door for frontends: every method is a fire-and-forget
/// send into the session loop.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<SessionCmd>,
}

impl SessionHandle {
    pub fn activity(&self) {
        let _ = self.tx.send(SessionCmd::Activity);
    }

    pub fn submit_guess(&self, guess: impl Into<String>) {
        let _ = self.tx.send(SessionCmd::SubmitGuess(guess.into()));
    }

    pub fn send_chat(&self, text: impl Into<String>) {
        let _ = self.tx.send(SessionCmd::SendChat(text.into()));
    }

    pub fn claim_hint(&self, col: u32) {
        let _ = self.tx.send(SessionCmd::ClaimHint { col });
    }

    pub fn reset_round(&self) {
        let _ = self.tx.send(SessionCmd::ResetRound);
    }

    pub fn set_chat_open(&self, open: bool) {
        let _ = self.tx.send(SessionCmd::SetChatOpen(open));
    }

    pub fn set_identity(&self, emoji: impl Into<String>) {
        let _ = self.tx.send(SessionCmd::SetIdentity(emoji.into()));
    }

    pub fn sign_out(&self) {
        let _ = self.tx.send(SessionCmd::SignOut);
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(SessionCmd::Shutdown);
    }

    pub fn sender(&self) -> UnboundedSender<SessionCmd> {
        self.tx.clone()
    }
}

/// Owns one client's view of a lobby: transport, snapshot, edges, hints.
/// Single consumer; every mutation happens inside [`Session::handle`].
pub struct Session<B, E, P> {
    backend: B,
    effects: E,
    profile: P,
    config: SessionConfig,
    rx: UnboundedReceiver<SessionCmd>,
    tx: UnboundedSender<SessionCmd>,
    scheduler: Scheduler,
    poll: PollScheduler,
    activity: ActivityMonitor,
    store: StateStore,
    hints: HintLedger,
    stream: Option<StreamHandle>,
    conn: ConnectionState,
    emoji: Option<String>,
    chat_open: bool,
    next_seq: u64,
    applied_seq: u64,
    terminal: bool,
}

impl<B, E, P> Session<B, E, P>
where
    B: Backend,
    E: GameEffects,
    P: ProfileStore,
{
    pub fn new(backend: B, effects: E, profile: P, config: SessionConfig) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            backend,
            effects,
            profile,
            rx,
            tx: tx.clone(),
            scheduler: Scheduler::new(tx.clone()),
            poll: PollScheduler::new(config.fast_poll, config.slow_poll),
            activity: ActivityMonitor::new(Instant::now()),
            store: StateStore::new(),
            hints: HintLedger::default(),
            stream: None,
            conn: ConnectionState {
                mode: SyncMode::Poll,
                had_network_error: false,
            },
            emoji: None,
            chat_open: false,
            next_seq: 0,
            applied_seq: 0,
            terminal: false,
            config,
        };
        (session, SessionHandle { tx })
    }

    pub fn connection(&self) -> ConnectionState {
        self.conn
    }

    pub fn poll_cadence(&self) -> Option<Cadence> {
        self.poll.cadence()
    }

    pub fn snapshot(&self) -> Option<&StateSnapshot> {
        self.store.current()
    }

    pub fn hint_state(&self) -> &HintState {
        self.hints.state()
    }

    pub fn emoji(&self) -> Option<&str> {
        self.emoji.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Restore the durable profile, attach a transport, and kick off the
    /// first fetch. Stream first; any open failure falls back to fast
    /// polling for the rest of the session.
    pub async fn start(&mut self) {
        self.emoji = self.profile.load_identity();
        if let Some(emoji) = &self.emoji {
            self.hints = HintLedger::new(self.profile.load_hints(emoji));
        }
        match self.backend.open_stream(self.tx.clone()).await {
            Ok(handle) => {
                tracing::info!("push stream attached");
                self.stream = Some(handle);
                self.conn.mode = SyncMode::Stream;
            }
            Err(err) => {
                if err.is_terminal() {
                    self.expire_session();
                    return;
                }
                tracing::info!(%err, "no push stream, polling instead");
                self.conn.mode = SyncMode::Poll;
                self.poll.start_fast(&mut self.scheduler);
            }
        }
        self.issue_fetch();
    }

    /// Drive the session until shutdown, redirect, or reload.
    pub async fn run(&mut self) {
        while let Some(cmd) = self.rx.recv().await {
            if !self.handle(cmd) {
                break;
            }
        }
        self.teardown();
    }

    /// Drain every already-queued command without blocking. Returns `false`
    /// once a terminal command was processed.
    pub fn pump(&mut self) -> bool {
        while let Ok(cmd) = self.rx.try_recv() {
            if !self.handle(cmd) {
                self.teardown();
                return false;
            }
        }
        true
    }

    /// Advance the session by one command. Returns `false` when the session
    /// is over and the caller should stop pumping.
    pub fn handle(&mut self, cmd: SessionCmd) -> bool {
        match cmd {
            SessionCmd::Activity => self.on_activity(),
            SessionCmd::PollTick => self.on_poll_tick(),
            SessionCmd::StreamEvent(event) => self.on_stream_event(event),
            SessionCmd::FetchDone { seq, result } => self.on_fetch_done(seq, result),
            SessionCmd::GuessDone { result } => self.on_guess_done(result),
            SessionCmd::HintDone { result } => self.on_hint_done(result),
            SessionCmd::PostDone { what, result } => self.on_post_done(what, result),
            SessionCmd::SubmitGuess(guess) => self.on_submit_guess(guess),
            SessionCmd::SendChat(text) => self.on_send_chat(text),
            SessionCmd::ClaimHint { col } => self.on_claim_hint(col),
            SessionCmd::ResetRound => self.spawn_post("reset"),
            SessionCmd::SetChatOpen(open) => self.chat_open = open,
            SessionCmd::SetIdentity(emoji) => self.on_set_identity(emoji),
            SessionCmd::SignOut => self.on_sign_out(),
            SessionCmd::Redirect => {
                self.effects.redirect_home();
                return false;
            }
            SessionCmd::Reload => {
                self.effects.reload();
                return false;
            }
            SessionCmd::Shutdown => return false,
        }
        true
    }

    fn teardown(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
        self.poll.stop(&mut self.scheduler);
        self.scheduler.cancel_all();
    }

    fn on_activity(&mut self) {
        self.activity.record(Instant::now());
        if self.terminal {
            return;
        }
        if self.poll.cadence() == Some(Cadence::Slow) {
            self.poll.start_fast(&mut self.scheduler);
        }
        // Out-of-band refresh plus a presence ping so the action is
        // reflected server-side before the next scheduled tick.
        self.issue_fetch();
        if let Some(emoji) = self.emoji.clone() {
            let backend = self.backend.clone();
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let result = backend.heartbeat(emoji).await;
                let _ = tx.send(SessionCmd::PostDone {
                    what: "heartbeat",
                    result,
                });
            });
        }
    }

    fn on_poll_tick(&mut self) {
        if self.terminal {
            return;
        }
        if self.activity.idle_for(Instant::now()) >= self.config.inactivity {
            self.poll.slow_down(&mut self.scheduler);
        }
        self.issue_fetch();
    }

    fn on_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Message(StreamMessage::Snapshot(snapshot)) => {
                let seq = self.bump_seq();
                self.apply(seq, snapshot);
            }
            StreamEvent::Message(StreamMessage::ServerUpdate(update)) => {
                tracing::warn!(message = %update.message, delay = update.delay_seconds, "server update");
                if let Some(stream) = self.stream.take() {
                    stream.close();
                }
                self.poll.stop(&mut self.scheduler);
                self.terminal = true;
                self.effects.server_notice(&update.message);
                self.scheduler.once(
                    RELOAD_TASK,
                    Duration::from_secs(update.delay_seconds) + self.config.reload_grace,
                    SessionCmd::Reload,
                );
            }
            StreamEvent::Closed => {
                if self.terminal {
                    return;
                }
                tracing::warn!("push stream closed, falling back to polling");
                self.stream = None;
                self.conn.mode = SyncMode::Poll;
                self.poll.start_fast(&mut self.scheduler);
            }
        }
    }

    fn on_fetch_done(&mut self, seq: u64, result: Result<StateSnapshot, ApiError>) {
        match result {
            Ok(snapshot) => self.apply(seq, snapshot),
            Err(err) => self.note_error(err),
        }
    }

    fn on_guess_done(&mut self, result: Result<GuessReply, ApiError>) {
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                self.note_error(err);
                return;
            }
        };
        self.effects.guess_result(&reply);
        if reply.daily_double {
            if let Some(tile) = reply.daily_double_tile {
                // The hit row is done; the hint is claimable on the next one.
                let row = tile.row + 1;
                self.hints.arm(row);
                self.persist_hints();
                self.effects.daily_double_armed(row);
            }
        }
        if let Some(state) = reply.state {
            let seq = self.bump_seq();
            self.apply(seq, state);
        }
    }

    fn on_hint_done(&mut self, result: Result<HintReply, ApiError>) {
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                self.note_error(err);
                return;
            }
        };
        let Some(letter) = reply.letter.chars().next() else {
            tracing::warn!("hint reply carried no letter");
            return;
        };
        let hint = RevealedHint {
            row: reply.row,
            col: reply.col,
            letter,
        };
        self.hints.record_reveal(hint);
        self.persist_hints();
        self.effects.hint_revealed(&hint);
    }

    fn on_post_done(&mut self, what: &'static str, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                if what == "reset" {
                    self.issue_fetch();
                }
            }
            Err(err) => {
                tracing::warn!(what, %err, "post failed");
                self.note_error(err);
            }
        }
    }

    fn on_submit_guess(&mut self, guess: String) {
        self.activity.record(Instant::now());
        let Some(emoji) = self.emoji.clone() else {
            self.effects.request_rejected("pick an emoji first");
            return;
        };
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.submit_guess(emoji, guess).await;
            let _ = tx.send(SessionCmd::GuessDone { result });
        });
    }

    fn on_send_chat(&mut self, text: String) {
        self.activity.record(Instant::now());
        let Some(emoji) = self.emoji.clone() else {
            self.effects.request_rejected("pick an emoji first");
            return;
        };
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.send_chat(emoji, text).await;
            let _ = tx.send(SessionCmd::PostDone {
                what: "chat",
                result,
            });
        });
    }

    fn on_claim_hint(&mut self, col: u32) {
        if self.hints.pending_row().is_none() {
            tracing::warn!("hint claim with nothing pending");
            return;
        }
        let Some(emoji) = self.emoji.clone() else {
            self.effects.request_rejected("pick an emoji first");
            return;
        };
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.claim_hint(emoji, col).await;
            let _ = tx.send(SessionCmd::HintDone { result });
        });
    }

    fn spawn_post(&mut self, what: &'static str) {
        self.activity.record(Instant::now());
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match what {
                "reset" => backend.reset_round().await,
                _ => Ok(()),
            };
            let _ = tx.send(SessionCmd::PostDone { what, result });
        });
    }

    fn on_set_identity(&mut self, emoji: String) {
        if self.emoji.as_deref() == Some(emoji.as_str()) {
            return;
        }
        self.profile.save_identity(&emoji);
        self.hints = HintLedger::new(self.profile.load_hints(&emoji));
        self.emoji = Some(emoji.clone());

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.register_identity(emoji).await;
            let _ = tx.send(SessionCmd::PostDone {
                what: "register",
                result,
            });
        });
        self.issue_fetch();
    }

    fn on_sign_out(&mut self) {
        if let Some(emoji) = self.emoji.take() {
            self.profile.clear_hints(&emoji);
        }
        self.profile.clear_identity();
        self.hints = HintLedger::default();
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Spawn a state fetch tagged with a fresh sequence number. The tag is
    /// taken at issue time, so a response overtaken by a newer apply gets
    /// dropped as stale instead of rolling the view backwards.
    fn issue_fetch(&mut self) {
        if self.terminal {
            return;
        }
        let seq = self.bump_seq();
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        let emoji = self.emoji.clone();
        tokio::spawn(async move {
            let result = backend.fetch_state(emoji).await;
            let _ = tx.send(SessionCmd::FetchDone { seq, result });
        });
    }

    /// Apply an authoritative snapshot: seq guard, diff, hint
    /// reconciliation, then effects. All of it synchronous.
    fn apply(&mut self, seq: u64, snapshot: StateSnapshot) {
        if self.terminal {
            return;
        }
        if seq <= self.applied_seq {
            tracing::warn!(seq, last = self.applied_seq, "snapshot dropped (stale)");
            return;
        }
        self.applied_seq = seq;

        if self.conn.had_network_error {
            self.conn.had_network_error = false;
            self.effects.reconnected();
        }

        let ctx = DiffContext {
            local_emoji: self.emoji.as_deref(),
            chat_open: self.chat_open,
        };
        let edges = self.store.apply(snapshot, &ctx);
        let Some(current) = self.store.current() else {
            return;
        };

        let outcome = self.hints.reconcile(current, &edges);
        if outcome.changed {
            if let Some(emoji) = &self.emoji {
                self.profile.save_hints(emoji, self.hints.state());
            }
        }

        self.effects.render(current);
        for edge in &edges {
            match edge {
                Edge::NewGuess { index } => self.effects.guess_landed(current, *index),
                Edge::NewChat { message } => self.effects.chat_arrived(message),
                Edge::ScoreDelta { emoji, delta } => self.effects.score_changed(emoji, *delta),
                Edge::DailyDoubleAvailable => {
                    if outcome.armed {
                        self.effects.daily_double_armed(0);
                    }
                }
                Edge::DailyDoubleUnavailable => {}
                Edge::GameOver => self.effects.game_over(current),
                Edge::RoundStarted | Edge::RoundReset => self.effects.round_started(),
                Edge::RemovedFromGame => self.effects.removed_from_game(),
            }
        }
        if outcome.cleared || outcome.expired {
            self.effects.hint_cleared();
        }
    }

    fn persist_hints(&mut self) {
        if let Some(emoji) = &self.emoji {
            self.profile.save_hints(emoji, self.hints.state());
        }
    }

    fn note_error(&mut self, err: ApiError) {
        match err {
            ApiError::LobbyGone => self.expire_session(),
            ApiError::Network(err) => {
                tracing::warn!(%err, "network failure");
                if !self.conn.had_network_error {
                    self.conn.had_network_error = true;
                    self.effects.connection_lost();
                }
            }
            ApiError::Rejected { msg } => self.effects.request_rejected(&msg),
            ApiError::Payload | ApiError::StreamUnsupported => {
                tracing::warn!(%err, "request failed");
            }
        }
    }

    /// The lobby is gone. Stop all refresh sources and schedule exactly one
    /// redirect; no retry of any kind after this.
    fn expire_session(&mut self) {
        if self.terminal {
            return;
        }
        self.terminal = true;
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
        self.poll.stop(&mut self.scheduler);
        self.effects.session_expired();
        self.scheduler.once(
            REDIRECT_TASK,
            self.config.redirect_delay,
            SessionCmd::Redirect,
        );
    }
}
