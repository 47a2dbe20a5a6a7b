use wadoru_core::{ChatMessage, GuessReply, RevealedHint, StateSnapshot};

/// Presentation boundary. The session calls these synchronously from its
/// event loop; implementations render, play sounds, or in tests just record.
/// Every method defaults to a no-op so frontends opt into what they draw.
#[allow(unused_variables)]
pub trait GameEffects: Send + 'static {
    /// Full redraw from an authoritative snapshot. Fires on every apply,
    /// before the per-edge notifications below.
    fn render(&mut self, snapshot: &StateSnapshot) {}

    fn guess_landed(&mut self, snapshot: &StateSnapshot, index: usize) {}
    fn chat_arrived(&mut self, message: &ChatMessage) {}
    fn score_changed(&mut self, emoji: &str, delta: f64) {}
    fn daily_double_armed(&mut self, row: u32) {}
    fn hint_revealed(&mut self, hint: &RevealedHint) {}
    fn hint_cleared(&mut self) {}
    fn game_over(&mut self, snapshot: &StateSnapshot) {}
    fn round_started(&mut self) {}
    fn removed_from_game(&mut self) {}

    /// Direct reply to the local player's own guess.
    fn guess_result(&mut self, reply: &GuessReply) {}
    fn request_rejected(&mut self, msg: &str) {}

    fn connection_lost(&mut self) {}
    fn reconnected(&mut self) {}
    fn session_expired(&mut self) {}
    fn server_notice(&mut self, message: &str) {}
    fn redirect_home(&mut self) {}
    fn reload(&mut self) {}
}

/// Headless frontend for sessions that only need the state machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEffects;

impl GameEffects for NullEffects {}

/// Flat record of one effect invocation, for asserting on in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectCall {
    Render { guesses: usize },
    GuessLanded { index: usize },
    ChatArrived { emoji: String, text: String },
    ScoreChanged { emoji: String, delta: f64 },
    DailyDoubleArmed { row: u32 },
    HintRevealed { row: u32, col: u32, letter: char },
    HintCleared,
    GameOver,
    RoundStarted,
    RemovedFromGame,
    GuessResult {
        won: bool,
        daily_double: bool,
        close_call: bool,
    },
    RequestRejected { msg: String },
    ConnectionLost,
    Reconnected,
    SessionExpired,
    ServerNotice { message: String },
    RedirectHome,
    Reload,
}

/// Test double that appends every call to a shared log.
#[derive(Debug, Default, Clone)]
pub struct RecordingEffects {
    calls: std::sync::Arc<std::sync::Mutex<Vec<EffectCall>>>,
}

impl RecordingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EffectCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_of(&self, wanted: &EffectCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == wanted).count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn push(&self, call: EffectCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GameEffects for RecordingEffects {
    fn render(&mut self, snapshot: &StateSnapshot) {
        self.push(EffectCall::Render {
            guesses: snapshot.guess_count(),
        });
    }

    fn guess_landed(&mut self, _snapshot: &StateSnapshot, index: usize) {
        self.push(EffectCall::GuessLanded { index });
    }

    fn chat_arrived(&mut self, message: &ChatMessage) {
        self.push(EffectCall::ChatArrived {
            emoji: message.emoji.clone(),
            text: message.text.clone(),
        });
    }

    fn score_changed(&mut self, emoji: &str, delta: f64) {
        self.push(EffectCall::ScoreChanged {
            emoji: emoji.to_string(),
            delta,
        });
    }

    fn daily_double_armed(&mut self, row: u32) {
        self.push(EffectCall::DailyDoubleArmed { row });
    }

    fn hint_revealed(&mut self, hint: &RevealedHint) {
        self.push(EffectCall::HintRevealed {
            row: hint.row,
            col: hint.col,
            letter: hint.letter,
        });
    }

    fn hint_cleared(&mut self) {
        self.push(EffectCall::HintCleared);
    }

    fn game_over(&mut self, _snapshot: &StateSnapshot) {
        self.push(EffectCall::GameOver);
    }

    fn round_started(&mut self) {
        self.push(EffectCall::RoundStarted);
    }

    fn removed_from_game(&mut self) {
        self.push(EffectCall::RemovedFromGame);
    }

    fn guess_result(&mut self, reply: &GuessReply) {
        self.push(EffectCall::GuessResult {
            won: reply.won,
            daily_double: reply.daily_double,
            close_call: reply.close_call.is_some(),
        });
    }

    fn request_rejected(&mut self, msg: &str) {
        self.push(EffectCall::RequestRejected {
            msg: msg.to_string(),
        });
    }

    fn connection_lost(&mut self) {
        self.push(EffectCall::ConnectionLost);
    }

    fn reconnected(&mut self) {
        self.push(EffectCall::Reconnected);
    }

    fn session_expired(&mut self) {
        self.push(EffectCall::SessionExpired);
    }

    fn server_notice(&mut self, message: &str) {
        self.push(EffectCall::ServerNotice {
            message: message.to_string(),
        });
    }

    fn redirect_home(&mut self) {
        self.push(EffectCall::RedirectHome);
    }

    fn reload(&mut self) {
        self.push(EffectCall::Reload);
    }
}
