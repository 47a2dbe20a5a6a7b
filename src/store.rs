use wadoru_core::{ChatMessage, StateSnapshot};

/// One-shot, edge-triggered events computed from a consecutive snapshot
/// pair. Re-applying an identical snapshot yields no edges.
#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    /// The shared board gained at least one guess; `index` points at the
    /// newest row so the UI animates exactly one landing.
    NewGuess { index: usize },
    /// A chat message arrived while the chat panel was closed.
    NewChat { message: ChatMessage },
    /// A player's score moved by `delta`.
    ScoreDelta { emoji: String, delta: f64 },
    /// Daily double flipped unavailable-to-available for the local player.
    DailyDoubleAvailable,
    /// Daily double flipped available-to-unavailable.
    DailyDoubleUnavailable,
    /// The round just finished.
    GameOver,
    /// The round was reset from a finished state.
    RoundStarted,
    /// The guess count dropped: a different round replaced the board.
    RoundReset,
    /// The local player's identity disappeared from the active set.
    RemovedFromGame,
}

/// Session facts the differ needs but snapshots do not carry.
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    pub local_emoji: Option<&'a str>,
    pub chat_open: bool,
}

/// Holds exactly the current snapshot; the immediately-previous one exists
/// only for the duration of a single diff inside [`StateStore::apply`].
#[derive(Debug, Default)]
pub struct StateStore {
    current: Option<StateSnapshot>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&StateSnapshot> {
        self.current.as_ref()
    }

    /// Rotate `next` in as the current snapshot and return the edges between
    /// it and the snapshot it replaced. The very first snapshot produces no
    /// edges: there is nothing to animate when restoring history wholesale.
    pub fn apply(&mut self, next: StateSnapshot, ctx: &DiffContext<'_>) -> Vec<Edge> {
        let previous = self.current.take();
        let edges = match &previous {
            Some(previous) => diff(previous, &next, ctx),
            None => Vec::new(),
        };
        self.current = Some(next);
        edges
    }
}

fn diff(previous: &StateSnapshot, current: &StateSnapshot, ctx: &DiffContext<'_>) -> Vec<Edge> {
    let mut edges = Vec::new();

    if current.guess_count() < previous.guess_count() {
        // The count dropping means a new round replaced the board; a
        // negative diff would otherwise animate rows that never landed.
        edges.push(Edge::RoundReset);
    } else if current.guess_count() > previous.guess_count() {
        edges.push(Edge::NewGuess {
            index: current.guess_count() - 1,
        });
    }

    if current.chat_messages.len() > previous.chat_messages.len() && !ctx.chat_open {
        if let Some(message) = current.latest_chat() {
            edges.push(Edge::NewChat {
                message: message.clone(),
            });
        }
    }

    for entry in &current.leaderboard {
        let Some(previous_score) = previous.score_of(&entry.emoji) else {
            continue;
        };
        if entry.score != previous_score {
            edges.push(Edge::ScoreDelta {
                emoji: entry.emoji.clone(),
                delta: entry.score - previous_score,
            });
        }
    }

    let was_available = previous.daily_double_available.unwrap_or(false);
    let is_available = current.daily_double_available.unwrap_or(false);
    if !was_available && is_available {
        edges.push(Edge::DailyDoubleAvailable);
    } else if was_available && !is_available {
        edges.push(Edge::DailyDoubleUnavailable);
    }

    if !previous.is_over && current.is_over {
        edges.push(Edge::GameOver);
    } else if previous.is_over && !current.is_over {
        edges.push(Edge::RoundStarted);
    }

    if let Some(local) = ctx.local_emoji {
        let was_present = previous.active_emojis.iter().any(|e| e == local);
        let is_present = current.active_emojis.iter().any(|e| e == local);
        if was_present && !is_present {
            edges.push(Edge::RemovedFromGame);
        }
    }

    edges
}
