use serde::{Deserialize, Serialize};

/// Every guess and the target word are exactly this long.
pub const WORD_LEN: usize = 5;

fn default_max_rows() -> u32 {
    6
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterResult {
    Correct,
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessRecord {
    pub guess: String,
    pub result: Vec<LetterResult>,
    pub emoji: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub emoji: String,
    pub score: f64,
    #[serde(default)]
    pub last_active: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub emoji: String,
    pub text: String,
    #[serde(default)]
    pub ts: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Waiting,
    Active,
}

/// Full, authoritative game state as served by `GET /state` and pushed over
/// the event stream. Snapshots are immutable replacements; the client never
/// patches one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub guesses: Vec<GuessRecord>,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub active_emojis: Vec<String>,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
    #[serde(default)]
    pub is_over: bool,
    /// Present only once the round is over.
    #[serde(default)]
    pub target_word: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub winner_emoji: Option<String>,
    #[serde(default = "default_max_rows")]
    pub max_rows: u32,
    #[serde(default)]
    pub past_games: Vec<Vec<GuessRecord>>,
    #[serde(default)]
    pub last_word: Option<String>,
    #[serde(default)]
    pub last_definition: Option<String>,
    /// Only present when the request carried a player identity; it is scoped
    /// to that player, not global.
    #[serde(default)]
    pub daily_double_available: Option<bool>,
    #[serde(default)]
    pub phase: Option<GamePhase>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            guesses: Vec::new(),
            leaderboard: Vec::new(),
            active_emojis: Vec::new(),
            chat_messages: Vec::new(),
            is_over: false,
            target_word: None,
            definition: None,
            winner_emoji: None,
            max_rows: default_max_rows(),
            past_games: Vec::new(),
            last_word: None,
            last_definition: None,
            daily_double_available: None,
            phase: None,
        }
    }
}

impl StateSnapshot {
    pub fn guess_count(&self) -> usize {
        self.guesses.len()
    }

    pub fn latest_guess(&self) -> Option<&GuessRecord> {
        self.guesses.last()
    }

    pub fn latest_chat(&self) -> Option<&ChatMessage> {
        self.chat_messages.last()
    }

    pub fn score_of(&self, emoji: &str) -> Option<f64> {
        self.leaderboard
            .iter()
            .find(|entry| entry.emoji == emoji)
            .map(|entry| entry.score)
    }
}
