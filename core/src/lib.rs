pub mod codec;
pub mod hint;
pub mod lobby_id;
pub mod protocol;
pub mod snapshot;

pub use codec::{decode, encode};
pub use hint::{HintState, RevealedHint};
pub use lobby_id::{is_valid_lobby_id, LobbyId, LobbyIdError, LOBBY_ID_ALPHABET, LOBBY_ID_MAX_LEN};
pub use protocol::{
    CloseCall, DailyDoubleTile, ErrorReply, GuessReply, HintReply, OkReply, ServerUpdate,
    StreamMessage,
};
pub use snapshot::{
    ChatMessage, GamePhase, GuessRecord, LeaderboardEntry, LetterResult, StateSnapshot, WORD_LEN,
};
