use std::fmt;

pub const LOBBY_ID_MAX_LEN: usize = 16;
pub const LOBBY_ID_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn is_valid_lobby_id(value: &str) -> bool {
    if value.is_empty() || value.len() > LOBBY_ID_MAX_LEN {
        return false;
    }
    value.chars().all(|ch| LOBBY_ID_ALPHABET.contains(ch))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LobbyId(String);

impl LobbyId {
    pub fn parse(value: &str) -> Result<Self, LobbyIdError> {
        if value.is_empty() {
            return Err(LobbyIdError::Empty);
        }
        if value.len() > LOBBY_ID_MAX_LEN {
            return Err(LobbyIdError::TooLong {
                max: LOBBY_ID_MAX_LEN,
                found: value.len(),
            });
        }
        for (idx, ch) in value.chars().enumerate() {
            if !LOBBY_ID_ALPHABET.contains(ch) {
                return Err(LobbyIdError::InvalidCharacter { ch, index: idx });
            }
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for LobbyId {
    type Err = LobbyIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyIdError {
    Empty,
    TooLong { max: usize, found: usize },
    InvalidCharacter { ch: char, index: usize },
}

impl fmt::Display for LobbyIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyIdError::Empty => write!(f, "lobby id must not be empty"),
            LobbyIdError::TooLong { max, found } => {
                write!(f, "lobby id must be at most {max} chars, got {found}")
            }
            LobbyIdError::InvalidCharacter { ch, index } => {
                write!(f, "invalid character '{ch}' at position {index}")
            }
        }
    }
}

impl std::error::Error for LobbyIdError {}
