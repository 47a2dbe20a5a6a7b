use serde::{Deserialize, Serialize};

/// A letter revealed by spending a Daily Double, pinned to one board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedHint {
    pub row: u32,
    pub col: u32,
    pub letter: char,
}

/// Per-player hint progress, persisted durably so an unused hint survives a
/// reload. `pending_row` is the row the player may still claim a hint for;
/// `revealed_hint` is a claimed-but-unplayed letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HintState {
    #[serde(default)]
    pub pending_row: Option<u32>,
    #[serde(default)]
    pub revealed_hint: Option<RevealedHint>,
}

impl HintState {
    pub fn armed(row: u32) -> Self {
        Self {
            pending_row: Some(row),
            revealed_hint: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending_row.is_none() && self.revealed_hint.is_none()
    }
}
