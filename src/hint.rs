use wadoru_core::{HintState, RevealedHint, StateSnapshot};

use crate::store::Edge;

/// What a reconciliation pass did to the hint state. `changed` tells the
/// caller whether the durable copy needs rewriting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HintOutcome {
    pub armed: bool,
    pub cleared: bool,
    pub expired: bool,
    pub changed: bool,
}

/// Durable daily-double bookkeeping for the local player.
///
/// The server only reports whether a daily double is *available*; which row
/// it was armed for and which letter was revealed live here, keyed to the
/// identity, and must survive reloads until the row they refer to has been
/// played.
#[derive(Debug, Default)]
pub struct HintLedger {
    state: HintState,
}

impl HintLedger {
    pub fn new(state: HintState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &HintState {
        &self.state
    }

    pub fn pending_row(&self) -> Option<u32> {
        self.state.pending_row
    }

    pub fn revealed(&self) -> Option<&RevealedHint> {
        self.state.revealed_hint.as_ref()
    }

    /// A successful claim converts the pending arm into a revealed letter.
    pub fn record_reveal(&mut self, hint: RevealedHint) {
        self.state.pending_row = None;
        self.state.revealed_hint = Some(hint);
    }

    /// Arm the hint for the row after a winning daily-double guess.
    pub fn arm(&mut self, row: u32) {
        self.state = HintState::armed(row);
    }

    pub fn clear(&mut self) {
        self.state = HintState::default();
    }

    /// Bring the ledger in line with an authoritative snapshot. Runs after
    /// edge computation on every apply and is idempotent: replaying the same
    /// snapshot leaves the state untouched and reports `changed == false`.
    pub fn reconcile(&mut self, snapshot: &StateSnapshot, edges: &[Edge]) -> HintOutcome {
        let mut outcome = HintOutcome::default();
        let before = self.state;

        // A daily double surfacing on an empty board belongs to row 0. The
        // availability edge rather than the flag drives this so that an
        // already-armed later row is not clobbered by a repeated snapshot.
        if edges.contains(&Edge::DailyDoubleAvailable) && snapshot.guess_count() == 0 {
            self.state = HintState::armed(0);
            outcome.armed = true;
        }

        // The server dropping availability while an arm is outstanding means
        // the claim window is gone (round rolled over, hint consumed
        // elsewhere). A revealed letter with no pending arm stays put: it was
        // already paid for and only row expiry below may remove it.
        if !snapshot.daily_double_available.unwrap_or(false) && self.state.pending_row.is_some() {
            self.state = HintState::default();
            outcome.cleared = true;
        }

        let played = snapshot.guess_count() as u32;
        if self.state.pending_row.is_some_and(|row| played > row) {
            self.state.pending_row = None;
            outcome.expired = true;
        }
        if self
            .state
            .revealed_hint
            .as_ref()
            .is_some_and(|hint| played > hint.row)
        {
            self.state.revealed_hint = None;
            outcome.expired = true;
        }

        outcome.changed = self.state != before;
        outcome
    }
}
