//! State-synchronization engine for the wadoru multiplayer word-guessing
//! game. One [`session::Session`] owns a full client view of a lobby: it
//! keeps the current server snapshot fresh over a push stream with a
//! timed-polling fallback, turns consecutive snapshots into one-shot edge
//! events, and reconciles durable per-player hint state against server truth.
//!
//! Rendering, audio, and notifications live behind [`effects::GameEffects`];
//! the engine only tells collaborators what just changed.

pub mod activity;
pub mod api;
pub mod effects;
pub mod error;
pub mod hint;
pub mod persisted;
pub mod poll;
pub mod schedule;
pub mod session;
pub mod store;
pub mod stream;

pub use activity::ActivityMonitor;
pub use api::{Backend, HttpBackend};
pub use effects::{EffectCall, GameEffects, NullEffects, RecordingEffects};
pub use error::ApiError;
pub use hint::{HintLedger, HintOutcome};
pub use persisted::{FsProfileStore, MemoryProfileStore, ProfileStore};
pub use poll::{Cadence, PollScheduler};
pub use schedule::Scheduler;
pub use session::{
    ConnectionState, Session, SessionCmd, SessionConfig, SessionHandle, StreamEvent, SyncMode,
};
pub use store::{DiffContext, Edge, StateStore};
pub use stream::StreamHandle;
