use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use wadoru_core::{encode, HintState};

pub(crate) const PROFILE_RECORD_VERSION: u32 = 1;
pub(crate) const HINTS_RECORD_VERSION: u32 = 1;

const PROFILE_FILE: &str = "profile.v1.json";
const HINTS_FILE: &str = "hints.v1.json";

#[derive(Clone, Serialize, Deserialize)]
struct ProfileRecord {
    version: u32,
    emoji: Option<String>,
}

impl Default for ProfileRecord {
    fn default() -> Self {
        Self {
            version: PROFILE_RECORD_VERSION,
            emoji: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct HintsRecord {
    version: u32,
    /// Hint state keyed by the identity it was earned under, so switching
    /// emoji and back does not leak another identity's daily double.
    hints: HashMap<String, HintState>,
}

impl Default for HintsRecord {
    fn default() -> Self {
        Self {
            version: HINTS_RECORD_VERSION,
            hints: HashMap::new(),
        }
    }
}

/// Durable per-profile storage for the local identity and its hint state.
/// All methods are best-effort: a write failure loses durability, never the
/// in-memory session.
pub trait ProfileStore: Send + 'static {
    fn load_identity(&self) -> Option<String>;
    fn save_identity(&mut self, emoji: &str);
    fn clear_identity(&mut self);

    fn load_hints(&self, emoji: &str) -> HintState;
    fn save_hints(&mut self, emoji: &str, state: &HintState);
    fn clear_hints(&mut self, emoji: &str);
}

/// JSON records under the platform data directory, one file per concern.
/// A record whose version does not match is treated as absent.
#[derive(Debug, Clone)]
pub struct FsProfileStore {
    dir: PathBuf,
}

impl FsProfileStore {
    /// Store rooted at the platform data directory, e.g.
    /// `~/.local/share/wadoru` on Linux.
    pub fn open() -> Option<Self> {
        let dir = dirs::data_dir()?.join("wadoru");
        Some(Self::at(dir))
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn load_record<T: serde::de::DeserializeOwned>(&self, file: &str, version: u32) -> Option<T> {
        let bytes = fs::read(self.dir.join(file)).ok()?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        if value.get("version").and_then(serde_json::Value::as_u64) != Some(u64::from(version)) {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    fn save_record<T: Serialize>(&self, file: &str, record: &T) {
        let Some(bytes) = encode(record) else {
            return;
        };
        if let Err(err) = fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), %err, "profile dir create failed");
            return;
        }
        if let Err(err) = fs::write(self.dir.join(file), bytes) {
            tracing::warn!(file, %err, "profile record write failed");
        }
    }

    fn profile(&self) -> ProfileRecord {
        self.load_record(PROFILE_FILE, PROFILE_RECORD_VERSION)
            .unwrap_or_default()
    }

    fn hints(&self) -> HintsRecord {
        self.load_record(HINTS_FILE, HINTS_RECORD_VERSION)
            .unwrap_or_default()
    }
}

impl ProfileStore for FsProfileStore {
    fn load_identity(&self) -> Option<String> {
        self.profile().emoji
    }

    fn save_identity(&mut self, emoji: &str) {
        let mut record = self.profile();
        record.emoji = Some(emoji.to_string());
        self.save_record(PROFILE_FILE, &record);
    }

    fn clear_identity(&mut self) {
        let mut record = self.profile();
        record.emoji = None;
        self.save_record(PROFILE_FILE, &record);
    }

    fn load_hints(&self, emoji: &str) -> HintState {
        self.hints().hints.get(emoji).cloned().unwrap_or_default()
    }

    fn save_hints(&mut self, emoji: &str, state: &HintState) {
        let mut record = self.hints();
        if state.is_empty() {
            record.hints.remove(emoji);
        } else {
            record.hints.insert(emoji.to_string(), *state);
        }
        self.save_record(HINTS_FILE, &record);
    }

    fn clear_hints(&mut self, emoji: &str) {
        let mut record = self.hints();
        record.hints.remove(emoji);
        self.save_record(HINTS_FILE, &record);
    }
}

/// In-memory store for tests and throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryProfileStore {
    emoji: Option<String>,
    hints: HashMap<String, HintState>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(emoji: &str) -> Self {
        Self {
            emoji: Some(emoji.to_string()),
            hints: HashMap::new(),
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load_identity(&self) -> Option<String> {
        self.emoji.clone()
    }

    fn save_identity(&mut self, emoji: &str) {
        self.emoji = Some(emoji.to_string());
    }

    fn clear_identity(&mut self) {
        self.emoji = None;
    }

    fn load_hints(&self, emoji: &str) -> HintState {
        self.hints.get(emoji).cloned().unwrap_or_default()
    }

    fn save_hints(&mut self, emoji: &str, state: &HintState) {
        if state.is_empty() {
            self.hints.remove(emoji);
        } else {
            self.hints.insert(emoji.to_string(), *state);
        }
    }

    fn clear_hints(&mut self, emoji: &str) {
        self.hints.remove(emoji);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wadoru_core::RevealedHint;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wadoru-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn identity_round_trips_and_clears() {
        let dir = scratch_dir("identity");
        let mut store = FsProfileStore::at(dir.clone());
        assert_eq!(store.load_identity(), None);

        store.save_identity("🦊");
        assert_eq!(store.load_identity().as_deref(), Some("🦊"));

        store.clear_identity();
        assert_eq!(store.load_identity(), None);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn hints_are_scoped_per_identity() {
        let dir = scratch_dir("hints");
        let mut store = FsProfileStore::at(dir.clone());

        let fox = HintState {
            pending_row: Some(2),
            revealed_hint: None,
        };
        store.save_hints("🦊", &fox);
        assert_eq!(store.load_hints("🦊"), fox);
        assert!(store.load_hints("🐙").is_empty());

        store.save_hints(
            "🐙",
            &HintState {
                pending_row: None,
                revealed_hint: Some(RevealedHint {
                    row: 1,
                    col: 4,
                    letter: 'e',
                }),
            },
        );
        assert_eq!(store.load_hints("🦊"), fox);
        assert_eq!(store.load_hints("🐙").revealed_hint.map(|h| h.letter), Some('e'));

        // Saving an empty state drops the entry.
        store.save_hints("🦊", &HintState::default());
        assert!(store.load_hints("🦊").is_empty());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn mismatched_record_version_reads_as_absent() {
        let dir = scratch_dir("version");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("profile.v1.json"),
            r#"{"version":99,"emoji":"🦊"}"#.as_bytes(),
        )
        .unwrap();
        let store = FsProfileStore::at(dir.clone());
        assert_eq!(store.load_identity(), None);
        let _ = fs::remove_dir_all(dir);
    }
}
