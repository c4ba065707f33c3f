//! Persisted snapshot of one story instance.
//!
//! Layout is positional: `[path, state, [timestamp_ms, kind], snapshots]`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::path::StoryPath;
use crate::state::PlayerState;

/// Player state copies taken at each dialogue, oldest first.
pub type StateSnapshots = Vec<PlayerState>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveKind {
    Auto,
    Manual,
}

/// When and why a save was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMeta(pub u64, pub SaveKind);

impl SaveMeta {
    pub fn now(kind: SaveKind) -> Self {
        Self(now_unix_ms(), kind)
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.0
    }

    pub fn kind(&self) -> SaveKind {
        self.1
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Save(
    pub StoryPath,
    pub PlayerState,
    pub SaveMeta,
    pub StateSnapshots,
);

impl Save {
    pub fn new(path: StoryPath, state: PlayerState, kind: SaveKind, snapshots: StateSnapshots) -> Self {
        Self(path, state, SaveMeta::now(kind), snapshots)
    }

    pub fn path(&self) -> &StoryPath {
        &self.0
    }

    pub fn state(&self) -> &PlayerState {
        &self.1
    }

    pub fn meta(&self) -> SaveMeta {
        self.2
    }

    pub fn snapshots(&self) -> &StateSnapshots {
        &self.3
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub(crate) fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
