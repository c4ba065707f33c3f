//! Format versioning constants for scripts and saves.
//!
//! The path wire format is part of the save payload, so changing how
//! `PathItem` serializes requires bumping `SAVE_FORMAT_VERSION`.

/// Current schema version for JSON scripts.
pub const SCRIPT_SCHEMA_VERSION: &str = "1.0";

/// Current format version for binary save slots.
pub const SAVE_FORMAT_VERSION: u16 = 1;

/// Magic bytes for binary save slots.
pub const SAVE_BINARY_MAGIC: [u8; 4] = *b"VNPS";

/// Name of the scene every fresh path starts in.
pub const START_SCENE: &str = "start";
