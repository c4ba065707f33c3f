//! Save persistence: the storage seam used by contexts, plus a slot-based
//! file store with checksummed binary records.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::save::{now_unix_ms, Save, SaveKind};
use crate::script::{hex_id, ScriptId};
use crate::version::{SAVE_BINARY_MAGIC, SAVE_FORMAT_VERSION};

/// Where a context's save lives.
pub trait SaveStorage {
    /// Returns the stored save, or `None` when nothing was stored yet.
    fn load(&self) -> Result<Option<Save>, SaveStoreError>;

    fn store(&mut self, save: &Save) -> Result<(), SaveStoreError>;
}

/// In-process storage, used by tests and previews.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    slot: Option<Save>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_save(save: Save) -> Self {
        Self { slot: Some(save) }
    }
}

impl SaveStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Save>, SaveStoreError> {
        Ok(self.slot.clone())
    }

    fn store(&mut self, save: &Save) -> Result<(), SaveStoreError> {
        self.slot = Some(save.clone());
        Ok(())
    }
}

/// Binary record written to a slot: the save plus the script it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub script_id: ScriptId,
    pub save: Save,
}

impl SaveRecord {
    pub fn new(script_id: ScriptId, save: Save) -> Self {
        Self { script_id, save }
    }

    /// Encodes as a [`RecordHeader`] followed by the postcard payload.
    pub fn to_binary(&self) -> Result<Vec<u8>, SaveError> {
        let payload =
            postcard::to_allocvec(self).map_err(|err| SaveError::Serialization(err.to_string()))?;
        let header = RecordHeader::for_payload(&payload)?;
        let mut output = Vec::with_capacity(RecordHeader::LEN + payload.len());
        header.write_to(&mut output);
        output.extend_from_slice(&payload);
        Ok(output)
    }

    pub fn from_binary(input: &[u8]) -> Result<Self, SaveError> {
        let (header, payload) = RecordHeader::split(input)?;
        header.check(payload)?;
        postcard::from_bytes(payload).map_err(|err| SaveError::Serialization(err.to_string()))
    }

    pub fn validate_script_id(&self, expected: &ScriptId) -> Result<(), SaveError> {
        if &self.script_id != expected {
            return Err(SaveError::ScriptMismatch);
        }
        Ok(())
    }
}

/// Fixed-size prefix of a slot file: magic, format version, crc32 of the
/// payload and payload length, all little endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RecordHeader {
    version: u16,
    checksum: u32,
    payload_len: u32,
}

impl RecordHeader {
    const LEN: usize = 4 + 2 + 4 + 4;

    fn for_payload(payload: &[u8]) -> Result<Self, SaveError> {
        Ok(Self {
            version: SAVE_FORMAT_VERSION,
            checksum: crc32fast::hash(payload),
            payload_len: u32::try_from(payload.len()).map_err(|_| SaveError::TooLarge)?,
        })
    }

    fn write_to(self, output: &mut Vec<u8>) {
        output.extend_from_slice(&SAVE_BINARY_MAGIC);
        output.extend_from_slice(&self.version.to_le_bytes());
        output.extend_from_slice(&self.checksum.to_le_bytes());
        output.extend_from_slice(&self.payload_len.to_le_bytes());
    }

    /// Parses the header and returns it with the bytes that follow.
    fn split(input: &[u8]) -> Result<(Self, &[u8]), SaveError> {
        if input.len() < Self::LEN {
            return Err(SaveError::TooSmall);
        }
        let (head, payload) = input.split_at(Self::LEN);
        let (magic, rest) = head.split_at(4);
        if magic != SAVE_BINARY_MAGIC {
            return Err(SaveError::InvalidMagic);
        }
        let (version, rest) = rest.split_at(2);
        let (checksum, payload_len) = rest.split_at(4);
        let header = Self {
            version: u16::from_le_bytes([version[0], version[1]]),
            checksum: u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]),
            payload_len: u32::from_le_bytes([
                payload_len[0],
                payload_len[1],
                payload_len[2],
                payload_len[3],
            ]),
        };
        Ok((header, payload))
    }

    fn check(self, payload: &[u8]) -> Result<(), SaveError> {
        if self.version != SAVE_FORMAT_VERSION {
            return Err(SaveError::IncompatibleVersion {
                found: self.version,
                expected: SAVE_FORMAT_VERSION,
            });
        }
        if u32::try_from(payload.len()).ok() != Some(self.payload_len) {
            return Err(SaveError::LengthMismatch);
        }
        if crc32fast::hash(payload) != self.checksum {
            return Err(SaveError::ChecksumMismatch);
        }
        Ok(())
    }
}

/// Errors in the binary save format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("slot file is shorter than its header")]
    TooSmall,
    #[error("save payload exceeds the slot format's size field")]
    TooLarge,
    #[error("not a story save (bad magic)")]
    InvalidMagic,
    #[error("slot format {found} is not supported (expected {expected})")]
    IncompatibleVersion { found: u16, expected: u16 },
    #[error("slot payload fails its checksum")]
    ChecksumMismatch,
    #[error("slot payload length differs from its header")]
    LengthMismatch,
    #[error("save was written for a different script")]
    ScriptMismatch,
    #[error("save payload could not be encoded or decoded: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum SaveStoreError {
    #[error("save store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("save store format error: {0}")]
    Save(#[from] SaveError),
    #[error("save store recovery failed (primary: {primary}, backup: {})", describe_backup(.backup))]
    RecoveryFailed {
        primary: SaveError,
        backup: Option<SaveError>,
    },
}

fn describe_backup(backup: &Option<SaveError>) -> String {
    backup
        .as_ref()
        .map_or_else(|| "missing".to_string(), ToString::to_string)
}

/// Listing data kept next to each slot so menus need not decode saves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSlotMetadata {
    pub slot_id: u16,
    pub quick: bool,
    pub updated_unix_ms: u64,
    pub script_id_hex: String,
    pub kind: SaveKind,
    #[serde(default)]
    pub scene: Option<String>,
    pub path_len: usize,
    pub snapshot_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveSlotEntry {
    pub metadata: SaveSlotMetadata,
    pub path: PathBuf,
}

/// Directory of numbered save slots plus one quicksave slot.
///
/// Layout: `slots/slot_NNN.vnps` (binary) and `meta/slot_NNN.json`.
/// Overwrites keep the previous file as `.bak` for recovery.
#[derive(Clone, Debug)]
pub struct SaveSlotStore {
    root: PathBuf,
}

impl SaveSlotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_layout(&self) -> Result<(), SaveStoreError> {
        fs::create_dir_all(self.root.join("slots"))?;
        fs::create_dir_all(self.root.join("meta"))?;
        Ok(())
    }

    pub fn save_slot(
        &self,
        slot_id: u16,
        record: &SaveRecord,
    ) -> Result<SaveSlotEntry, SaveStoreError> {
        self.write_record(slot_id, false, record)
    }

    pub fn load_slot(&self, slot_id: u16) -> Result<SaveRecord, SaveStoreError> {
        let slot_path = self.slot_path(slot_id, false);
        self.load_with_recovery(&slot_path)
    }

    pub fn has_slot(&self, slot_id: u16) -> bool {
        self.slot_path(slot_id, false).exists()
    }

    pub fn remove_slot(&self, slot_id: u16) -> Result<(), SaveStoreError> {
        for path in [
            self.slot_path(slot_id, false),
            self.metadata_path(slot_id, false),
        ] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    pub fn quicksave(&self, record: &SaveRecord) -> Result<SaveSlotEntry, SaveStoreError> {
        self.write_record(0, true, record)
    }

    pub fn quickload(&self) -> Result<SaveRecord, SaveStoreError> {
        let slot_path = self.slot_path(0, true);
        self.load_with_recovery(&slot_path)
    }

    /// Lists slots that have both metadata and data, newest first.
    pub fn list_slots(&self) -> Result<Vec<SaveSlotEntry>, SaveStoreError> {
        self.ensure_layout()?;
        let mut entries = Vec::new();

        for entry in fs::read_dir(self.root.join("meta"))? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            let metadata: SaveSlotMetadata = match serde_json::from_slice(&bytes) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(file = %path.display(), %err, "skipping unreadable slot metadata");
                    continue;
                }
            };
            let slot_path = self.slot_path(metadata.slot_id, metadata.quick);
            if slot_path.exists() {
                entries.push(SaveSlotEntry {
                    metadata,
                    path: slot_path,
                });
            }
        }

        entries.sort_by(|a, b| b.metadata.updated_unix_ms.cmp(&a.metadata.updated_unix_ms));
        Ok(entries)
    }

    fn write_record(
        &self,
        slot_id: u16,
        quick: bool,
        record: &SaveRecord,
    ) -> Result<SaveSlotEntry, SaveStoreError> {
        self.ensure_layout()?;
        let slot_path = self.slot_path(slot_id, quick);
        atomic_write(&slot_path, &record.to_binary()?)?;

        let metadata = build_metadata(slot_id, quick, record);
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|err| SaveError::Serialization(err.to_string()))?;
        atomic_write(&self.metadata_path(slot_id, quick), &json)?;
        Ok(SaveSlotEntry {
            metadata,
            path: slot_path,
        })
    }

    fn load_with_recovery(&self, primary_path: &Path) -> Result<SaveRecord, SaveStoreError> {
        let primary_bytes = fs::read(primary_path)?;
        let primary_err = match SaveRecord::from_binary(&primary_bytes) {
            Ok(record) => return Ok(record),
            Err(err) => err,
        };
        let backup_path = backup_path(primary_path);
        match fs::read(&backup_path) {
            Ok(backup_bytes) => match SaveRecord::from_binary(&backup_bytes) {
                Ok(record) => {
                    info!(file = %primary_path.display(), %primary_err, "recovered slot from backup");
                    Ok(record)
                }
                Err(backup_err) => Err(SaveStoreError::RecoveryFailed {
                    primary: primary_err,
                    backup: Some(backup_err),
                }),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SaveStoreError::RecoveryFailed {
                    primary: primary_err,
                    backup: None,
                })
            }
            Err(err) => Err(SaveStoreError::Io(err)),
        }
    }

    fn slot_path(&self, slot_id: u16, quick: bool) -> PathBuf {
        let name = if quick {
            "quicksave.vnps".to_string()
        } else {
            format!("slot_{slot_id:03}.vnps")
        };
        self.root.join("slots").join(name)
    }

    fn metadata_path(&self, slot_id: u16, quick: bool) -> PathBuf {
        let name = if quick {
            "quicksave.json".to_string()
        } else {
            format!("slot_{slot_id:03}.json")
        };
        self.root.join("meta").join(name)
    }
}

/// One slot of a [`SaveSlotStore`], bound to a script.
///
/// Loading a save written for another script is an error rather than a
/// silent mismatch.
#[derive(Clone, Debug)]
pub struct SlotStorage {
    store: SaveSlotStore,
    slot_id: u16,
    script_id: ScriptId,
}

impl SlotStorage {
    pub fn new(store: SaveSlotStore, slot_id: u16, script_id: ScriptId) -> Self {
        Self {
            store,
            slot_id,
            script_id,
        }
    }
}

impl SaveStorage for SlotStorage {
    fn load(&self) -> Result<Option<Save>, SaveStoreError> {
        if !self.store.has_slot(self.slot_id) {
            return Ok(None);
        }
        let record = self.store.load_slot(self.slot_id)?;
        record.validate_script_id(&self.script_id)?;
        Ok(Some(record.save))
    }

    fn store(&mut self, save: &Save) -> Result<(), SaveStoreError> {
        let record = SaveRecord::new(self.script_id, save.clone());
        self.store.save_slot(self.slot_id, &record)?;
        Ok(())
    }
}

fn build_metadata(slot_id: u16, quick: bool, record: &SaveRecord) -> SaveSlotMetadata {
    let save = &record.save;
    SaveSlotMetadata {
        slot_id,
        quick,
        updated_unix_ms: now_unix_ms(),
        script_id_hex: hex_id(&record.script_id),
        kind: save.meta().kind(),
        scene: save.path().scene().map(str::to_string),
        path_len: save.path().len(),
        snapshot_count: save.snapshots().len(),
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), SaveStoreError> {
    let parent = path.parent().ok_or_else(|| {
        SaveStoreError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "target path has no parent",
        ))
    })?;
    fs::create_dir_all(parent)?;
    if path.exists() {
        fs::copy(path, backup_path(path))?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    if path.exists() {
        fs::remove_file(path)?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut output = path.as_os_str().to_os_string();
    output.push(".bak");
    PathBuf::from(output)
}

#[cfg(test)]
#[path = "tests/storage_tests.rs"]
mod tests;
