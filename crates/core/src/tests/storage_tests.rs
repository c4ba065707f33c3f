use super::*;
use crate::path::{PathItem, StoryPath};
use crate::save::SaveMeta;
use crate::state::PlayerState;

fn sample_save(index: i64) -> Save {
    let mut state = PlayerState::new();
    state.set_flag("met_ava", true);
    state.set_var("gold", 42);
    Save(
        StoryPath::new(vec![
            PathItem::JumpTo("start".to_string()),
            PathItem::Index(index),
        ]),
        state.clone(),
        SaveMeta(1_000, SaveKind::Manual),
        vec![state],
    )
}

fn sample_record(index: i64) -> SaveRecord {
    SaveRecord::new([1u8; 32], sample_save(index))
}

#[test]
fn binary_record_survives_encoding() {
    let record = sample_record(4);
    let bytes = record.to_binary().unwrap();
    assert_eq!(&bytes[0..4], b"VNPS");
    assert_eq!(SaveRecord::from_binary(&bytes).unwrap(), record);
}

#[test]
fn binary_record_rejects_damage() {
    let bytes = sample_record(4).to_binary().unwrap();

    assert_eq!(
        SaveRecord::from_binary(&bytes[..6]),
        Err(SaveError::TooSmall)
    );

    let mut magic = bytes.clone();
    magic[0] = b'X';
    assert_eq!(SaveRecord::from_binary(&magic), Err(SaveError::InvalidMagic));

    let mut version = bytes.clone();
    version[4] = 99;
    assert!(matches!(
        SaveRecord::from_binary(&version),
        Err(SaveError::IncompatibleVersion { found: 99, .. })
    ));

    let mut flipped = bytes.clone();
    let last = flipped.len() - 1;
    flipped[last] ^= 0xFF;
    assert_eq!(
        SaveRecord::from_binary(&flipped),
        Err(SaveError::ChecksumMismatch)
    );

    let truncated = &bytes[..bytes.len() - 1];
    assert_eq!(
        SaveRecord::from_binary(truncated),
        Err(SaveError::LengthMismatch)
    );
}

#[test]
fn slot_store_roundtrip_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveSlotStore::new(dir.path());

    let entry = store.save_slot(1, &sample_record(7)).unwrap();
    assert_eq!(entry.metadata.slot_id, 1);
    assert!(!entry.metadata.quick);
    assert_eq!(entry.metadata.scene.as_deref(), Some("start"));
    assert_eq!(entry.metadata.path_len, 2);
    assert_eq!(entry.metadata.kind, SaveKind::Manual);
    assert!(entry.path.exists());

    let loaded = store.load_slot(1).unwrap();
    assert_eq!(loaded, sample_record(7));
    assert!(loaded.save.state().get_flag("met_ava"));

    let slots = store.list_slots().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].metadata.slot_id, 1);

    store.remove_slot(1).unwrap();
    assert!(store.list_slots().unwrap().is_empty());
}

#[test]
fn quicksave_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveSlotStore::new(dir.path());

    let entry = store.quicksave(&sample_record(11)).unwrap();
    assert!(entry.metadata.quick);
    assert_eq!(entry.metadata.slot_id, 0);
    assert_eq!(store.quickload().unwrap(), sample_record(11));
}

#[test]
fn slot_load_recovers_from_corrupted_primary() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveSlotStore::new(dir.path());
    store.save_slot(7, &sample_record(3)).unwrap();
    store.save_slot(7, &sample_record(9)).unwrap();

    let primary_path = dir.path().join("slots").join("slot_007.vnps");
    fs::write(&primary_path, [0u8, 1, 2, 3]).unwrap();

    let recovered = store.load_slot(7).unwrap();
    assert_eq!(recovered, sample_record(3));
}

#[test]
fn quickload_reports_recovery_failure_when_no_backup() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveSlotStore::new(dir.path());
    store.ensure_layout().unwrap();
    fs::write(dir.path().join("slots").join("quicksave.vnps"), [9u8, 9, 9]).unwrap();

    let err = store.quickload().unwrap_err();
    assert!(matches!(
        err,
        SaveStoreError::RecoveryFailed { backup: None, .. }
    ));
    assert!(err.to_string().contains("missing"));
}

#[test]
fn list_slots_skips_unreadable_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveSlotStore::new(dir.path());
    store.save_slot(2, &sample_record(1)).unwrap();
    fs::write(dir.path().join("meta").join("slot_009.json"), b"not json").unwrap();

    let slots = store.list_slots().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].metadata.slot_id, 2);
}

#[test]
fn slot_storage_checks_the_script() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveSlotStore::new(dir.path());

    let mut storage = SlotStorage::new(store.clone(), 4, [1u8; 32]);
    assert_eq!(storage.load().unwrap(), None);
    storage.store(&sample_save(2)).unwrap();
    assert_eq!(storage.load().unwrap(), Some(sample_save(2)));

    let other = SlotStorage::new(store, 4, [2u8; 32]);
    assert!(matches!(
        other.load(),
        Err(SaveStoreError::Save(SaveError::ScriptMismatch))
    ));
}

#[test]
fn memory_storage_keeps_the_last_save() {
    let mut storage = MemoryStorage::new();
    assert_eq!(storage.load().unwrap(), None);
    storage.store(&sample_save(1)).unwrap();
    storage.store(&sample_save(5)).unwrap();
    assert_eq!(storage.load().unwrap(), Some(sample_save(5)));
}
