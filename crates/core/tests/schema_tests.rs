use story_path_engine::{
    script_json_schema, ScriptRaw, ScriptStore, StoryError, SCRIPT_SCHEMA_VERSION,
};

mod common;
use common::FOREST;

#[test]
fn schema_describes_scenes_and_instructions() {
    let schema = script_json_schema();
    assert!(schema["properties"]["scenes"].is_object());
    let instruction = &schema["definitions"]["Instruction"];
    assert!(instruction.is_object());
    let text = instruction.to_string();
    for tag in ["dialogue", "choice", "condition", "block", "jump", "custom"] {
        assert!(text.contains(&format!("\"{tag}\"")), "schema lacks {tag}");
    }
}

#[test]
fn script_without_schema_version_is_accepted() {
    let parsed = ScriptRaw::from_json(FOREST).unwrap();
    assert!(parsed.scenes.contains_key("start"));
}

#[test]
fn same_major_version_is_accepted_and_other_majors_rejected() {
    let minor = r#"{"script_schema_version": "1.7", "scenes": {"start": [{"type": "end"}]}}"#;
    assert!(ScriptRaw::from_json(minor).is_ok());

    let future = r#"{"script_schema_version": "9.0", "scenes": {"start": [{"type": "end"}]}}"#;
    match ScriptRaw::from_json(future) {
        Err(StoryError::SchemaIncompatible { found, expected }) => {
            assert_eq!(found, "9.0");
            assert_eq!(expected, SCRIPT_SCHEMA_VERSION);
        }
        other => panic!("expected a schema error, got {other:?}"),
    }
}

#[test]
fn script_id_is_stable_across_serialization() {
    let first = ScriptStore::from_json(FOREST).unwrap();
    let second = ScriptStore::from_json(FOREST).unwrap();
    assert_eq!(first.script_id(), second.script_id());
    assert_eq!(first.script_id_hex().len(), 64);

    let json = first.to_raw().to_json().unwrap();
    let reparsed = ScriptStore::from_json(&json).unwrap();
    assert_eq!(reparsed.script_id(), first.script_id());

    let other = ScriptStore::from_json(r#"{"scenes": {"start": [{"type": "end"}]}}"#).unwrap();
    assert_ne!(other.script_id(), first.script_id());
}
