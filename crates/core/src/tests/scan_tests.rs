use super::*;
use crate::path::PathItem;

fn labels(found: &[&Instruction]) -> Vec<String> {
    found
        .iter()
        .map(|instruction| match instruction {
            Instruction::ShowBackground { background } => format!("bg:{background}"),
            Instruction::ShowCharacter { character, .. } => format!("char:{character}"),
            Instruction::PlayMusic { source } => format!("music:{source}"),
            Instruction::Dialogue(dialogue) => format!("say:{}", dialogue.text),
            other => other.name().to_string(),
        })
        .collect()
}

fn first_step(scene: &str) -> StoryPath {
    let mut path = StoryPath::jump(scene);
    advance(&mut path);
    path
}

#[test]
fn scan_stops_at_the_next_blocking_instruction() {
    let script = ScriptStore::from_json(
        r#"{"scenes": {"start": [
            {"type": "show_background", "background": "hall.png"},
            {"type": "vibrate", "pattern": [50]},
            {"type": "dialogue", "text": "hello"},
            {"type": "show_background", "background": "never.png"}
        ]}}"#,
    )
    .unwrap();
    let found = scan_forward(&script, &first_step("start"), ScanLimits::default());
    assert_eq!(labels(&found), vec!["bg:hall.png", "vibrate", "say:hello"]);
}

#[test]
fn every_choice_branch_is_followed() {
    let script = ScriptStore::from_json(
        r#"{"scenes": {
            "start": [
                {"type": "choice", "branches": [
                    {"label": "x", "actions": [
                        {"type": "show_character", "character": "ava"},
                        {"type": "jump", "scene": "ending"}
                    ]},
                    {"label": "y", "actions": [{"type": "play_music", "source": "tense"}]}
                ]},
                {"type": "show_background", "background": "after.png"},
                {"type": "end"}
            ],
            "ending": [
                {"type": "show_background", "background": "sunset.png"},
                {"type": "end"}
            ]
        }}"#,
    )
    .unwrap();
    let found = scan_forward(&script, &first_step("start"), ScanLimits::default());
    assert_eq!(
        labels(&found),
        vec![
            "choice",
            "char:ava",
            "bg:sunset.png",
            "music:tense",
            "bg:after.png"
        ]
    );
}

#[test]
fn condition_variants_and_blocks_are_scanned() {
    let script = ScriptStore::from_json(
        r#"{"scenes": {
            "start": [
                {"type": "condition", "selector": {"kind": "flag", "key": "rich"}, "variants": {
                    "false": [{"type": "show_background", "background": "slum.png"}],
                    "true": [{"type": "block", "scene": "palace"}]
                }},
                {"type": "text", "text": "done"}
            ],
            "palace": [{"type": "show_background", "background": "palace.png"}]
        }}"#,
    )
    .unwrap();
    let found = scan_forward(&script, &first_step("start"), ScanLimits::default());
    assert_eq!(
        labels(&found),
        vec!["bg:slum.png", "text", "bg:palace.png"]
    );
}

#[test]
fn shared_instructions_are_reported_once() {
    let script = ScriptStore::from_json(
        r#"{"scenes": {
            "start": [
                {"type": "choice", "branches": [
                    {"label": "x", "actions": [{"type": "wait", "ms": 1}]},
                    {"label": "y", "actions": [{"type": "wait", "ms": 2}]}
                ]},
                {"type": "show_background", "background": "shared.png"},
                {"type": "end"}
            ]
        }}"#,
    )
    .unwrap();
    let found = scan_forward(&script, &first_step("start"), ScanLimits::default());
    assert_eq!(
        labels(&found),
        vec!["choice", "wait", "bg:shared.png", "wait"]
    );
}

#[test]
fn looping_scenes_are_cut_by_the_step_budget() {
    let script = ScriptStore::from_json(
        r#"{"scenes": {"start": [
            {"type": "preload", "source": "loop.png"},
            {"type": "jump", "scene": "start"}
        ]}}"#,
    )
    .unwrap();
    let limits = ScanLimits {
        max_steps: 10,
        max_depth: 4,
    };
    let found = scan_forward(&script, &first_step("start"), limits);
    assert_eq!(labels(&found), vec!["preload"]);
}

#[test]
fn deep_nesting_is_cut_by_the_depth_budget() {
    let script = ScriptStore::from_json(
        r#"{"scenes": {"start": [
            {"type": "choice", "branches": [{"label": "a", "actions": [
                {"type": "choice", "branches": [{"label": "b", "actions": [
                    {"type": "show_background", "background": "deep.png"}
                ]}]}
            ]}]}
        ]}}"#,
    )
    .unwrap();
    let shallow = ScanLimits {
        max_steps: 64,
        max_depth: 1,
    };
    let found = scan_forward(&script, &first_step("start"), shallow);
    assert_eq!(labels(&found), vec!["choice", "choice"]);

    let found = scan_forward(&script, &first_step("start"), ScanLimits::default());
    assert_eq!(labels(&found), vec!["choice", "choice", "bg:deep.png"]);
}

#[test]
fn broken_paths_yield_nothing() {
    let script = ScriptStore::from_json(r#"{"scenes": {"start": [{"type": "end"}]}}"#).unwrap();
    let path = StoryPath::new(vec![PathItem::JumpTo("gone".to_string()), PathItem::Index(0)]);
    assert!(scan_forward(&script, &path, ScanLimits::default()).is_empty());
}
