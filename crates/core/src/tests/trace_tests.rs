use super::*;

fn script(json: &str) -> Arc<ScriptStore> {
    Arc::new(ScriptStore::from_json(json).unwrap())
}

#[test]
fn trace_follows_the_requested_choices() {
    let script = script(
        r#"{"scenes": {"start": [
            {"type": "dialogue", "character": "ava", "text": "Pick one"},
            {"type": "choice", "prompt": "Where?", "branches": [
                {"label": "Left", "actions": [{"type": "set_flag", "key": "went_left", "value": true}]},
                {"label": "Right", "actions": [{"type": "text", "text": "right side"}]}
            ]},
            {"type": "end"}
        ]}}"#,
    );
    let (trace, outcome) = trace_story(script, EngineConfig::default(), &[0], 50).unwrap();
    assert_eq!(outcome, PlayOutcome::Ended);
    let views: Vec<_> = trace.views().cloned().collect();
    assert_eq!(
        views,
        vec![
            UiView::Dialogue {
                speaker: "ava".to_string(),
                text: "Pick one".to_string(),
            },
            UiView::Choice {
                prompt: "Where?".to_string(),
                options: vec!["Left".to_string(), "Right".to_string()],
            },
            UiView::System {
                message: "set_flag went_left = true".to_string(),
            },
        ]
    );
    assert_eq!(trace.steps[2].state.flags.get("went_left"), Some(&true));
}

#[test]
fn hidden_branches_are_not_listed() {
    let script = script(
        r#"{"scenes": {"start": [
            {"type": "choice", "branches": [
                {"label": "Secret", "visible": {"kind": "flag", "key": "found_key", "is_set": true},
                 "actions": [{"type": "wait", "ms": 1}]},
                {"label": "Leave", "actions": [{"type": "wait", "ms": 1}]}
            ]}
        ]}}"#,
    );
    let (trace, _) = trace_story(script, EngineConfig::default(), &[1], 10).unwrap();
    assert_eq!(
        trace.steps[0].view,
        UiView::Choice {
            prompt: String::new(),
            options: vec!["Leave".to_string()],
        }
    );
}

#[test]
fn stage_digest_follows_clear_and_keep_sets() {
    let mut stage = StageDigest::default();
    for instruction in [
        Instruction::ShowCharacter {
            character: "ava".to_string(),
            emotion: None,
            style: None,
        },
        Instruction::ShowCharacter {
            character: "ben".to_string(),
            emotion: None,
            style: None,
        },
        Instruction::PlayMusic {
            source: "theme".to_string(),
        },
    ] {
        stage.apply(&instruction);
    }
    let mut keep = KeepSets::default();
    keep.characters.insert("ben".to_string());
    stage.retain(&keep);
    assert_eq!(stage.characters.iter().collect::<Vec<_>>(), vec!["ben"]);
    assert!(stage.music.is_empty());
}

#[test]
fn step_limit_stops_endless_scripts() {
    let script = script(r#"{"scenes": {"start": [{"type": "wait", "ms": 1}, {"type": "jump", "scene": "start"}]}}"#);
    let (trace, outcome) = trace_story(script, EngineConfig::default(), &[], 9).unwrap();
    assert_eq!(outcome, PlayOutcome::StepLimit);
    assert!(trace.steps.len() <= 9);
}
