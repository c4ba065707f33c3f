#![allow(dead_code)]

use std::sync::Arc;

use story_path_engine::{
    Completion, EngineConfig, ExecScope, Executor, Instruction, KeepSets, ScriptStore,
};

/// Branching story used across the integration tests.
pub const FOREST: &str = r#"{"scenes": {
    "start": [
        {"type": "show_background", "background": "forest.png"},
        {"type": "show_character", "character": "ava", "emotion": "calm"},
        {"type": "dialogue", "character": "ava", "text": "A"},
        {"type": "choice", "prompt": "Which way?", "branches": [
            {"label": "x", "actions": [
                {"type": "show_character", "character": "ben"},
                {"type": "play_music", "source": "theme.ogg"},
                {"type": "dialogue", "character": "ben", "text": "B"}
            ]},
            {"label": "y", "actions": [
                {"type": "dialogue", "text": "C"}
            ]}
        ]},
        {"type": "hide_character", "character": "ava"},
        {"type": "dialogue", "text": "D"},
        {"type": "end"}
    ]
}}"#;

pub fn script(json: &str) -> Arc<ScriptStore> {
    Arc::new(ScriptStore::from_json(json).expect("test script compiles"))
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
}

/// Records instruction names and whether they ran during a restore.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    pub executed: Vec<(String, bool)>,
    pub clears: Vec<KeepSets>,
}

impl RecordingExecutor {
    pub fn names(&self) -> Vec<&str> {
        self.executed.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&mut self, instruction: &Instruction, scope: &mut ExecScope<'_>) -> Completion {
        self.executed
            .push((instruction.name().to_string(), scope.restoring));
        Completion::Done
    }

    fn clear(&mut self, keep: &KeepSets) {
        self.clears.push(keep.clone());
    }
}
