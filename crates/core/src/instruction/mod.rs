//! Instruction definitions for scene scripts.
//!
//! The instruction set is closed: every tag a script may use is a variant of
//! [`Instruction`], and unknown tags fail when the script is parsed.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod branching;
pub mod choice;
pub mod custom;
mod flatten;

pub use branching::{CmpOp, Cond, Condition, Selector, SelectorCase};
pub use choice::{Choice, ChoiceBranch};
pub use custom::CustomAction;
pub(crate) use flatten::{flat_list, flat_map};

/// Instruction names that are never silently re-triggered during a restore.
pub const SKIPPED_ON_RESTORE: [&str; 5] = ["dialogue", "choice", "input", "vibrate", "text"];

/// One scripted action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    Dialogue(Dialogue),
    Text {
        text: String,
    },
    Input {
        question: String,
        variable: String,
    },
    Choice(Choice),
    Vibrate {
        pattern: Vec<u64>,
    },
    Condition(Condition),
    Block {
        scene: String,
    },
    Exit,
    Jump {
        scene: String,
    },
    End,
    ShowBackground {
        background: String,
    },
    ShowCharacter {
        character: String,
        #[serde(default)]
        emotion: Option<String>,
        #[serde(default)]
        style: Option<String>,
    },
    HideCharacter {
        character: String,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    AnimateCharacter {
        character: String,
        #[serde(default)]
        classes: Vec<String>,
        #[serde(default)]
        timeout_ms: u64,
    },
    PlayMusic {
        source: String,
    },
    PauseMusic {
        source: String,
    },
    StopMusic {
        source: String,
    },
    PlaySound {
        source: String,
        #[serde(default)]
        looped: bool,
    },
    PauseSound {
        source: String,
    },
    StopSound {
        source: String,
    },
    Voice {
        source: String,
    },
    StopVoice,
    Preload {
        source: String,
    },
    Wait {
        ms: u64,
    },
    Clear(Clear),
    SetFlag {
        key: String,
        value: bool,
    },
    SetVar {
        key: String,
        value: i64,
    },
    Custom(CustomAction),
}

/// A line of dialogue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Dialogue {
    #[serde(default)]
    pub character: Option<String>,
    pub text: String,
    #[serde(default)]
    pub emotion: Option<String>,
}

/// Clears the stage, keeping the listed characters and audio sources alive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Clear {
    #[serde(default)]
    pub keep_characters: Vec<String>,
    #[serde(default)]
    pub keep_audio: Vec<String>,
}

impl Clear {
    pub fn keeps_character(&self, character: &str) -> bool {
        self.keep_characters.iter().any(|kept| kept == character)
    }

    pub fn keeps_audio(&self, source: &str) -> bool {
        self.keep_audio.iter().any(|kept| kept == source)
    }
}

/// External resource an instruction needs loaded before it runs.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetRef {
    Image {
        path: String,
    },
    Character {
        name: String,
        emotion: Option<String>,
    },
    Audio {
        path: String,
    },
}

impl Instruction {
    /// Returns the wire tag of the instruction.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Dialogue(_) => "dialogue",
            Instruction::Text { .. } => "text",
            Instruction::Input { .. } => "input",
            Instruction::Choice(_) => "choice",
            Instruction::Vibrate { .. } => "vibrate",
            Instruction::Condition(_) => "condition",
            Instruction::Block { .. } => "block",
            Instruction::Exit => "exit",
            Instruction::Jump { .. } => "jump",
            Instruction::End => "end",
            Instruction::ShowBackground { .. } => "show_background",
            Instruction::ShowCharacter { .. } => "show_character",
            Instruction::HideCharacter { .. } => "hide_character",
            Instruction::AnimateCharacter { .. } => "animate_character",
            Instruction::PlayMusic { .. } => "play_music",
            Instruction::PauseMusic { .. } => "pause_music",
            Instruction::StopMusic { .. } => "stop_music",
            Instruction::PlaySound { .. } => "play_sound",
            Instruction::PauseSound { .. } => "pause_sound",
            Instruction::StopSound { .. } => "stop_sound",
            Instruction::Voice { .. } => "voice",
            Instruction::StopVoice => "stop_voice",
            Instruction::Preload { .. } => "preload",
            Instruction::Wait { .. } => "wait",
            Instruction::Clear(_) => "clear",
            Instruction::SetFlag { .. } => "set_flag",
            Instruction::SetVar { .. } => "set_var",
            Instruction::Custom(_) => "custom",
        }
    }

    /// True for instructions that must not be replayed silently after a restore.
    pub fn is_skipped_on_restore(&self) -> bool {
        SKIPPED_ON_RESTORE.contains(&self.name())
    }

    /// True for custom actions that wait for the player.
    pub fn requires_user_action(&self) -> bool {
        matches!(self, Instruction::Custom(action) if action.requires_user_action)
    }

    /// Membership of the reconstruction skip set.
    pub fn is_interactive(&self) -> bool {
        self.is_skipped_on_restore() || self.requires_user_action()
    }

    /// True when play cannot move past this instruction without the player.
    ///
    /// Vibration is skipped on restore but never blocks.
    pub fn is_blocking(&self) -> bool {
        self.requires_user_action()
            || (self.is_skipped_on_restore() && !matches!(self, Instruction::Vibrate { .. }))
    }

    /// Instructions that only move the path and have no effect to render.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Instruction::Condition(_)
                | Instruction::Block { .. }
                | Instruction::Exit
                | Instruction::Jump { .. }
                | Instruction::End
        )
    }

    /// Nested instruction lists with the label used to address them.
    pub fn nested_lists(&self) -> Vec<(&str, &[Instruction])> {
        match self {
            Instruction::Choice(choice) => choice
                .branches
                .iter()
                .map(|branch| (branch.label.as_str(), branch.actions.as_slice()))
                .collect(),
            Instruction::Condition(condition) => condition
                .variants
                .iter()
                .map(|(key, actions)| (key.as_str(), actions.as_slice()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Resources the instruction will ask the renderer for.
    pub fn assets(&self) -> Vec<AssetRef> {
        match self {
            Instruction::ShowBackground { background } => vec![AssetRef::Image {
                path: background.clone(),
            }],
            Instruction::ShowCharacter {
                character, emotion, ..
            } => vec![AssetRef::Character {
                name: character.clone(),
                emotion: emotion.clone(),
            }],
            Instruction::Dialogue(Dialogue {
                character: Some(character),
                emotion: Some(emotion),
                ..
            }) => vec![AssetRef::Character {
                name: character.clone(),
                emotion: Some(emotion.clone()),
            }],
            Instruction::PlayMusic { source }
            | Instruction::PlaySound { source, .. }
            | Instruction::Voice { source } => vec![AssetRef::Audio {
                path: source.clone(),
            }],
            Instruction::Preload { source } => vec![AssetRef::Image {
                path: source.clone(),
            }],
            Instruction::Choice(choice) => choice
                .branches
                .iter()
                .filter_map(|branch| branch.illustration.clone())
                .map(|path| AssetRef::Image { path })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Serializes the instruction to a JSON string.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}
