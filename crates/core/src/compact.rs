//! Reduction of a reconstructed history to the effects worth replaying.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::history::History;
use crate::instruction::{CustomAction, Instruction};

/// Ids whose most recent effect is still active after a replay.
///
/// The renderer clears everything not named here before replaying.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepSets {
    pub characters: BTreeSet<String>,
    pub music: BTreeSet<String>,
    pub sounds: BTreeSet<String>,
}

impl KeepSets {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.music.is_empty() && self.sounds.is_empty()
    }
}

/// Host hook deciding which custom actions a restore may skip.
pub trait RestorePolicy {
    /// Called for custom actions that no later call supersedes. `later`
    /// holds every instruction that follows in the history.
    fn skip_custom(&self, action: &CustomAction, later: &[&Instruction]) -> bool {
        let _ = later;
        action.skip_on_restore
    }
}

/// Skips exactly the custom actions flagged `skip_on_restore`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRestorePolicy;

impl RestorePolicy for DefaultRestorePolicy {}

/// Replay queue plus the keep sets it implies.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Compacted<'s> {
    pub queue: Vec<&'s Instruction>,
    pub keep: KeepSets,
}

/// Drops every history entry whose effect a later entry overrides.
///
/// Pure and idempotent: compacting the queue of a previous compaction
/// returns the same queue.
pub fn compact<'s>(history: &History<'s>, policy: &dyn RestorePolicy) -> Compacted<'s> {
    let all: Vec<&'s Instruction> = history.instructions().collect();
    let mut compacted = Compacted::default();

    for (index, entry) in history.entries.iter().enumerate() {
        if entry.interactive && !entry.preserved {
            continue;
        }
        let later = &all[index + 1..];
        if superseded(entry.instruction, later, policy) {
            continue;
        }
        match entry.instruction {
            Instruction::ShowCharacter { character, .. } => {
                compacted.keep.characters.insert(character.clone());
            }
            Instruction::PlayMusic { source } => {
                compacted.keep.music.insert(source.clone());
            }
            Instruction::PlaySound { source, .. } => {
                compacted.keep.sounds.insert(source.clone());
            }
            _ => {}
        }
        compacted.queue.push(entry.instruction);
    }
    compacted
}

fn superseded(instruction: &Instruction, later: &[&Instruction], policy: &dyn RestorePolicy) -> bool {
    match instruction {
        Instruction::ShowCharacter { character, .. } | Instruction::HideCharacter { character, .. } => {
            later.iter().any(|next| match next {
                Instruction::ShowCharacter { character: other, .. }
                | Instruction::HideCharacter { character: other, .. } => other == character,
                Instruction::Clear(clear) => !clear.keeps_character(character),
                _ => false,
            })
        }
        Instruction::PlayMusic { source }
        | Instruction::PauseMusic { source }
        | Instruction::StopMusic { source } => later.iter().any(|next| match next {
            Instruction::PlayMusic { source: other }
            | Instruction::PauseMusic { source: other }
            | Instruction::StopMusic { source: other } => other == source,
            Instruction::Clear(clear) => !clear.keeps_audio(source),
            _ => false,
        }),
        Instruction::PlaySound { source, .. }
        | Instruction::PauseSound { source }
        | Instruction::StopSound { source } => later.iter().any(|next| match next {
            Instruction::PlaySound { source: other, .. }
            | Instruction::PauseSound { source: other }
            | Instruction::StopSound { source: other } => other == source,
            Instruction::Clear(clear) => !clear.keeps_audio(source),
            _ => false,
        }),
        Instruction::Voice { .. } | Instruction::StopVoice => later
            .iter()
            .any(|next| matches!(next, Instruction::Voice { .. } | Instruction::StopVoice)),
        Instruction::ShowBackground { .. } => later
            .iter()
            .any(|next| matches!(next, Instruction::ShowBackground { .. })),
        Instruction::Preload { source } => later
            .iter()
            .any(|next| matches!(next, Instruction::Preload { source: other } if other == source)),
        Instruction::AnimateCharacter { character, .. } => later.iter().any(|next| match next {
            Instruction::ShowCharacter { character: other, .. }
            | Instruction::HideCharacter { character: other, .. }
            | Instruction::AnimateCharacter { character: other, .. } => other == character,
            _ => false,
        }),
        Instruction::Custom(action) => {
            if action.latest_only
                && later
                    .iter()
                    .any(|next| matches!(next, Instruction::Custom(other) if action.same_call(other)))
            {
                return true;
            }
            policy.skip_custom(action, later)
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/compact_tests.rs"]
mod tests;
