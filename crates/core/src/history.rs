//! Reconstruction of every instruction executed to reach a position.

use serde::Serialize;

use crate::error::PathError;
use crate::instruction::Instruction;
use crate::path::{StoryPath, Walker};
use crate::script::ScriptStore;

/// One reconstructed instruction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HistoryEntry<'s> {
    pub instruction: &'s Instruction,
    pub interactive: bool,
    /// The interactive instruction the path currently rests on.
    pub preserved: bool,
}

/// Instructions in execution order, borrowed from the script.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct History<'s> {
    pub entries: Vec<HistoryEntry<'s>>,
}

impl<'s> History<'s> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry<'s>> {
        self.entries.last()
    }

    pub fn instructions(&self) -> impl Iterator<Item = &'s Instruction> + '_ {
        self.entries.iter().map(|entry| entry.instruction)
    }
}

/// Replays `path` from its start and lists the instructions it went through.
///
/// Each `Index(n)` emits the instructions from where that list was last
/// left up to `n`, so instructions before an entered branch appear once.
/// With `filter`, interactive entries other than the final one are left out.
pub fn reconstruct<'s>(
    script: &'s ScriptStore,
    path: &StoryPath,
    filter: bool,
) -> Result<History<'s>, PathError> {
    let mut walker = Walker::new(script);
    let mut segments = Vec::new();
    for (position, item) in path.items().iter().enumerate() {
        if let Some(segment) = walker.step(position, item)? {
            segments.push(segment);
        }
    }

    let mut history = History::default();
    let last_segment = segments.len().checked_sub(1);
    for (segment_index, segment) in segments.iter().enumerate() {
        let is_last = Some(segment_index) == last_segment;
        for (index, instruction) in segment.instructions() {
            let interactive = instruction.is_interactive();
            let preserved = interactive && is_last && index == segment.end;
            if filter && interactive && !preserved {
                continue;
            }
            history.entries.push(HistoryEntry {
                instruction,
                interactive,
                preserved,
            });
        }
    }
    Ok(history)
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;
