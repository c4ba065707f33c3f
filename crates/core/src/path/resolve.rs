use crate::error::PathError;
use crate::instruction::Instruction;
use crate::script::ScriptStore;

use super::walk::{Cursor, Walker};
use super::StoryPath;

/// What a path designates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Position<'s> {
    Instruction(&'s Instruction),
    /// The path points past the end of a list (or at no list at all).
    EndOfList,
}

impl<'s> Position<'s> {
    pub fn instruction(self) -> Option<&'s Instruction> {
        match self {
            Position::Instruction(instruction) => Some(instruction),
            Position::EndOfList => None,
        }
    }

    pub fn is_end_of_list(self) -> bool {
        matches!(self, Position::EndOfList)
    }
}

/// Resolves `path` against `script`.
///
/// Runs in time linear in the path length. Malformed paths produce a
/// [`PathError`] naming the offending item.
pub fn resolve<'s>(script: &'s ScriptStore, path: &StoryPath) -> Result<Position<'s>, PathError> {
    let mut walker = Walker::new(script);
    for (position, item) in path.items().iter().enumerate() {
        walker.step(position, item)?;
    }
    Ok(match walker.current() {
        Cursor::Item(instruction) => Position::Instruction(instruction),
        Cursor::Root | Cursor::List(_) | Cursor::EndOfList => Position::EndOfList,
    })
}
