use tracing::debug;

use crate::instruction::Instruction;
use crate::script::ScriptStore;

use super::resolve::{resolve, Position};
use super::walk::{Cursor, Walker};
use super::{BranchKind, PathItem, StoryPath};

/// Result of [`exit_current_branch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited,
    /// No open branch to leave, or the path is malformed. The path is unchanged.
    Impossible,
}

/// Moves the path one instruction forward in the current list.
pub fn advance(path: &mut StoryPath) {
    match path.last_mut() {
        Some(PathItem::Index(index)) => *index = index.saturating_add(1),
        _ => path.push(PathItem::Index(0)),
    }
}

/// Enters branch `branch` of the choice the path points at.
pub fn enter_choice(path: &mut StoryPath, branch: usize) {
    path.push(PathItem::EnterChoice(branch));
    path.push(PathItem::Index(0));
}

/// Enters variant `key` of the condition the path points at.
pub fn enter_condition(path: &mut StoryPath, key: impl Into<String>) {
    path.push(PathItem::EnterCondition(key.into()));
    path.push(PathItem::Index(0));
}

/// Enters `scene` as a sub-scene that returns here when exhausted.
pub fn enter_block(path: &mut StoryPath, scene: impl Into<String>) {
    path.push(PathItem::EnterBlock(scene.into()));
    path.push(PathItem::Index(0));
}

/// Leaves the innermost open branch and points at the instruction after it.
///
/// Works on a copy and only commits on success, so an `Impossible` outcome
/// leaves `path` exactly as it was.
pub fn exit_current_branch(script: &ScriptStore, path: &mut StoryPath) -> ExitOutcome {
    let mut work = path.clone();
    if !shrink_to_instruction(script, &mut work) {
        debug!(?path, "no instruction left to exit from");
        return ExitOutcome::Impossible;
    }

    let Some((enter_at, kind)) = innermost_open_branch(work.items()) else {
        debug!(?path, "no open branch to exit");
        return ExitOutcome::Impossible;
    };
    let Some(PathItem::Index(outer)) = enter_at.checked_sub(1).and_then(|at| work.items().get(at))
    else {
        debug!(?path, enter_at, "branch entered without a preceding index");
        return ExitOutcome::Impossible;
    };
    let resume = outer.saturating_add(1);

    work.push(PathItem::exit_for(kind));
    work.push(PathItem::Index(resume));
    if let Err(err) = resolve(script, &work) {
        debug!(%err, "exit produced an unresolvable path");
        return ExitOutcome::Impossible;
    }

    *path = work;
    ExitOutcome::Exited
}

/// Drops or clamps trailing items until the path designates an instruction.
fn shrink_to_instruction(script: &ScriptStore, path: &mut StoryPath) -> bool {
    while !path.is_empty() {
        match resolve(script, path) {
            Ok(Position::Instruction(_)) => return true,
            Ok(Position::EndOfList) => {}
            Err(_) => return false,
        }
        let clamp_to = match path.last() {
            Some(PathItem::Index(index)) if *index > 0 => enclosing_list(script, path)
                .and_then(|list| list.len().checked_sub(1))
                .and_then(|last| i64::try_from(last).ok())
                .filter(|last| last < index),
            _ => None,
        };
        match (clamp_to, path.last_mut()) {
            (Some(last), Some(PathItem::Index(index))) => *index = last,
            _ => {
                path.pop();
            }
        }
    }
    false
}

/// The list the trailing `Index` item of `path` selects from.
fn enclosing_list<'s>(script: &'s ScriptStore, path: &StoryPath) -> Option<&'s [Instruction]> {
    let (_, prefix) = path.items().split_last()?;
    let mut walker = Walker::new(script);
    for (position, item) in prefix.iter().enumerate() {
        walker.step(position, item).ok()?;
    }
    match walker.current() {
        Cursor::List(list) => Some(list),
        _ => None,
    }
}

/// Finds the nearest Enter marker that no later Exit closes.
fn innermost_open_branch(items: &[PathItem]) -> Option<(usize, BranchKind)> {
    let mut closed: Vec<BranchKind> = Vec::new();
    for (position, item) in items.iter().enumerate().rev() {
        if let Some(kind) = item.exited() {
            closed.push(kind);
        } else if let Some(kind) = item.entered() {
            match closed.pop() {
                None => return Some((position, kind)),
                Some(open) if open == kind => {}
                Some(_) => return None,
            }
        } else if matches!(item, PathItem::JumpTo(_)) {
            return None;
        }
    }
    None
}
