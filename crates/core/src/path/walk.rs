//! Shared traversal behind resolution and history reconstruction.
//!
//! The walker rebuilds the branch stack from scratch for every path it
//! processes; nothing about a position lives outside the path itself.

use crate::error::PathError;
use crate::instruction::Instruction;
use crate::script::ScriptStore;

use super::{BranchKind, PathItem};

/// What the traversal currently points at.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Cursor<'s> {
    Root,
    List(&'s [Instruction]),
    Item(&'s Instruction),
    EndOfList,
}

#[derive(Debug)]
struct Frame<'s> {
    list: &'s [Instruction],
    kind: BranchKind,
    resume_at: i64,
}

/// Range of one list selected by an `Index` item.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Segment<'s> {
    pub list: &'s [Instruction],
    pub start: i64,
    pub end: i64,
}

impl<'s> Segment<'s> {
    /// Instructions `start..=end` that exist in the list, with their index.
    pub fn instructions(&self) -> impl Iterator<Item = (i64, &'s Instruction)> + 's {
        let list = self.list;
        let start = self.start.max(0);
        let end = self.end;
        (start..=end).map_while(move |index| {
            usize::try_from(index)
                .ok()
                .and_then(|slot| list.get(slot))
                .map(|instruction| (index, instruction))
        })
    }
}

pub(crate) struct Walker<'s> {
    script: &'s ScriptStore,
    current: Cursor<'s>,
    previous: Cursor<'s>,
    frames: Vec<Frame<'s>>,
    last_index: Option<i64>,
    resume_at: Option<i64>,
}

impl<'s> Walker<'s> {
    pub fn new(script: &'s ScriptStore) -> Self {
        Self {
            script,
            current: Cursor::Root,
            previous: Cursor::Root,
            frames: Vec::new(),
            last_index: None,
            resume_at: None,
        }
    }

    pub fn current(&self) -> Cursor<'s> {
        self.current
    }

    /// Applies one path item. `Index` items return the segment they selected.
    pub fn step(
        &mut self,
        position: usize,
        item: &PathItem,
    ) -> Result<Option<Segment<'s>>, PathError> {
        match item {
            PathItem::JumpTo(scene) => {
                let list = self.scene(position, scene)?;
                self.previous = Cursor::Root;
                self.current = Cursor::List(list);
                self.frames.clear();
                self.last_index = None;
                self.resume_at = None;
                Ok(None)
            }
            PathItem::Index(index) => {
                let Cursor::List(list) = self.current else {
                    return Err(PathError::IndexOutsideList { position });
                };
                let start = self.resume_at.take().unwrap_or(0);
                self.previous = self.current;
                self.current = usize::try_from(*index)
                    .ok()
                    .and_then(|slot| list.get(slot))
                    .map_or(Cursor::EndOfList, Cursor::Item);
                self.last_index = Some(*index);
                Ok(Some(Segment {
                    list,
                    start,
                    end: *index,
                }))
            }
            PathItem::EnterChoice(branch) => {
                let Cursor::Item(Instruction::Choice(choice)) = self.current else {
                    return Err(PathError::NotABranch {
                        position,
                        expected: BranchKind::Choice,
                    });
                };
                let actions = &choice
                    .branches
                    .get(*branch)
                    .ok_or(PathError::UnknownBranch {
                        position,
                        branch: *branch,
                    })?
                    .actions;
                self.push_frame(position, BranchKind::Choice)?;
                self.current = Cursor::List(actions);
                Ok(None)
            }
            PathItem::EnterCondition(key) => {
                let Cursor::Item(Instruction::Condition(condition)) = self.current else {
                    return Err(PathError::NotABranch {
                        position,
                        expected: BranchKind::Condition,
                    });
                };
                let actions = condition
                    .variants
                    .get(key)
                    .ok_or_else(|| PathError::UnknownVariant {
                        position,
                        key: key.clone(),
                    })?;
                self.push_frame(position, BranchKind::Condition)?;
                self.current = Cursor::List(actions);
                Ok(None)
            }
            PathItem::EnterBlock(scene) => {
                if !matches!(self.current, Cursor::Item(_)) {
                    return Err(PathError::NotABranch {
                        position,
                        expected: BranchKind::Block,
                    });
                }
                let list = self.scene(position, scene)?;
                self.push_frame(position, BranchKind::Block)?;
                self.current = Cursor::List(list);
                Ok(None)
            }
            PathItem::ExitChoice | PathItem::ExitCondition | PathItem::ExitBlock => {
                let found = item.exited().unwrap_or(BranchKind::Block);
                let frame = self
                    .frames
                    .pop()
                    .ok_or(PathError::UnbalancedExit { position })?;
                if frame.kind != found {
                    return Err(PathError::MismatchedExit {
                        position,
                        expected: frame.kind,
                        found,
                    });
                }
                self.current = Cursor::List(frame.list);
                self.previous = self.current;
                self.resume_at = Some(frame.resume_at);
                Ok(None)
            }
        }
    }

    fn scene(&self, position: usize, scene: &str) -> Result<&'s [Instruction], PathError> {
        self.script
            .scene(scene)
            .ok_or_else(|| PathError::UnknownScene {
                position,
                scene: scene.to_string(),
            })
    }

    fn push_frame(&mut self, position: usize, kind: BranchKind) -> Result<(), PathError> {
        let (Cursor::List(list), Some(index)) = (self.previous, self.last_index) else {
            return Err(PathError::NotABranch {
                position,
                expected: kind,
            });
        };
        self.frames.push(Frame {
            list,
            kind,
            resume_at: index.saturating_add(1),
        });
        self.last_index = None;
        Ok(())
    }
}
