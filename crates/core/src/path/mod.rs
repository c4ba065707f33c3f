//! Serializable instruction pointer over the branching script.
//!
//! A [`StoryPath`] records only decisions (which scene, which index, which
//! branch), never script content, so it stays small and survives being
//! stored and restored elsewhere.

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

mod navigate;
mod resolve;
mod walk;

pub use navigate::{
    advance, enter_block, enter_choice, enter_condition, exit_current_branch, ExitOutcome,
};
pub use resolve::{resolve, Position};
pub(crate) use walk::Walker;

/// Kind of nested list a path can enter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Choice,
    Condition,
    Block,
}

impl BranchKind {
    fn tag(self) -> &'static str {
        match self {
            BranchKind::Choice => "choice",
            BranchKind::Condition => "condition",
            BranchKind::Block => "block",
        }
    }

    fn exit_tag(self) -> &'static str {
        match self {
            BranchKind::Choice => "choice:exit",
            BranchKind::Condition => "condition:exit",
            BranchKind::Block => "block:exit",
        }
    }
}

/// One decision or step within a path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum PathItem {
    JumpTo(String),
    Index(i64),
    EnterChoice(usize),
    EnterCondition(String),
    EnterBlock(String),
    ExitChoice,
    ExitCondition,
    ExitBlock,
}

impl PathItem {
    /// Kind of branch this item enters, if it is an enter marker.
    pub fn entered(&self) -> Option<BranchKind> {
        match self {
            PathItem::EnterChoice(_) => Some(BranchKind::Choice),
            PathItem::EnterCondition(_) => Some(BranchKind::Condition),
            PathItem::EnterBlock(_) => Some(BranchKind::Block),
            _ => None,
        }
    }

    /// Kind of branch this item closes, if it is an exit marker.
    pub fn exited(&self) -> Option<BranchKind> {
        match self {
            PathItem::ExitChoice => Some(BranchKind::Choice),
            PathItem::ExitCondition => Some(BranchKind::Condition),
            PathItem::ExitBlock => Some(BranchKind::Block),
            _ => None,
        }
    }

    pub fn exit_for(kind: BranchKind) -> Self {
        match kind {
            BranchKind::Choice => PathItem::ExitChoice,
            BranchKind::Condition => PathItem::ExitCondition,
            BranchKind::Block => PathItem::ExitBlock,
        }
    }
}

// Wire format: `["jump", scene]`, `[null, n]`, `["choice", i]`,
// `["condition", key]`, `["block", scene]`, `["<kind>:exit"]`.
impl Serialize for PathItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.exited().is_some() { 1 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        match self {
            PathItem::JumpTo(scene) => {
                seq.serialize_element(&Some("jump"))?;
                seq.serialize_element(scene)?;
            }
            PathItem::Index(index) => {
                seq.serialize_element(&None::<&str>)?;
                seq.serialize_element(index)?;
            }
            PathItem::EnterChoice(branch) => {
                seq.serialize_element(&Some(BranchKind::Choice.tag()))?;
                seq.serialize_element(branch)?;
            }
            PathItem::EnterCondition(key) => {
                seq.serialize_element(&Some(BranchKind::Condition.tag()))?;
                seq.serialize_element(key)?;
            }
            PathItem::EnterBlock(scene) => {
                seq.serialize_element(&Some(BranchKind::Block.tag()))?;
                seq.serialize_element(scene)?;
            }
            PathItem::ExitChoice => {
                seq.serialize_element(&Some(BranchKind::Choice.exit_tag()))?;
            }
            PathItem::ExitCondition => {
                seq.serialize_element(&Some(BranchKind::Condition.exit_tag()))?;
            }
            PathItem::ExitBlock => {
                seq.serialize_element(&Some(BranchKind::Block.exit_tag()))?;
            }
        }
        seq.end()
    }
}

struct PathItemVisitor;

impl<'de> Visitor<'de> for PathItemVisitor {
    type Value = PathItem;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a path item tuple such as [null, 3] or [\"choice\", 0]")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PathItem, A::Error> {
        let tag: Option<String> = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let item = match tag.as_deref() {
            None => PathItem::Index(required(&mut seq, &self)?),
            Some("jump") => PathItem::JumpTo(required(&mut seq, &self)?),
            Some("choice") => PathItem::EnterChoice(required(&mut seq, &self)?),
            Some("condition") => PathItem::EnterCondition(required(&mut seq, &self)?),
            Some("block") => PathItem::EnterBlock(required(&mut seq, &self)?),
            Some("choice:exit") => PathItem::ExitChoice,
            Some("condition:exit") => PathItem::ExitCondition,
            Some("block:exit") => PathItem::ExitBlock,
            Some(other) => {
                return Err(de::Error::unknown_variant(
                    other,
                    &[
                        "jump",
                        "choice",
                        "condition",
                        "block",
                        "choice:exit",
                        "condition:exit",
                        "block:exit",
                    ],
                ))
            }
        };
        Ok(item)
    }
}

fn required<'de, T, A>(seq: &mut A, visitor: &PathItemVisitor) -> Result<T, A::Error>
where
    T: Deserialize<'de>,
    A: SeqAccess<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::invalid_length(1, visitor))
}

impl<'de> Deserialize<'de> for PathItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(PathItemVisitor)
    }
}

/// Ordered sequence of path items; the player's position in the story.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(transparent)]
pub struct StoryPath {
    items: Vec<PathItem>,
}

impl StoryPath {
    pub fn new(items: Vec<PathItem>) -> Self {
        Self { items }
    }

    /// Path positioned just before the first instruction of `scene`.
    pub fn jump(scene: impl Into<String>) -> Self {
        Self {
            items: vec![PathItem::JumpTo(scene.into()), PathItem::Index(-1)],
        }
    }

    pub fn items(&self) -> &[PathItem] {
        &self.items
    }

    pub fn push(&mut self, item: PathItem) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<PathItem> {
        self.items.pop()
    }

    pub fn last(&self) -> Option<&PathItem> {
        self.items.last()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut PathItem> {
        self.items.last_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Scene named by the most recent jump, if any.
    pub fn scene(&self) -> Option<&str> {
        self.items.iter().rev().find_map(|item| match item {
            PathItem::JumpTo(scene) => Some(scene.as_str()),
            _ => None,
        })
    }

    /// Number of branches entered and not yet exited.
    pub fn open_branches(&self) -> usize {
        let mut open = 0usize;
        for item in &self.items {
            if item.entered().is_some() {
                open += 1;
            } else if item.exited().is_some() {
                open = open.saturating_sub(1);
            } else if matches!(item, PathItem::JumpTo(_)) {
                open = 0;
            }
        }
        open
    }
}

impl From<Vec<PathItem>> for StoryPath {
    fn from(items: Vec<PathItem>) -> Self {
        Self::new(items)
    }
}

#[cfg(test)]
#[path = "../tests/path_tests.rs"]
mod tests;
