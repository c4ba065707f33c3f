use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::branching::Cond;
use super::{flat_list, Instruction};
use crate::state::PlayerState;

/// Choice prompt and the branches offered to the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Choice {
    #[serde(default)]
    pub prompt: Option<String>,
    pub branches: Vec<ChoiceBranch>,
}

/// One selectable branch of a choice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceBranch {
    pub label: String,
    #[serde(deserialize_with = "flat_list")]
    #[schemars(with = "Vec<Instruction>")]
    pub actions: Vec<Instruction>,
    /// Branch can be picked only while this holds.
    #[serde(default)]
    pub active: Option<Cond>,
    /// Branch is listed only while this holds.
    #[serde(default)]
    pub visible: Option<Cond>,
    /// Host hook invoked when the branch is picked.
    #[serde(default)]
    pub on_select: Option<String>,
    #[serde(default)]
    pub illustration: Option<String>,
}

impl ChoiceBranch {
    pub fn is_active(&self, state: &PlayerState) -> bool {
        self.active.as_ref().map_or(true, |cond| cond.evaluate(state))
    }

    pub fn is_visible(&self, state: &PlayerState) -> bool {
        self.visible.as_ref().map_or(true, |cond| cond.evaluate(state))
    }
}

impl Choice {
    /// Indices of the branches the player can currently see.
    pub fn visible_branches(&self, state: &PlayerState) -> Vec<usize> {
        self.branches
            .iter()
            .enumerate()
            .filter(|(_, branch)| branch.is_visible(state))
            .map(|(index, _)| index)
            .collect()
    }
}
