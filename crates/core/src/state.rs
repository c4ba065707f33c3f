//! Player state bag carried by saves.
//!
//! The engine never writes to it on its own; executors apply the
//! state-changing instructions they run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::instruction::Instruction;

/// A single stored value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// User-defined key/value state, snapshotted into saves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerState {
    values: BTreeMap<String, StateValue>,
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: StateValue) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.values.remove(key)
    }

    /// Reads a flag; anything that is not a stored `true` reads as unset.
    pub fn get_flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(StateValue::Bool(true)))
    }

    pub fn set_flag(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, StateValue::Bool(value));
    }

    /// Reads an integer variable, defaulting to zero.
    pub fn get_var(&self, key: &str) -> i64 {
        match self.values.get(key) {
            Some(StateValue::Int(value)) => *value,
            _ => 0,
        }
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, StateValue::Int(value));
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(StateValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Applies a state-changing instruction. Returns whether it was one.
    pub fn apply(&mut self, instruction: &Instruction) -> bool {
        match instruction {
            Instruction::SetFlag { key, value } => {
                self.set_flag(key.clone(), *value);
                true
            }
            Instruction::SetVar { key, value } => {
                self.set_var(key.clone(), *value);
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
