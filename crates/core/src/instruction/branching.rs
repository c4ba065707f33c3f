use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{flat_map, Instruction};
use crate::state::PlayerState;

/// Predicate over the player state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cond {
    Flag { key: String, is_set: bool },
    VarCmp { key: String, op: CmpOp, value: i64 },
    All { conds: Vec<Cond> },
    Any { conds: Vec<Cond> },
    Not { cond: Box<Cond> },
}

/// Comparison operators for variable conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

impl Cond {
    /// Evaluates the predicate. Missing keys read as `false` / `0`.
    pub fn evaluate(&self, state: &PlayerState) -> bool {
        match self {
            Cond::Flag { key, is_set } => state.get_flag(key) == *is_set,
            Cond::VarCmp { key, op, value } => op.apply(state.get_var(key), *value),
            Cond::All { conds } => conds.iter().all(|cond| cond.evaluate(state)),
            Cond::Any { conds } => conds.iter().any(|cond| cond.evaluate(state)),
            Cond::Not { cond } => !cond.evaluate(state),
        }
    }
}

/// Chooses which variant of a condition runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// Selects `"true"` or `"false"`.
    Flag { key: String },
    /// Selects the decimal value of an integer variable.
    Var { key: String },
    /// First matching case wins.
    Cases {
        cases: Vec<SelectorCase>,
        default: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectorCase {
    pub when: Cond,
    pub key: String,
}

impl Selector {
    pub fn select(&self, state: &PlayerState) -> String {
        match self {
            Selector::Flag { key } => state.get_flag(key).to_string(),
            Selector::Var { key } => state.get_var(key).to_string(),
            Selector::Cases { cases, default } => cases
                .iter()
                .find(|case| case.when.evaluate(state))
                .map_or_else(|| default.clone(), |case| case.key.clone()),
        }
    }
}

/// Conditional branch resolved against the player state at runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    pub selector: Selector,
    #[serde(deserialize_with = "flat_map")]
    #[schemars(with = "BTreeMap<String, Vec<Instruction>>")]
    pub variants: BTreeMap<String, Vec<Instruction>>,
}
