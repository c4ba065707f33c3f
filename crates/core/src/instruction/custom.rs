use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Host-defined action identified by a handler name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CustomAction {
    pub handler: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Identity used by `latest_only`; falls back to handler and args.
    #[serde(default)]
    pub id: Option<String>,
    /// Only the most recent call matters when replaying.
    #[serde(default)]
    pub latest_only: bool,
    #[serde(default)]
    pub skip_on_restore: bool,
    #[serde(default)]
    pub requires_user_action: bool,
}

impl CustomAction {
    /// True when `other` is a later call of the same action.
    pub fn same_call(&self, other: &CustomAction) -> bool {
        match (&self.id, &other.id) {
            (Some(id), Some(other_id)) => id == other_id,
            _ => self.handler == other.handler && self.args == other.args,
        }
    }
}
