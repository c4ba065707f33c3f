use serde::{Deserialize, Serialize};

/// Budgets enforced while loading and compiling scripts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimiter {
    pub max_scenes: usize,
    pub max_instructions: usize,
    pub max_text_length: usize,
    pub max_nesting_depth: usize,
    pub max_script_bytes: usize,
}

impl Default for ResourceLimiter {
    fn default() -> Self {
        Self {
            max_scenes: 4_096,
            max_instructions: 200_000,
            max_text_length: 4_096,
            max_nesting_depth: 32,
            max_script_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Counts the string payload carried by a value, for budget checks.
pub trait StringBudget {
    fn string_bytes(&self) -> usize;
}

impl StringBudget for String {
    fn string_bytes(&self) -> usize {
        self.len()
    }
}

impl StringBudget for Option<String> {
    fn string_bytes(&self) -> usize {
        self.as_ref().map_or(0, String::len)
    }
}

impl StringBudget for Vec<String> {
    fn string_bytes(&self) -> usize {
        self.iter().map(String::len).sum()
    }
}
