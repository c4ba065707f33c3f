//! Speculative look-ahead used to prefetch resources.
//!
//! The scanner follows every branch of the choices and conditions it meets,
//! since it cannot know which one the player will take.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::instruction::Instruction;
use crate::path::{
    advance, enter_block, enter_choice, enter_condition, exit_current_branch, resolve, ExitOutcome,
    Position, StoryPath,
};
use crate::script::ScriptStore;

/// Budgets applied to every scanned branch on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLimits {
    /// Instructions visited per branch before it is abandoned.
    pub max_steps: usize,
    /// Nested choices and conditions followed below the starting point.
    pub max_depth: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_steps: 512,
            max_depth: 16,
        }
    }
}

/// Lists the instructions reachable from `path` before the player is next
/// asked for input, across all branches.
///
/// The instruction `path` points at is scanned too. Results are unique by
/// identity and keep discovery order.
pub fn scan_forward<'s>(
    script: &'s ScriptStore,
    path: &StoryPath,
    limits: ScanLimits,
) -> Vec<&'s Instruction> {
    let mut scanner = Scanner {
        script,
        limits,
        found: Vec::new(),
    };
    scanner.branch(path.clone(), 0);
    scanner.found
}

struct Scanner<'s> {
    script: &'s ScriptStore,
    limits: ScanLimits,
    found: Vec<&'s Instruction>,
}

impl<'s> Scanner<'s> {
    fn branch(&mut self, mut path: StoryPath, depth: usize) {
        if depth > self.limits.max_depth {
            debug!(depth, "scan branch abandoned: depth budget");
            return;
        }
        for _ in 0..self.limits.max_steps {
            let instruction = match resolve(self.script, &path) {
                Ok(Position::Instruction(instruction)) => instruction,
                Ok(Position::EndOfList) => {
                    if exit_current_branch(self.script, &mut path) == ExitOutcome::Impossible {
                        return;
                    }
                    continue;
                }
                Err(err) => {
                    debug!(%err, "scan branch abandoned: unresolvable path");
                    return;
                }
            };

            match instruction {
                Instruction::Choice(choice) => {
                    self.collect(instruction);
                    for branch in 0..choice.branches.len() {
                        let mut next = path.clone();
                        enter_choice(&mut next, branch);
                        self.branch(next, depth + 1);
                    }
                    return;
                }
                Instruction::Condition(condition) => {
                    for key in condition.variants.keys() {
                        let mut next = path.clone();
                        enter_condition(&mut next, key.clone());
                        self.branch(next, depth + 1);
                    }
                    return;
                }
                Instruction::End => return,
                Instruction::Jump { scene } => {
                    path = StoryPath::jump(scene.clone());
                    advance(&mut path);
                }
                Instruction::Block { scene } => enter_block(&mut path, scene.clone()),
                Instruction::Exit => {
                    if exit_current_branch(self.script, &mut path) == ExitOutcome::Impossible {
                        return;
                    }
                }
                _ if instruction.is_blocking() => {
                    self.collect(instruction);
                    return;
                }
                _ => {
                    self.collect(instruction);
                    advance(&mut path);
                }
            }
        }
        debug!(steps = self.limits.max_steps, "scan branch abandoned: step budget");
    }

    fn collect(&mut self, instruction: &'s Instruction) {
        if !self
            .found
            .iter()
            .any(|seen| std::ptr::eq(*seen, instruction))
        {
            self.found.push(instruction);
        }
    }
}

#[cfg(test)]
#[path = "tests/scan_tests.rs"]
mod tests;
