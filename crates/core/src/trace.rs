//! Headless execution and observable traces for deterministic testing.
//!
//! These types describe what a player would see, leaving out paths and
//! other internals, so traces stay stable across refactors.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::compact::KeepSets;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::StoryResult;
use crate::instruction::Instruction;
use crate::runner::{play, Completion, ExecScope, Executor, PlayOutcome};
use crate::script::ScriptStore;
use crate::state::{PlayerState, StateValue};

/// A single step in the execution trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiTraceStep {
    /// Step number (0-indexed).
    pub step: u32,
    pub view: UiView,
    /// Player state after the instruction ran.
    pub state: StateDigest,
}

/// What the player sees at a given step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum UiView {
    Dialogue { speaker: String, text: String },
    Text { text: String },
    Input { question: String },
    Choice { prompt: String, options: Vec<String> },
    Stage { description: String },
    System { message: String },
}

impl UiView {
    pub fn from_instruction(instruction: &Instruction, state: &PlayerState) -> Self {
        match instruction {
            Instruction::Dialogue(dialogue) => UiView::Dialogue {
                speaker: dialogue.character.clone().unwrap_or_default(),
                text: dialogue.text.clone(),
            },
            Instruction::Text { text } => UiView::Text { text: text.clone() },
            Instruction::Input { question, .. } => UiView::Input {
                question: question.clone(),
            },
            Instruction::Choice(choice) => UiView::Choice {
                prompt: choice.prompt.clone().unwrap_or_default(),
                options: choice
                    .visible_branches(state)
                    .into_iter()
                    .map(|index| choice.branches[index].label.clone())
                    .collect(),
            },
            Instruction::ShowBackground { background } => UiView::Stage {
                description: format!("background {background}"),
            },
            Instruction::ShowCharacter {
                character, emotion, ..
            } => UiView::Stage {
                description: match emotion {
                    Some(emotion) => format!("show {character} ({emotion})"),
                    None => format!("show {character}"),
                },
            },
            Instruction::HideCharacter { character, .. } => UiView::Stage {
                description: format!("hide {character}"),
            },
            Instruction::PlayMusic { source } => UiView::Stage {
                description: format!("music {source}"),
            },
            Instruction::SetFlag { key, value } => UiView::System {
                message: format!("set_flag {key} = {value}"),
            },
            Instruction::SetVar { key, value } => UiView::System {
                message: format!("set_var {key} = {value}"),
            },
            Instruction::Custom(action) => UiView::System {
                message: format!("custom {}({})", action.handler, action.args.join(", ")),
            },
            other => UiView::System {
                message: other.name().to_string(),
            },
        }
    }
}

/// Player state in sorted, comparable form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDigest {
    pub flags: BTreeMap<String, bool>,
    pub vars: BTreeMap<String, i64>,
    pub texts: BTreeMap<String, String>,
}

impl StateDigest {
    pub fn from_state(state: &PlayerState) -> Self {
        let mut digest = Self::default();
        for (key, value) in state.iter() {
            match value {
                StateValue::Bool(flag) => {
                    digest.flags.insert(key.to_string(), *flag);
                }
                StateValue::Int(var) => {
                    digest.vars.insert(key.to_string(), *var);
                }
                StateValue::Text(text) => {
                    digest.texts.insert(key.to_string(), text.clone());
                }
            }
        }
        digest
    }
}

/// What is currently on stage, as far as restores are concerned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDigest {
    pub background: Option<String>,
    pub characters: BTreeSet<String>,
    pub music: BTreeSet<String>,
    pub sounds: BTreeSet<String>,
}

impl StageDigest {
    pub fn apply(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::ShowBackground { background } => {
                self.background = Some(background.clone());
            }
            Instruction::ShowCharacter { character, .. } => {
                self.characters.insert(character.clone());
            }
            Instruction::HideCharacter { character, .. } => {
                self.characters.remove(character);
            }
            Instruction::PlayMusic { source } => {
                self.music.insert(source.clone());
            }
            Instruction::PauseMusic { source } | Instruction::StopMusic { source } => {
                self.music.remove(source);
            }
            Instruction::PlaySound { source, .. } => {
                self.sounds.insert(source.clone());
            }
            Instruction::PauseSound { source } | Instruction::StopSound { source } => {
                self.sounds.remove(source);
            }
            Instruction::Clear(clear) => {
                self.characters.retain(|character| clear.keeps_character(character));
                self.music.retain(|source| clear.keeps_audio(source));
                self.sounds.retain(|source| clear.keeps_audio(source));
            }
            _ => {}
        }
    }

    pub fn retain(&mut self, keep: &KeepSets) {
        self.characters.retain(|character| keep.characters.contains(character));
        self.music.retain(|source| keep.music.contains(source));
        self.sounds.retain(|source| keep.sounds.contains(source));
    }
}

/// A complete execution trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiTrace {
    pub steps: Vec<UiTraceStep>,
}

impl UiTrace {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn push(&mut self, view: UiView, state: StateDigest) {
        let step = u32::try_from(self.steps.len()).unwrap_or(u32::MAX);
        self.steps.push(UiTraceStep { step, view, state });
    }

    pub fn views(&self) -> impl DoubleEndedIterator<Item = &UiView> {
        self.steps.iter().map(|step| &step.view)
    }
}

/// Executor without a screen: applies state changes, tracks the stage and
/// records what would have been shown. Every instruction completes at once.
#[derive(Clone, Debug, Default)]
pub struct HeadlessExecutor {
    pub trace: UiTrace,
    pub stage: StageDigest,
}

impl HeadlessExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for HeadlessExecutor {
    fn execute(&mut self, instruction: &Instruction, scope: &mut ExecScope<'_>) -> Completion {
        if !scope.restoring {
            scope.state.apply(instruction);
        }
        self.stage.apply(instruction);
        trace!(
            context = scope.context,
            instruction = instruction.name(),
            restoring = scope.restoring,
            "executed"
        );
        self.trace.push(
            UiView::from_instruction(instruction, scope.state),
            StateDigest::from_state(scope.state),
        );
        Completion::Done
    }

    fn clear(&mut self, keep: &KeepSets) {
        self.stage.retain(keep);
    }
}

/// Plays a script headlessly from the start, answering choices from
/// `choices` in order (branch 0 once they run out).
pub fn trace_story(
    script: Arc<ScriptStore>,
    config: EngineConfig,
    choices: &[usize],
    max_steps: usize,
) -> StoryResult<(UiTrace, PlayOutcome)> {
    let mut context = Context::new("trace", script, config);
    let mut executor = HeadlessExecutor::new();
    let mut answers = choices.iter().copied();
    let mut remaining = max_steps;

    loop {
        let before = executor.trace.steps.len();
        let outcome = futures::executor::block_on(play(&mut context, &mut executor, remaining))?;
        remaining = remaining.saturating_sub(executor.trace.steps.len() - before);
        if outcome != PlayOutcome::AwaitingChoice || remaining == 0 {
            return Ok((executor.trace, outcome));
        }
        context.choose(answers.next().unwrap_or(0))?;
    }
}

#[cfg(test)]
#[path = "tests/trace_tests.rs"]
mod tests;
