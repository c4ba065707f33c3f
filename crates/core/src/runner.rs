//! In-order execution of instructions against a rendering backend.
//!
//! The backend implements [`Executor`]. Each instruction may complete
//! immediately or hand back a future; the loops below await it before
//! dispatching the next instruction, so effects never overlap.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::debug;

use crate::compact::KeepSets;
use crate::context::{Context, RestorePlan};
use crate::error::StoryResult;
use crate::instruction::Instruction;
use crate::path::{resolve, ExitOutcome, Position};
use crate::state::PlayerState;

/// How an executed instruction finishes.
pub enum Completion {
    Done,
    /// Resolves once the instruction is finished (animation ended, player
    /// clicked through the dialogue, ...).
    Pending(BoxFuture<'static, ()>),
}

impl Completion {
    pub fn pending(future: impl Future<Output = ()> + Send + 'static) -> Self {
        Completion::Pending(Box::pin(future))
    }

    pub async fn finish(self) {
        if let Completion::Pending(future) = self {
            future.await;
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Done => f.write_str("Done"),
            Completion::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// What an executor may see and change while running one instruction.
pub struct ExecScope<'a> {
    pub state: &'a mut PlayerState,
    /// Name of the context the instruction belongs to.
    pub context: &'a str,
    /// Set while replaying a restore plan. State was restored with the save,
    /// so state-changing instructions must not be applied again.
    pub restoring: bool,
    pub preview: bool,
}

/// Rendering backend.
pub trait Executor {
    fn execute(&mut self, instruction: &Instruction, scope: &mut ExecScope<'_>) -> Completion;

    /// Removes everything from the stage except what `keep` names.
    fn clear(&mut self, keep: &KeepSets) {
        let _ = keep;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOutcome {
    Completed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayOutcome {
    /// A choice is on screen; call [`Context::choose`] and play again.
    AwaitingChoice,
    Ended,
    StepLimit,
    Cancelled,
}

/// Executes a restore plan in order.
///
/// Control instructions in the plan are skipped; they carry no effect of
/// their own.
pub async fn replay<E: Executor + ?Sized>(
    context: &mut Context,
    plan: &RestorePlan,
    executor: &mut E,
) -> ReplayOutcome {
    let token = context.cancel_token();
    if token.is_cancelled() {
        return ReplayOutcome::Cancelled;
    }
    executor.clear(&plan.keep);
    context.set_restoring(true);
    let mut outcome = ReplayOutcome::Completed;
    for instruction in &plan.queue {
        if token.is_cancelled() {
            outcome = ReplayOutcome::Cancelled;
            break;
        }
        if instruction.is_control() {
            continue;
        }
        let completion = executor.execute(instruction, &mut context.scope());
        completion.finish().await;
    }
    context.set_restoring(false);
    debug!(context = %context.name(), ?outcome, "replay finished");
    outcome
}

/// Runs the story from the current instruction until it needs a choice,
/// ends, or `max_steps` instructions have been handled.
///
/// The instruction the context points at is executed first.
pub async fn play<E: Executor + ?Sized>(
    context: &mut Context,
    executor: &mut E,
    max_steps: usize,
) -> StoryResult<PlayOutcome> {
    let script = Arc::clone(context.script());
    let token = context.cancel_token();

    for _ in 0..max_steps {
        if token.is_cancelled() {
            return Ok(PlayOutcome::Cancelled);
        }
        let instruction = match resolve(&script, context.path())? {
            Position::Instruction(instruction) => instruction,
            Position::EndOfList if context.is_at_scene_entry() => {
                context.advance();
                continue;
            }
            Position::EndOfList => return Ok(PlayOutcome::Ended),
        };

        match instruction {
            Instruction::Condition(_) => {
                context.enter_condition()?;
            }
            Instruction::Block { .. } => context.enter_block()?,
            Instruction::Jump { scene } => context.jump(scene)?,
            Instruction::Exit => {
                if context.exit_branch() == ExitOutcome::Impossible {
                    context.advance();
                }
            }
            Instruction::End => return Ok(PlayOutcome::Ended),
            Instruction::Choice(_) => {
                let completion = executor.execute(instruction, &mut context.scope());
                completion.finish().await;
                return Ok(PlayOutcome::AwaitingChoice);
            }
            _ => {
                if matches!(instruction, Instruction::Dialogue(_)) {
                    context.record_dialogue_snapshot();
                }
                let completion = executor.execute(instruction, &mut context.scope());
                completion.finish().await;
                context.advance();
            }
        }
    }
    Ok(PlayOutcome::StepLimit)
}

/// Replays `plan`, then continues live play after the restored position.
pub async fn resume<E: Executor + ?Sized>(
    context: &mut Context,
    plan: &RestorePlan,
    executor: &mut E,
    max_steps: usize,
) -> StoryResult<PlayOutcome> {
    if replay(context, plan, executor).await == ReplayOutcome::Cancelled {
        return Ok(PlayOutcome::Cancelled);
    }
    let current = context.current_instruction();
    if matches!(current, Some(Instruction::Choice(_))) {
        return Ok(PlayOutcome::AwaitingChoice);
    }
    // The restored instruction already ran as the tail of the plan.
    if current.is_some_and(|instruction| !instruction.is_control()) {
        context.advance();
    }
    play(context, executor, max_steps).await
}
