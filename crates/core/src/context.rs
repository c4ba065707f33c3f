//! Per-instance story state: one path, one player state, one undo stack.
//!
//! Several contexts can share the same [`ScriptStore`]; nothing mutable is
//! shared between them.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::compact::{compact, DefaultRestorePolicy, KeepSets, RestorePolicy};
use crate::config::EngineConfig;
use crate::error::{AuthoringError, StoryError, StoryResult};
use crate::history::reconstruct;
use crate::instruction::{AssetRef, Dialogue, Instruction};
use crate::path::{self, resolve, ExitOutcome, PathItem, Position, StoryPath};
use crate::runner::ExecScope;
use crate::save::{Save, SaveKind, StateSnapshots};
use crate::scan::scan_forward;
use crate::script::ScriptStore;
use crate::state::PlayerState;
use crate::storage::SaveStorage;
use crate::version::START_SCENE;

/// Cooperative cancellation flag shared with running loops.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag so the context can run again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owned replay queue produced by a restore.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RestorePlan {
    pub queue: Vec<Instruction>,
    pub keep: KeepSets,
}

impl RestorePlan {
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// A dialogue already shown, with the player state at the time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DialogueLine {
    pub dialogue: Dialogue,
    pub state: Option<PlayerState>,
}

pub struct Context {
    name: String,
    script: Arc<ScriptStore>,
    config: EngineConfig,
    path: StoryPath,
    state: PlayerState,
    snapshots: StateSnapshots,
    undo: VecDeque<Save>,
    keep: KeepSets,
    cancel: CancelToken,
    policy: Box<dyn RestorePolicy + Send + Sync>,
    preview: bool,
    restoring: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("undo", &self.undo.len())
            .field("preview", &self.preview)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Creates a context positioned before the first instruction of `start`.
    pub fn new(name: impl Into<String>, script: Arc<ScriptStore>, config: EngineConfig) -> Self {
        Self {
            name: name.into(),
            script,
            config,
            path: StoryPath::jump(START_SCENE),
            state: PlayerState::new(),
            snapshots: Vec::new(),
            undo: VecDeque::new(),
            keep: KeepSets::default(),
            cancel: CancelToken::new(),
            policy: Box::new(DefaultRestorePolicy),
            preview: false,
            restoring: false,
        }
    }

    /// Context for rendering a save thumbnail or similar; records no snapshots.
    pub fn preview(name: impl Into<String>, script: Arc<ScriptStore>, config: EngineConfig) -> Self {
        Self {
            preview: true,
            ..Self::new(name, script, config)
        }
    }

    pub fn with_restore_policy(mut self, policy: impl RestorePolicy + Send + Sync + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script(&self) -> &Arc<ScriptStore> {
        &self.script
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn path(&self) -> &StoryPath {
        &self.path
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn snapshots(&self) -> &StateSnapshots {
        &self.snapshots
    }

    pub fn keep_sets(&self) -> &KeepSets {
        &self.keep
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub(crate) fn set_restoring(&mut self, restoring: bool) {
        self.restoring = restoring;
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn position(&self) -> StoryResult<Position<'_>> {
        Ok(resolve(&self.script, &self.path)?)
    }

    /// The instruction the path points at. An unresolvable path is logged
    /// and reads as no instruction.
    pub fn current_instruction(&self) -> Option<&Instruction> {
        match resolve(&self.script, &self.path) {
            Ok(position) => position.instruction(),
            Err(err) => {
                warn!(context = %self.name, %err, "current path does not resolve");
                None
            }
        }
    }

    /// True while the path sits before the first instruction of a scene.
    pub fn is_at_scene_entry(&self) -> bool {
        self.path.last() == Some(&PathItem::Index(-1))
    }

    /// Steps to the next instruction, leaving finished branches on the way.
    ///
    /// Leaving a blocking instruction records an undo point first.
    pub fn advance(&mut self) {
        if self.current_instruction().is_some_and(Instruction::is_blocking) {
            self.push_undo();
        }
        path::advance(&mut self.path);
        self.settle();
    }

    /// Enters branch `index` of the choice at the current position.
    pub fn choose(&mut self, index: usize) -> StoryResult<()> {
        let Some(Instruction::Choice(choice)) = self.current_instruction() else {
            return Err(StoryError::NotAtInstruction);
        };
        let available = choice
            .branches
            .get(index)
            .is_some_and(|branch| branch.is_visible(&self.state) && branch.is_active(&self.state));
        if !available {
            return Err(StoryError::InvalidChoice(index));
        }
        debug!(context = %self.name, index, "choice taken");
        self.push_undo();
        path::enter_choice(&mut self.path, index);
        self.settle();
        Ok(())
    }

    /// Enters the variant the condition at the current position selects.
    ///
    /// Returns the entered key. A key without a variant skips the condition.
    pub fn enter_condition(&mut self) -> StoryResult<Option<String>> {
        let Some(Instruction::Condition(condition)) = self.current_instruction() else {
            return Err(StoryError::NotAtInstruction);
        };
        let key = condition.selector.select(&self.state);
        if !condition.variants.contains_key(&key) {
            debug!(context = %self.name, %key, "no variant for condition key, skipping");
            self.advance();
            return Ok(None);
        }
        path::enter_condition(&mut self.path, key.clone());
        self.settle();
        Ok(Some(key))
    }

    /// Enters the sub-scene named by the block at the current position.
    pub fn enter_block(&mut self) -> StoryResult<()> {
        let Some(Instruction::Block { scene }) = self.current_instruction() else {
            return Err(StoryError::NotAtInstruction);
        };
        let scene = scene.clone();
        path::enter_block(&mut self.path, scene);
        self.settle();
        Ok(())
    }

    /// Replaces the path with the entry of `scene`.
    pub fn jump(&mut self, scene: &str) -> StoryResult<()> {
        if !self.script.contains_scene(scene) {
            return Err(AuthoringError::UnknownScene {
                scene: self.path.scene().unwrap_or_default().to_string(),
                target: scene.to_string(),
            }
            .into());
        }
        debug!(context = %self.name, scene, "jump");
        self.path = StoryPath::jump(scene);
        Ok(())
    }

    pub fn exit_branch(&mut self) -> ExitOutcome {
        let outcome = path::exit_current_branch(&self.script, &mut self.path);
        if outcome == ExitOutcome::Exited {
            self.settle();
        }
        outcome
    }

    /// Returns to the last undo point and plans the replay that redraws it.
    ///
    /// Undo points are taken only when [`Context::advance`] leaves a blocking
    /// instruction and when [`Context::choose`] enters a branch. Undoing after
    /// advancing past a non-blocking instruction goes back further, to the
    /// last such point.
    pub fn undo(&mut self) -> Option<RestorePlan> {
        let save = self.undo.pop_back()?;
        match self.apply_save(save) {
            Ok(plan) => Some(plan),
            Err(err) => {
                warn!(context = %self.name, %err, "undo point no longer resolves");
                None
            }
        }
    }

    pub fn save(&self, kind: SaveKind) -> Save {
        Save::new(
            self.path.clone(),
            self.state.clone(),
            kind,
            self.snapshots.clone(),
        )
    }

    /// Writes a save of the current position to `storage`.
    pub fn store_to(&self, storage: &mut dyn SaveStorage, kind: SaveKind) -> StoryResult<()> {
        storage.store(&self.save(kind))?;
        Ok(())
    }

    /// Adopts `save` and plans the replay that rebuilds its stage.
    ///
    /// The context is left unchanged when the save does not resolve.
    #[instrument(skip(self, save), fields(context = %self.name))]
    pub fn restore(&mut self, save: Save) -> StoryResult<RestorePlan> {
        let plan = self.apply_save(save)?;
        self.undo.clear();
        info!(queued = plan.queue.len(), "restored save");
        Ok(plan)
    }

    /// Restores `save` when there is one that resolves; starts fresh otherwise.
    pub fn restore_or_start(&mut self, save: Option<Save>) -> RestorePlan {
        if let Some(save) = save {
            match self.restore(save) {
                Ok(plan) => return plan,
                Err(err) => info!(context = %self.name, %err, "save unusable, starting fresh"),
            }
        }
        self.reset();
        RestorePlan::default()
    }

    /// Loads the save held by `storage`, falling back to a fresh start.
    pub fn restore_from(&mut self, storage: &dyn SaveStorage) -> RestorePlan {
        let save = storage.load().unwrap_or_else(|err| {
            warn!(context = %self.name, %err, "could not load save");
            None
        });
        self.restore_or_start(save)
    }

    /// Reconstructs and compacts `path` without touching the context.
    pub fn reconstruct_and_compact(&self, path: &StoryPath) -> StoryResult<RestorePlan> {
        let history = reconstruct(&self.script, path, true)?;
        let compacted = compact(&history, self.policy.as_ref());
        Ok(RestorePlan {
            queue: compacted.queue.into_iter().cloned().collect(),
            keep: compacted.keep,
        })
    }

    /// Instructions whose resources will likely be needed soon.
    pub fn prefetch_candidates(&self) -> Vec<&Instruction> {
        // The scanner enters choices, blocks and jumps on its own.
        let steers = self
            .current_instruction()
            .is_some_and(|current| matches!(current, Instruction::Choice(_)) || current.is_control());
        let mut from = self.path.clone();
        if !steers {
            path::advance(&mut from);
        }
        scan_forward(&self.script, &from, self.config.scan)
    }

    /// Distinct assets referenced by [`Context::prefetch_candidates`].
    pub fn prefetch_assets(&self) -> Vec<AssetRef> {
        let mut assets: Vec<AssetRef> = Vec::new();
        for asset in self
            .prefetch_candidates()
            .into_iter()
            .flat_map(Instruction::assets)
        {
            if !assets.contains(&asset) {
                assets.push(asset);
            }
        }
        assets
    }

    /// Dialogues on the current path, newest last, each paired with the
    /// snapshot recorded when it was shown.
    pub fn dialogue_overview(&self) -> Vec<DialogueLine> {
        let history = match reconstruct(&self.script, &self.path, false) {
            Ok(history) => history,
            Err(err) => {
                warn!(context = %self.name, %err, "cannot build dialogue overview");
                return Vec::new();
            }
        };
        let dialogues: Vec<&Dialogue> = history
            .instructions()
            .filter_map(|instruction| match instruction {
                Instruction::Dialogue(dialogue) => Some(dialogue),
                _ => None,
            })
            .collect();

        // Align from the newest entry: a jump drops older dialogues from the
        // path but not their snapshots.
        let surplus = self.snapshots.len().saturating_sub(dialogues.len());
        let missing = dialogues.len().saturating_sub(self.snapshots.len());
        dialogues
            .into_iter()
            .enumerate()
            .map(|(index, dialogue)| DialogueLine {
                dialogue: dialogue.clone(),
                state: index
                    .checked_sub(missing)
                    .and_then(|slot| self.snapshots.get(slot + surplus))
                    .cloned(),
            })
            .collect()
    }

    /// Remembers the player state for the dialogue being shown.
    pub fn record_dialogue_snapshot(&mut self) {
        if !self.preview {
            self.snapshots.push(self.state.clone());
        }
    }

    pub(crate) fn scope(&mut self) -> ExecScope<'_> {
        ExecScope {
            state: &mut self.state,
            context: &self.name,
            restoring: self.restoring,
            preview: self.preview,
        }
    }

    fn apply_save(&mut self, save: Save) -> StoryResult<RestorePlan> {
        let plan = self.reconstruct_and_compact(save.path())?;
        let Save(path, state, _, snapshots) = save;
        self.path = path;
        self.state = state;
        self.snapshots = snapshots;
        self.keep = plan.keep.clone();
        Ok(plan)
    }

    fn reset(&mut self) {
        self.path = StoryPath::jump(START_SCENE);
        self.state = PlayerState::new();
        self.snapshots.clear();
        self.undo.clear();
        self.keep = KeepSets::default();
    }

    fn push_undo(&mut self) {
        if self.config.undo_limit == 0 {
            return;
        }
        if self.undo.len() >= self.config.undo_limit {
            self.undo.pop_front();
        }
        let save = self.save(SaveKind::Auto);
        self.undo.push_back(save);
    }

    /// Leaves exhausted branches until the path rests on an instruction or
    /// nothing is left to leave.
    fn settle(&mut self) {
        while matches!(resolve(&self.script, &self.path), Ok(Position::EndOfList)) {
            if path::exit_current_branch(&self.script, &mut self.path) == ExitOutcome::Impossible {
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;
