//! Path-addressable interpreter for branching story scripts.
//!
//! A player's position is a [`StoryPath`]: a short list of decisions that
//! can be stored, restored elsewhere, stepped forward or back, and replayed
//! to rebuild the stage exactly as it was.

mod compact;
mod config;
mod context;
mod error;
mod history;
mod instruction;
mod path;
mod resource;
mod runner;
mod save;
mod scan;
mod script;
mod state;
mod storage;
mod trace;
mod version;

pub use compact::{compact, Compacted, DefaultRestorePolicy, KeepSets, RestorePolicy};
pub use config::{ConfigError, EngineConfig};
pub use context::{CancelToken, Context, DialogueLine, RestorePlan};
pub use error::{AuthoringError, PathError, StoryError, StoryResult};
pub use history::{reconstruct, History, HistoryEntry};
pub use instruction::{
    AssetRef, Choice, ChoiceBranch, Clear, CmpOp, Cond, Condition, CustomAction, Dialogue,
    Instruction, Selector, SelectorCase, SKIPPED_ON_RESTORE,
};
pub use path::{
    advance, enter_block, enter_choice, enter_condition, exit_current_branch, resolve, BranchKind,
    ExitOutcome, PathItem, Position, StoryPath,
};
pub use resource::ResourceLimiter;
pub use runner::{
    play, replay, resume, Completion, ExecScope, Executor, PlayOutcome, ReplayOutcome,
};
pub use save::{Save, SaveKind, SaveMeta, StateSnapshots};
pub use scan::{scan_forward, ScanLimits};
pub use script::{compute_script_id, script_json_schema, ScriptId, ScriptRaw, ScriptStore};
pub use state::{PlayerState, StateValue};
pub use storage::{
    MemoryStorage, SaveError, SaveRecord, SaveSlotEntry, SaveSlotMetadata, SaveSlotStore,
    SaveStorage, SaveStoreError, SlotStorage,
};
pub use trace::{
    trace_story, HeadlessExecutor, StageDigest, StateDigest, UiTrace, UiTraceStep, UiView,
};
pub use version::{SAVE_BINARY_MAGIC, SAVE_FORMAT_VERSION, SCRIPT_SCHEMA_VERSION, START_SCENE};
