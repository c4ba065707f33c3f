use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::path::BranchKind;

pub type StoryResult<T> = Result<T, StoryError>;

#[derive(Debug, Error, Diagnostic)]
pub enum StoryError {
    #[error("script authoring error: {0}")]
    #[diagnostic(code("story.authoring"), help("fix the script; saves are not at fault"))]
    Authoring(#[from] AuthoringError),
    #[error("path cannot be resolved: {0}")]
    #[diagnostic(
        code("story.unresolvable"),
        help("the save does not match this script; start a fresh path")
    )]
    Unresolvable(#[from] PathError),
    #[error("no instruction at the current position")]
    #[diagnostic(code("story.not_at_instruction"))]
    NotAtInstruction,
    #[error("choice branch {0} is not available")]
    #[diagnostic(code("story.invalid_choice"))]
    InvalidChoice(usize),
    #[error("resource limit exceeded: {0}")]
    #[diagnostic(code("story.resource_limit"))]
    ResourceLimit(String),
    #[error("schema incompatible: found {found}, expected {expected}")]
    #[diagnostic(code("story.schema"))]
    SchemaIncompatible { found: String, expected: String },
    #[error("configuration error: {0}")]
    #[diagnostic(code("story.config"))]
    Config(String),
    #[error("io error: {0}")]
    #[diagnostic(code("story.io"))]
    Io(#[from] std::io::Error),
    #[error("save storage error: {0}")]
    #[diagnostic(code("story.storage"))]
    Storage(#[from] crate::storage::SaveStoreError),
    #[error("serialization error: {message}")]
    #[diagnostic(code("story.serialization"))]
    Serialization {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
}

/// Problems in the script itself, detected while compiling a [`crate::ScriptRaw`].
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum AuthoringError {
    #[error("missing '{0}' scene")]
    #[diagnostic(code("story.authoring.missing_start"))]
    MissingStart(String),
    #[error("scene '{scene}' references unknown scene '{target}'")]
    #[diagnostic(code("story.authoring.unknown_scene"))]
    UnknownScene { scene: String, target: String },
    #[error("scene '{scene}' has a choice without branches")]
    #[diagnostic(code("story.authoring.empty_choice"))]
    EmptyChoice { scene: String },
    #[error("scene '{scene}' has an empty branch '{branch}'")]
    #[diagnostic(code("story.authoring.empty_branch"))]
    EmptyBranch { scene: String, branch: String },
    #[error("scene '{scene}' has a condition without variants")]
    #[diagnostic(code("story.authoring.empty_condition"))]
    EmptyCondition { scene: String },
    #[error("scene '{scene}' enters empty block scene '{target}'")]
    #[diagnostic(code("story.authoring.empty_block"))]
    EmptyBlock { scene: String, target: String },
    #[error("scene '{scene}' nests branches deeper than {limit}")]
    #[diagnostic(code("story.authoring.nesting"))]
    NestingTooDeep { scene: String, limit: usize },
}

/// A path that does not describe a position in the script.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum PathError {
    #[error("unknown scene '{scene}' at item {position}")]
    #[diagnostic(code("story.path.unknown_scene"))]
    UnknownScene { position: usize, scene: String },
    #[error("choice has no branch {branch} (item {position})")]
    #[diagnostic(code("story.path.unknown_branch"))]
    UnknownBranch { position: usize, branch: usize },
    #[error("condition has no variant '{key}' (item {position})")]
    #[diagnostic(code("story.path.unknown_variant"))]
    UnknownVariant { position: usize, key: String },
    #[error("item {position} enters a {expected:?} but the position holds something else")]
    #[diagnostic(code("story.path.not_a_branch"))]
    NotABranch { position: usize, expected: BranchKind },
    #[error("item {position} indexes something that is not an instruction list")]
    #[diagnostic(code("story.path.index_outside_list"))]
    IndexOutsideList { position: usize },
    #[error("item {position} exits a branch that was never entered")]
    #[diagnostic(code("story.path.unbalanced_exit"))]
    UnbalancedExit { position: usize },
    #[error("item {position} exits a {found:?} but the open branch is a {expected:?}")]
    #[diagnostic(code("story.path.mismatched_exit"))]
    MismatchedExit {
        position: usize,
        expected: BranchKind,
        found: BranchKind,
    },
}

pub(crate) fn json_error(input: &str, err: &serde_json::Error) -> StoryError {
    let (offset, length) = json_error_span(input, err);
    StoryError::Serialization {
        message: err.to_string(),
        src: input.to_string(),
        span: (offset, length).into(),
    }
}

fn json_error_span(input: &str, error: &serde_json::Error) -> (usize, usize) {
    let line = error.line();
    let column = error.column();
    if line == 0 || column == 0 {
        return (0, 1);
    }
    let mut current_line = 1usize;
    let mut offset = 0usize;
    for chunk in input.split_inclusive('\n') {
        if current_line == line {
            let column_index = column.saturating_sub(1);
            let byte_index = chunk
                .char_indices()
                .nth(column_index)
                .map(|(idx, _)| idx)
                .unwrap_or(chunk.len().saturating_sub(1));
            offset += byte_index;
            return (offset, 1);
        }
        offset += chunk.len();
        current_line += 1;
    }
    (input.len().saturating_sub(1), 1)
}
