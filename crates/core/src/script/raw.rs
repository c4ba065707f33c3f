use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{json_error, AuthoringError, StoryError, StoryResult};
use crate::instruction::{flat_map, Instruction};
use crate::resource::{ResourceLimiter, StringBudget};
use crate::version::{SCRIPT_SCHEMA_VERSION, START_SCENE};

use super::store::ScriptStore;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
struct ScriptEnvelope {
    #[serde(default)]
    script_schema_version: Option<String>,
    #[serde(deserialize_with = "flat_map")]
    #[schemars(with = "BTreeMap<String, Vec<Instruction>>")]
    scenes: BTreeMap<String, Vec<Instruction>>,
}

/// JSON-facing script: scene names mapped to (already flattened) instruction lists.
///
/// Nothing is validated until [`ScriptRaw::compile`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptRaw {
    pub scenes: BTreeMap<String, Vec<Instruction>>,
}

impl ScriptRaw {
    pub fn new(scenes: BTreeMap<String, Vec<Instruction>>) -> Self {
        Self { scenes }
    }

    /// Parses a JSON script.
    pub fn from_json(input: &str) -> StoryResult<Self> {
        Self::from_json_with_limits(input, ResourceLimiter::default())
    }

    /// Parses a JSON script, rejecting oversized input before deserializing it.
    pub fn from_json_with_limits(input: &str, limits: ResourceLimiter) -> StoryResult<Self> {
        if input.len() > limits.max_script_bytes {
            return Err(StoryError::ResourceLimit(format!(
                "script is {} bytes, limit is {}",
                input.len(),
                limits.max_script_bytes
            )));
        }
        let envelope: ScriptEnvelope =
            serde_json::from_str(input).map_err(|err| json_error(input, &err))?;
        if let Some(version) = envelope.script_schema_version.as_deref() {
            if major(version) != major(SCRIPT_SCHEMA_VERSION) {
                return Err(StoryError::SchemaIncompatible {
                    found: version.to_string(),
                    expected: SCRIPT_SCHEMA_VERSION.to_string(),
                });
            }
        }
        Ok(Self {
            scenes: envelope.scenes,
        })
    }

    /// Serializes the script with the current schema version.
    pub fn to_json(&self) -> StoryResult<String> {
        let envelope = ScriptEnvelope {
            script_schema_version: Some(SCRIPT_SCHEMA_VERSION.to_string()),
            scenes: self.scenes.clone(),
        };
        serde_json::to_string_pretty(&envelope).map_err(|err| StoryError::Serialization {
            message: err.to_string(),
            src: String::new(),
            span: (0, 0).into(),
        })
    }

    /// Reads and parses a single script file.
    pub fn load_file(path: &Path, limits: ResourceLimiter) -> StoryResult<Self> {
        let input = fs::read_to_string(path)?;
        Self::from_json_with_limits(&input, limits)
    }

    /// Loads every `*.json` file under `root` (sorted by path) and merges them.
    pub fn load_dir(root: &Path, limits: ResourceLimiter) -> StoryResult<Self> {
        let mut files: Vec<_> = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        files.sort();

        let mut script = Self::default();
        for file in files {
            debug!(file = %file.display(), "loading script part");
            script.merge(Self::load_file(&file, limits)?);
        }
        Ok(script)
    }

    /// Merges another script into this one. Later scenes replace earlier ones.
    pub fn merge(&mut self, other: ScriptRaw) {
        for (name, actions) in other.scenes {
            if self.scenes.insert(name.clone(), actions).is_some() {
                warn!(scene = %name, "scene redefined by a later script part");
            }
        }
    }

    /// Validates the script and freezes it into a [`ScriptStore`].
    pub fn compile(&self, limits: ResourceLimiter) -> StoryResult<ScriptStore> {
        if self.scenes.len() > limits.max_scenes {
            return Err(StoryError::ResourceLimit(format!(
                "{} scenes, limit is {}",
                self.scenes.len(),
                limits.max_scenes
            )));
        }
        if !self.scenes.contains_key(START_SCENE) {
            return Err(AuthoringError::MissingStart(START_SCENE.to_string()).into());
        }

        let mut checker = Checker {
            scenes: &self.scenes,
            limits,
            instructions: 0,
        };
        for (name, actions) in &self.scenes {
            checker.check_list(name, actions, 0)?;
        }

        Ok(ScriptStore::new(self.scenes.clone()))
    }
}

/// Returns the JSON schema of the script format.
pub fn script_json_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(ScriptEnvelope);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

struct Checker<'a> {
    scenes: &'a BTreeMap<String, Vec<Instruction>>,
    limits: ResourceLimiter,
    instructions: usize,
}

impl Checker<'_> {
    fn check_list(&mut self, scene: &str, actions: &[Instruction], depth: usize) -> StoryResult<()> {
        if depth > self.limits.max_nesting_depth {
            return Err(AuthoringError::NestingTooDeep {
                scene: scene.to_string(),
                limit: self.limits.max_nesting_depth,
            }
            .into());
        }
        for instruction in actions {
            self.instructions += 1;
            if self.instructions > self.limits.max_instructions {
                return Err(StoryError::ResourceLimit(format!(
                    "more than {} instructions",
                    self.limits.max_instructions
                )));
            }
            self.check_text(instruction)?;
            self.check_instruction(scene, instruction)?;
            for (label, nested) in instruction.nested_lists() {
                if nested.is_empty() {
                    return Err(AuthoringError::EmptyBranch {
                        scene: scene.to_string(),
                        branch: label.to_string(),
                    }
                    .into());
                }
                self.check_list(scene, nested, depth + 1)?;
            }
        }
        Ok(())
    }

    fn check_instruction(&self, scene: &str, instruction: &Instruction) -> StoryResult<()> {
        match instruction {
            Instruction::Jump { scene: target } => {
                self.target(scene, target)?;
            }
            Instruction::Block { scene: target } => {
                if self.target(scene, target)?.is_empty() {
                    return Err(AuthoringError::EmptyBlock {
                        scene: scene.to_string(),
                        target: target.clone(),
                    }
                    .into());
                }
            }
            Instruction::Choice(choice) if choice.branches.is_empty() => {
                return Err(AuthoringError::EmptyChoice {
                    scene: scene.to_string(),
                }
                .into());
            }
            Instruction::Condition(condition) if condition.variants.is_empty() => {
                return Err(AuthoringError::EmptyCondition {
                    scene: scene.to_string(),
                }
                .into());
            }
            _ => {}
        }
        Ok(())
    }

    fn target(&self, scene: &str, target: &str) -> StoryResult<&[Instruction]> {
        self.scenes
            .get(target)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                AuthoringError::UnknownScene {
                    scene: scene.to_string(),
                    target: target.to_string(),
                }
                .into()
            })
    }

    fn check_text(&self, instruction: &Instruction) -> StoryResult<()> {
        let bytes = match instruction {
            Instruction::Dialogue(dialogue) => dialogue.text.string_bytes(),
            Instruction::Text { text } => text.string_bytes(),
            Instruction::Input { question, .. } => question.string_bytes(),
            Instruction::Choice(choice) => choice.prompt.string_bytes().max(
                choice
                    .branches
                    .iter()
                    .map(|branch| branch.label.string_bytes())
                    .max()
                    .unwrap_or(0),
            ),
            Instruction::Custom(action) => action.args.string_bytes(),
            _ => 0,
        };
        if bytes > self.limits.max_text_length {
            return Err(StoryError::ResourceLimit(format!(
                "{} text of {bytes} bytes, limit is {}",
                instruction.name(),
                self.limits.max_text_length
            )));
        }
        Ok(())
    }
}
