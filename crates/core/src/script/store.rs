use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::error::StoryResult;
use crate::instruction::Instruction;
use crate::resource::ResourceLimiter;

use super::raw::ScriptRaw;

/// Unique identifier for a script, the SHA-256 of its canonical JSON.
pub type ScriptId = [u8; 32];

/// Computes a script id from canonical script bytes.
pub fn compute_script_id(bytes: &[u8]) -> ScriptId {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

pub(crate) fn hex_id(script_id: &ScriptId) -> String {
    script_id.iter().fold(String::with_capacity(64), |mut output, byte| {
        output.push_str(&format!("{byte:02x}"));
        output
    })
}

/// Validated, immutable scene table shared by every context.
#[derive(Clone, Debug)]
pub struct ScriptStore {
    scenes: BTreeMap<String, Vec<Instruction>>,
    script_id: ScriptId,
}

impl ScriptStore {
    pub(crate) fn new(scenes: BTreeMap<String, Vec<Instruction>>) -> Self {
        let canonical = serde_json::to_vec(&scenes).unwrap_or_default();
        let script_id = compute_script_id(&canonical);
        Self { scenes, script_id }
    }

    /// Parses and compiles a JSON script with default limits.
    pub fn from_json(input: &str) -> StoryResult<Self> {
        ScriptRaw::from_json(input)?.compile(ResourceLimiter::default())
    }

    /// Returns the instruction list of a scene.
    pub fn scene(&self, name: &str) -> Option<&[Instruction]> {
        self.scenes.get(name).map(Vec::as_slice)
    }

    pub fn contains_scene(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    pub fn script_id(&self) -> &ScriptId {
        &self.script_id
    }

    /// Hex form of the script id, for metadata and logs.
    pub fn script_id_hex(&self) -> String {
        hex_id(&self.script_id)
    }

    /// Returns the scenes as an editable raw script.
    pub fn to_raw(&self) -> ScriptRaw {
        ScriptRaw::new(self.scenes.clone())
    }
}
