mod raw;
mod store;

pub use raw::{script_json_schema, ScriptRaw};
pub(crate) use store::hex_id;
pub use store::{compute_script_id, ScriptId, ScriptStore};

#[cfg(test)]
#[path = "tests/raw_tests.rs"]
mod tests;
