//! Load-time flattening of nested instruction groups.
//!
//! Anywhere a script expects an instruction list it may also contain arrays
//! of instructions (helpers that expand to several actions). They are spliced
//! in place while deserializing, so the rest of the engine only ever sees
//! flat lists.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::value::MapAccessDeserializer;
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use super::Instruction;

enum Node {
    Group(Vec<Node>),
    Single(Box<Instruction>),
}

impl Node {
    fn flatten_into(self, out: &mut Vec<Instruction>) {
        match self {
            Node::Group(nodes) => {
                for node in nodes {
                    node.flatten_into(out);
                }
            }
            Node::Single(instruction) => out.push(*instruction),
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an instruction object or an array of instructions")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut nodes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(node) = seq.next_element::<Node>()? {
            nodes.push(node);
        }
        Ok(Node::Group(nodes))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Node, A::Error> {
        Instruction::deserialize(MapAccessDeserializer::new(map))
            .map(|instruction| Node::Single(Box::new(instruction)))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

/// An instruction list with nested groups already spliced in.
pub(crate) struct FlatList(pub Vec<Instruction>);

impl<'de> Deserialize<'de> for FlatList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let nodes = Vec::<Node>::deserialize(deserializer)?;
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            node.flatten_into(&mut out);
        }
        Ok(FlatList(out))
    }
}

pub(crate) fn flat_list<'de, D>(deserializer: D) -> Result<Vec<Instruction>, D::Error>
where
    D: Deserializer<'de>,
{
    FlatList::deserialize(deserializer).map(|list| list.0)
}

pub(crate) fn flat_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<Instruction>>, D::Error>
where
    D: Deserializer<'de>,
{
    let variants = BTreeMap::<String, FlatList>::deserialize(deserializer)?;
    Ok(variants
        .into_iter()
        .map(|(key, list)| (key, list.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_groups_are_spliced_in_order() {
        let json = r#"[
            {"type": "show_background", "background": "room"},
            [
                {"type": "play_music", "source": "theme"},
                [{"type": "wait", "ms": 10}]
            ],
            {"type": "end"}
        ]"#;
        let list: FlatList = serde_json::from_str(json).expect("list parses");
        let names: Vec<_> = list.0.iter().map(Instruction::name).collect();
        assert_eq!(names, ["show_background", "play_music", "wait", "end"]);
    }

    #[test]
    fn unknown_tag_inside_group_keeps_message() {
        let json = r#"[[{"type": "fly"}]]"#;
        let err = serde_json::from_str::<FlatList>(json)
            .err()
            .expect("unknown tag must fail");
        assert!(err.to_string().contains("fly"));
    }
}
