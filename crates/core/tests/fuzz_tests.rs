//! Malformed and random paths must fail cleanly, never panic, and leave
//! resolution, reconstruction and exits in agreement.

use story_path_engine::{
    exit_current_branch, reconstruct, resolve, scan_forward, ExitOutcome, PathItem, ScanLimits,
    ScriptStore, StoryPath,
};

mod common;

const MAZE: &str = r#"{"scenes": {
    "start": [
        {"type": "text", "text": "a"},
        {"type": "choice", "branches": [
            {"label": "x", "actions": [
                {"type": "text", "text": "x1"},
                {"type": "exit"},
                {"type": "text", "text": "x2"}
            ]},
            {"label": "y", "actions": [
                {"type": "condition", "selector": {"kind": "var", "key": "level"}, "variants": {
                    "0": [{"type": "block", "scene": "side"}]
                }}
            ]}
        ]},
        {"type": "jump", "scene": "side"}
    ],
    "side": [
        {"type": "text", "text": "s1"},
        {"type": "text", "text": "s2"}
    ]
}}"#;

const SMALL_SCAN: ScanLimits = ScanLimits {
    max_steps: 32,
    max_depth: 4,
};

fn check_path(script: &ScriptStore, path: &StoryPath) {
    let resolved = resolve(script, path);
    let full = reconstruct(script, path, false);
    let filtered = reconstruct(script, path, true);
    assert_eq!(resolved.is_ok(), full.is_ok(), "{path:?}");
    assert_eq!(resolved.is_ok(), filtered.is_ok(), "{path:?}");
    if let (Ok(full), Ok(filtered)) = (&full, &filtered) {
        assert!(filtered.len() <= full.len());
    }

    let mut exited = path.clone();
    match exit_current_branch(script, &mut exited) {
        ExitOutcome::Exited => {
            assert!(resolve(script, &exited).is_ok(), "{exited:?}");
            assert!(matches!(exited.last(), Some(PathItem::Index(_))));
        }
        ExitOutcome::Impossible => assert_eq!(&exited, path),
    }

    let found = scan_forward(script, path, SMALL_SCAN);
    for (index, instruction) in found.iter().enumerate() {
        assert!(
            !found[..index].iter().any(|seen| std::ptr::eq(*seen, *instruction)),
            "scan returned a duplicate for {path:?}"
        );
    }
}

fn vocabulary() -> Vec<PathItem> {
    vec![
        PathItem::JumpTo("start".to_string()),
        PathItem::JumpTo("side".to_string()),
        PathItem::JumpTo("missing".to_string()),
        PathItem::Index(-1),
        PathItem::Index(0),
        PathItem::Index(1),
        PathItem::Index(2),
        PathItem::Index(9),
        PathItem::EnterChoice(0),
        PathItem::EnterChoice(1),
        PathItem::EnterChoice(7),
        PathItem::EnterCondition("0".to_string()),
        PathItem::EnterCondition("zz".to_string()),
        PathItem::EnterBlock("side".to_string()),
        PathItem::ExitChoice,
        PathItem::ExitCondition,
        PathItem::ExitBlock,
    ]
}

#[test]
fn every_short_path_is_handled_consistently() {
    let script = common::script(MAZE);
    let words = vocabulary();
    let mut checked = 0usize;
    let mut frontier = vec![StoryPath::jump("start")];
    for _ in 0..3 {
        let mut next = Vec::with_capacity(frontier.len() * words.len());
        for path in &frontier {
            check_path(&script, path);
            checked += 1;
            for word in &words {
                let mut longer = path.clone();
                longer.push(word.clone());
                next.push(longer);
            }
        }
        frontier = next;
    }
    for path in &frontier {
        check_path(&script, path);
        checked += 1;
    }
    assert_eq!(checked, 1 + 17 + 17 * 17 + 17 * 17 * 17);
}

#[test]
fn deep_branch_paths_resolve() {
    let script = common::script(MAZE);
    let path = StoryPath::new(vec![
        PathItem::JumpTo("start".to_string()),
        PathItem::Index(1),
        PathItem::EnterChoice(1),
        PathItem::Index(0),
        PathItem::EnterCondition("0".to_string()),
        PathItem::Index(0),
        PathItem::EnterBlock("side".to_string()),
        PathItem::Index(1),
    ]);
    check_path(&script, &path);
    assert!(resolve(&script, &path).unwrap().instruction().is_some());

    // Leaving the block lands past the end of the condition variant.
    let mut exited = path.clone();
    assert_eq!(exit_current_branch(&script, &mut exited), ExitOutcome::Exited);
    assert_eq!(exited.last(), Some(&PathItem::Index(1)));
    assert!(resolve(&script, &exited).unwrap().is_end_of_list());
}

#[cfg(feature = "arbitrary")]
mod fuzz {
    use arbitrary::{Arbitrary, Unstructured};

    use super::*;

    fn fill_deterministic(buf: &mut [u8], seed: u64) {
        let mut state = seed;
        for byte in buf.iter_mut() {
            // xorshift64*
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            state = state.wrapping_mul(0x2545_F491_4F6C_DD1D);
            *byte = (state & 0xFF) as u8;
        }
    }

    #[test]
    fn fuzz_arbitrary_paths() {
        let script = common::script(MAZE);
        let mut raw_data = [0u8; 1024 * 4];

        for i in 0..256u64 {
            fill_deterministic(&mut raw_data, 0xA11C_E55u64 ^ i);
            let mut u = Unstructured::new(&raw_data);
            if let Ok(path) = StoryPath::arbitrary(&mut u) {
                check_path(&script, &path);

                // Anchor the same items in a real scene so more of them resolve.
                let mut anchored = StoryPath::jump("start");
                for item in path.items() {
                    anchored.push(item.clone());
                }
                check_path(&script, &anchored);
            }
        }
    }

    #[test]
    fn fuzz_small_index_paths() {
        let script = common::script(MAZE);
        let words = vocabulary();
        let mut raw_data = [0u8; 256];

        for i in 0..512u64 {
            fill_deterministic(&mut raw_data, 0x5EED_1234u64 ^ (i << 1));
            let mut u = Unstructured::new(&raw_data);
            let mut path = StoryPath::jump("start");
            let len = u.int_in_range(0..=8usize).unwrap_or(0);
            for _ in 0..len {
                match u.choose(&words) {
                    Ok(word) => path.push(word.clone()),
                    Err(_) => break,
                }
            }
            check_path(&script, &path);
        }
    }
}
