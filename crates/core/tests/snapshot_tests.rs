//! Golden traces: what the player sees must not drift between releases.

use story_path_engine::{trace_story, Context, Instruction, PlayOutcome, SaveKind};

mod common;
use common::{config, script, FOREST};

#[test]
fn golden_trace_first_branch() {
    let (trace, outcome) = trace_story(script(FOREST), config(), &[0], 100).unwrap();
    assert_eq!(outcome, PlayOutcome::Ended);
    let views: Vec<_> = trace.views().collect();
    insta::assert_json_snapshot!(views, @r#"
    [
      {
        "kind": "Stage",
        "description": "background forest.png"
      },
      {
        "kind": "Stage",
        "description": "show ava (calm)"
      },
      {
        "kind": "Dialogue",
        "speaker": "ava",
        "text": "A"
      },
      {
        "kind": "Choice",
        "prompt": "Which way?",
        "options": [
          "x",
          "y"
        ]
      },
      {
        "kind": "Stage",
        "description": "show ben"
      },
      {
        "kind": "Stage",
        "description": "music theme.ogg"
      },
      {
        "kind": "Dialogue",
        "speaker": "ben",
        "text": "B"
      },
      {
        "kind": "Stage",
        "description": "hide ava"
      },
      {
        "kind": "Dialogue",
        "speaker": "",
        "text": "D"
      }
    ]
    "#);
}

#[test]
fn golden_restore_plan_after_second_branch() {
    let mut context = Context::new("golden", script(FOREST), config());
    for _ in 0..4 {
        context.advance();
    }
    context.choose(1).unwrap();
    let save = context.save(SaveKind::Auto);
    insta::assert_json_snapshot!(save.path(), @r#"
    [
      [
        "jump",
        "start"
      ],
      [
        null,
        3
      ],
      [
        "choice",
        1
      ],
      [
        null,
        0
      ]
    ]
    "#);

    let plan = context.reconstruct_and_compact(save.path()).unwrap();
    let names: Vec<_> = plan.queue.iter().map(Instruction::name).collect();
    insta::assert_json_snapshot!(names, @r#"
    [
      "show_background",
      "show_character",
      "dialogue"
    ]
    "#);
}
