mod common;

use ai_bt::{Compare, CompareOp, Loop, LoopMode, Node, NodeId, NodeKind, TreeConfig, TreeStatus};
use ai_core::{GlobalVariables, Value, VarField, VarId, VarType, Variable};
use common::{builder, check, increment, run, step, tick, RecordingWorld};

fn counter() -> Variable {
    Variable::new(VarId(1), "counter", VarType::Int)
}

#[test]
fn for_loop_checks_the_condition_count_times_in_one_tick() {
    let proto = builder("for")
        .node(Node::new(1, "root", Loop::new(LoopMode::For, Some(2), []).with_count(3)))
        .node(Node::new(2, "cond", check("cond", true)))
        .build()
        .unwrap();
    let mut tree = proto.instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Completed(true));
    assert_eq!(world.log, vec!["cond"; 3]);
}

#[test]
fn for_loop_runs_the_body_count_times() {
    let proto = builder("repeat")
        .variable(counter())
        .node(Node::new(1, "root", Loop::repeat(4, [2])))
        .node(Node::new(2, "inc", increment(VarField::local(1))))
        .build()
        .unwrap();
    let mut tree = proto.instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Completed(true));
    assert_eq!(tree.variable("counter"), Some(&Value::Int(4)));

    match tree.node(NodeId(1)).unwrap().kind() {
        NodeKind::Loop(l) => assert_eq!(l.iteration(), 4),
        other => panic!("unexpected kind {}", other.kind_name()),
    }
}

#[test]
fn for_loop_count_can_be_bound_to_a_variable() {
    let proto = builder("repeat-var")
        .variable(counter())
        .variable(Variable::new(VarId(2), "times", VarType::Int).with_value(2).unwrap())
        .node(Node::new(1, "root", Loop::repeat(VarField::local(2), [2])))
        .node(Node::new(2, "inc", increment(VarField::local(1))))
        .build()
        .unwrap();
    let mut tree = proto.instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    run(&mut tree, &mut world, 2);
    assert_eq!(tree.variable("counter"), Some(&Value::Int(2)));
}

#[test]
fn while_loop_ends_with_success_when_the_condition_turns_false() {
    let proto = builder("while")
        .variable(counter())
        .node(Node::new(1, "root", Loop::new(LoopMode::While, Some(2), [3])))
        .node(Node::new(
            2,
            "counter < 3",
            NodeKind::determine(Compare::new(VarField::local(1), CompareOp::Lt, 3)),
        ))
        .node(Node::new(3, "inc", increment(VarField::local(1))))
        .build()
        .unwrap();
    let mut tree = proto.instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Completed(true));
    assert_eq!(tree.variable("counter"), Some(&Value::Int(3)));
}

#[test]
fn do_while_runs_the_body_before_the_first_check() {
    let proto = builder("do-while")
        .variable(counter())
        .node(Node::new(1, "root", Loop::new(LoopMode::DoWhile, Some(2), [3])))
        .node(Node::new(2, "never", check("never", false)))
        .node(Node::new(3, "inc", increment(VarField::local(1))))
        .build()
        .unwrap();
    let mut tree = proto.instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Completed(true));
    assert_eq!(tree.variable("counter"), Some(&Value::Int(1)));
    assert_eq!(world.log, vec!["never"]);
}

#[test]
fn while_loop_without_condition_fails() {
    let proto = builder("while")
        .node(Node::new(1, "root", Loop::new(LoopMode::While, None, [2])))
        .node(Node::new(2, "body", check("body", true)))
        .build()
        .unwrap();
    let mut tree = proto.instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Completed(false));
    assert!(world.log.is_empty());
}

#[test]
fn body_that_yields_spreads_iterations_over_ticks() {
    let proto = builder("slow")
        .node(Node::new(1, "root", Loop::repeat(2, [2])))
        .node(Node::new(2, "work", step("work", Some(1), true)))
        .build()
        .unwrap();
    let mut tree = proto.instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Running);
    assert_eq!(tick(&mut tree, &mut world, 1).unwrap(), TreeStatus::Running);
    assert_eq!(tick(&mut tree, &mut world, 2).unwrap(), TreeStatus::Completed(true));
    assert_eq!(world.log, vec!["work", "work"]);
}

#[test]
fn endless_loop_is_cut_off_by_the_step_budget() {
    let config = TreeConfig {
        max_steps_per_tick: 64,
        ..TreeConfig::default()
    };
    let proto = builder("spin")
        .config(config)
        .node(Node::new(1, "root", Loop::new(LoopMode::While, Some(2), [])))
        .node(Node::new(2, "always", check("always", true)))
        .build()
        .unwrap();
    let mut tree = proto.instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Running);
    let first = world.log.len();
    assert!(first > 0 && first <= 64);

    assert_eq!(tick(&mut tree, &mut world, 1).unwrap(), TreeStatus::Running);
    assert!(world.log.len() > first);
}
