mod common;

use ai_bt::{
    Action, ActionStatus, Loop, Node, NodeCtx, NodeFault, NodeId, NodeKind, Parallel, ParallelMode,
    Sequence, TreeError, TreeStatus, Wait,
};
use ai_core::{GlobalVariables, TickPhase};
use common::{builder, check, ctx, pending, step, tick, RecordingWorld, AGENT};

#[derive(Debug, Clone)]
struct Awakened;

impl Action<RecordingWorld> for Awakened {
    fn awake(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<(), NodeFault> {
        ctx.world_mut().log.push("awake");
        Ok(())
    }

    fn start(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        ctx.world_mut().log.push("start");
        Ok(ActionStatus::Success)
    }
}

/// Finishes after two fixed-rate steps; records which hooks ran.
#[derive(Debug, Clone, Default)]
struct Physics {
    steps: u32,
}

impl Action<RecordingWorld> for Physics {
    fn start(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        self.steps = 0;
        ctx.world_mut().log.push("start");
        Ok(ActionStatus::Running)
    }

    fn update(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        ctx.world_mut().log.push("update");
        Ok(ActionStatus::Running)
    }

    fn fixed_update(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        ctx.world_mut().log.push("fixed");
        self.steps += 1;
        if self.steps >= 2 {
            Ok(ActionStatus::Success)
        } else {
            Ok(ActionStatus::Running)
        }
    }
}

/// Completes the first pending handle the world holds.
#[derive(Debug, Clone)]
struct Finisher;

impl Action<RecordingWorld> for Finisher {
    fn start(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        if let Some(handle) = ctx.world().handles.first() {
            handle.end(true);
        }
        Ok(ActionStatus::Success)
    }
}

#[test]
fn awake_runs_once_per_instance() {
    let proto = builder("awake")
        .node(Node::new(1, "root", Loop::repeat(3, [2])))
        .node(Node::new(2, "leaf", NodeKind::action(Awakened)))
        .build()
        .unwrap();
    let mut world = RecordingWorld::default();

    let mut tree = proto.instantiate(&GlobalVariables::new());
    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Completed(true));
    assert_eq!(world.log, vec!["awake", "start", "start", "start"]);

    // A second instance gets its own awake.
    world.log.clear();
    let mut other = proto.instantiate(&GlobalVariables::new());
    other.start().unwrap();
    tick(&mut other, &mut world, 0).unwrap();
    assert_eq!(world.log[0], "awake");
}

#[test]
fn interrupted_action_is_stopped_exactly_once() {
    let mut tree = builder("stop")
        .node(Node::new(1, "root", step("never", None, true)))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    tick(&mut tree, &mut world, 0).unwrap();
    tree.end(&ctx(1), AGENT, &mut world);
    tree.end(&ctx(2), AGENT, &mut world);
    tree.reset(&ctx(3), AGENT, &mut world);

    assert_eq!(world.stopped, vec!["never"]);
}

#[test]
fn finished_action_is_not_stopped() {
    let mut tree = builder("done")
        .node(Node::new(1, "root", step("quick", Some(1), true)))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(common::run(&mut tree, &mut world, 4), TreeStatus::Completed(true));
    tree.end(&ctx(5), AGENT, &mut world);
    assert!(world.stopped.is_empty());
}

#[test]
fn handle_completion_finishes_a_pending_action() {
    let mut tree = builder("async")
        .node(Node::new(1, "root", pending("remote")))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Running);
    assert_eq!(tick(&mut tree, &mut world, 1).unwrap(), TreeStatus::Running);

    world.handles[0].end(true);
    assert_eq!(tick(&mut tree, &mut world, 2).unwrap(), TreeStatus::Completed(true));
    assert!(!world.tokens[0].is_cancelled());
    assert!(world.stopped.is_empty());
}

#[test]
fn completion_within_the_same_tick_is_picked_up() {
    let mut tree = builder("same-tick")
        .node(Node::new(1, "root", Parallel::new(ParallelMode::WaitAll, [2, 3])))
        .node(Node::new(2, "remote", pending("remote")))
        .node(Node::new(3, "finisher", NodeKind::action(Finisher)))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Completed(true));
}

#[test]
fn ending_the_tree_cancels_the_token_and_drops_late_completions() {
    let mut tree = builder("cancel")
        .node(Node::new(1, "root", pending("remote")))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    tick(&mut tree, &mut world, 0).unwrap();
    tree.end(&ctx(1), AGENT, &mut world);

    assert!(world.tokens[0].is_cancelled());
    assert_eq!(world.stopped, vec!["remote"]);

    world.handles[0].end(true);
    assert!(!world.handles[0].is_complete());

    // The next run gets a fresh handle that the stale one cannot complete.
    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 2).unwrap(), TreeStatus::Running);
    assert_eq!(world.handles.len(), 2);
    assert!(!world.handles[1].is_complete());
    assert!(!world.tokens[1].is_cancelled());
}

#[test]
fn host_can_end_actions_by_id() {
    let mut tree = builder("by-id")
        .node(Node::new(1, "root", Sequence::new([2])))
        .node(Node::new(2, "remote", pending("remote")))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    assert_eq!(tree.end_action(NodeId(9), true), Err(TreeError::UnknownNode(NodeId(9))));
    assert_eq!(tree.end_action(NodeId(1), true), Err(TreeError::NotAnAction(NodeId(1))));

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Running);
    tree.end_action(NodeId(2), false).unwrap();
    assert_eq!(tick(&mut tree, &mut world, 1).unwrap(), TreeStatus::Completed(false));
}

#[test]
fn action_ticks_only_in_its_cadence_phase() {
    let mut tree = builder("cadence")
        .node(Node::new(
            1,
            "root",
            NodeKind::action_with_cadence(Physics::default(), TickPhase::FixedUpdate),
        ))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tree.update(&ctx(0), AGENT, &mut world).unwrap(), TreeStatus::Running);
    assert_eq!(tree.late_update(&ctx(0), AGENT, &mut world).unwrap(), TreeStatus::Running);
    assert_eq!(tree.update(&ctx(1), AGENT, &mut world).unwrap(), TreeStatus::Running);
    assert_eq!(tree.fixed_update(&ctx(1), AGENT, &mut world).unwrap(), TreeStatus::Running);
    assert_eq!(
        tree.fixed_update(&ctx(1), AGENT, &mut world).unwrap(),
        TreeStatus::Completed(true)
    );
    assert_eq!(world.log, vec!["start", "fixed", "fixed"]);
}

#[test]
fn pause_and_resume_reach_running_actions() {
    let mut tree = builder("pause")
        .node(Node::new(1, "root", Sequence::new([2, 3])))
        .node(Node::new(2, "walk", step("walk", Some(2), true)))
        .node(Node::new(3, "after", check("after", true)))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    assert_eq!(tick(&mut tree, &mut world, 0).unwrap(), TreeStatus::Running);

    tree.pause(&ctx(1), AGENT, &mut world);
    assert_eq!(world.paused, vec!["walk"]);
    assert_eq!(tick(&mut tree, &mut world, 1).unwrap(), TreeStatus::Paused);
    assert_eq!(world.updates, 0);

    tree.resume(&ctx(2), AGENT, &mut world);
    assert_eq!(world.resumed, vec!["walk"]);
    assert_eq!(tick(&mut tree, &mut world, 2).unwrap(), TreeStatus::Running);
    assert_eq!(tick(&mut tree, &mut world, 3).unwrap(), TreeStatus::Completed(true));
    assert_eq!(world.updates, 2);
    assert_eq!(world.log, vec!["walk", "after"]);
}

#[test]
fn builtin_wait_counts_down_tick_time() {
    let mut tree = builder("wait")
        .node(Node::new(1, "root", NodeKind::action(Wait::new(0.25f32))))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());
    let mut world = RecordingWorld::default();

    tree.start().unwrap();
    for n in 0..3 {
        assert_eq!(tick(&mut tree, &mut world, n).unwrap(), TreeStatus::Running, "tick {n}");
    }
    assert_eq!(tick(&mut tree, &mut world, 3).unwrap(), TreeStatus::Completed(true));

    // The same countdown runs in whichever phase the action is scheduled on.
    let mut fixed = builder("fixed-wait")
        .node(Node::new(
            1,
            "root",
            NodeKind::action_with_cadence(Wait::new(0.25f32), TickPhase::FixedUpdate),
        ))
        .build()
        .unwrap()
        .instantiate(&GlobalVariables::new());

    fixed.start().unwrap();
    for n in 0..3 {
        assert_eq!(fixed.fixed_update(&ctx(n), AGENT, &mut world).unwrap(), TreeStatus::Running, "step {n}");
        assert_eq!(fixed.update(&ctx(n), AGENT, &mut world).unwrap(), TreeStatus::Running);
    }
    assert_eq!(
        fixed.fixed_update(&ctx(3), AGENT, &mut world).unwrap(),
        TreeStatus::Completed(true)
    );
}
