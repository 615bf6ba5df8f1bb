//! Toy world and leaves shared by the integration tests.

#![allow(dead_code)]

use ai_bt::{
    Action, ActionHandle, ActionStatus, CancelToken, Determine, NodeCtx, NodeFault, NodeKind,
    TreeBuilder, TreeError, TreeInstance, TreeStatus,
};
use ai_core::{TickContext, VarField, WorldMut, WorldView};

pub const AGENT: u64 = 1;

#[derive(Debug, Default)]
pub struct RecordingWorld {
    /// Names of leaves in the order they started or were evaluated.
    pub log: Vec<&'static str>,
    pub stopped: Vec<&'static str>,
    pub paused: Vec<&'static str>,
    pub resumed: Vec<&'static str>,
    pub updates: u32,
    pub handles: Vec<ActionHandle>,
    pub tokens: Vec<CancelToken>,
}

impl WorldView for RecordingWorld {
    type Agent = u64;
}

impl WorldMut for RecordingWorld {}

pub fn builder(name: &str) -> TreeBuilder<RecordingWorld> {
    TreeBuilder::new(name)
}

pub fn ctx(tick: u64) -> TickContext {
    TickContext {
        tick,
        dt_seconds: 0.1,
        seed: 123,
    }
}

pub fn tick(tree: &mut TreeInstance<RecordingWorld>, world: &mut RecordingWorld, n: u64) -> Result<TreeStatus, TreeError> {
    tree.update(&ctx(n), AGENT, world)
}

/// Tick until the tree stops running or `max` ticks have passed.
pub fn run(tree: &mut TreeInstance<RecordingWorld>, world: &mut RecordingWorld, max: u64) -> TreeStatus {
    for n in 0..max {
        match tick(tree, world, n) {
            Ok(TreeStatus::Running) => {}
            Ok(status) => return status,
            Err(err) => panic!("tick failed: {err}"),
        }
    }
    tree.status()
}

/// Condition that logs its name and answers with a fixed value.
#[derive(Debug, Clone)]
pub struct Check {
    pub name: &'static str,
    pub answer: bool,
}

impl Determine<RecordingWorld> for Check {
    fn evaluate(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<bool, NodeFault> {
        ctx.world_mut().log.push(self.name);
        Ok(self.answer)
    }
}

pub fn check(name: &'static str, answer: bool) -> NodeKind<RecordingWorld> {
    NodeKind::determine(Check { name, answer })
}

/// Long-running action: finishes with `result` after `ticks` updates, or never.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: &'static str,
    pub ticks: Option<u32>,
    pub result: bool,
    elapsed: u32,
}

impl Step {
    fn status(&self) -> ActionStatus {
        match self.ticks {
            Some(t) if self.elapsed >= t => {
                if self.result {
                    ActionStatus::Success
                } else {
                    ActionStatus::Failure
                }
            }
            _ => ActionStatus::Running,
        }
    }
}

impl Action<RecordingWorld> for Step {
    fn start(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        ctx.world_mut().log.push(self.name);
        self.elapsed = 0;
        Ok(self.status())
    }

    fn update(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        ctx.world_mut().updates += 1;
        self.elapsed += 1;
        Ok(self.status())
    }

    fn on_stop(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) {
        ctx.world_mut().stopped.push(self.name);
    }

    fn on_pause(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) {
        ctx.world_mut().paused.push(self.name);
    }

    fn on_resume(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) {
        ctx.world_mut().resumed.push(self.name);
    }
}

pub fn step(name: &'static str, ticks: Option<u32>, result: bool) -> NodeKind<RecordingWorld> {
    NodeKind::action(Step {
        name,
        ticks,
        result,
        elapsed: 0,
    })
}

/// Waits for a completion delivered through its handle; hands the handle to the world.
#[derive(Debug, Clone)]
pub struct Pending {
    pub name: &'static str,
}

impl Action<RecordingWorld> for Pending {
    fn start(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        let handle = ctx.action_handle().cloned();
        let world = ctx.world_mut();
        world.log.push(self.name);
        if let Some(handle) = handle {
            world.tokens.push(handle.cancel_token());
            world.handles.push(handle);
        }
        Ok(ActionStatus::Pending)
    }

    fn on_stop(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) {
        ctx.world_mut().stopped.push(self.name);
    }
}

pub fn pending(name: &'static str) -> NodeKind<RecordingWorld> {
    NodeKind::action(Pending { name })
}

/// Faults as soon as it starts.
#[derive(Debug, Clone)]
pub struct Failing {
    pub message: &'static str,
}

impl Action<RecordingWorld> for Failing {
    fn start(&mut self, _ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        Err(NodeFault::action(self.message))
    }
}

pub fn failing(message: &'static str) -> NodeKind<RecordingWorld> {
    NodeKind::action(Failing { message })
}

/// Adds one to an int variable.
#[derive(Debug, Clone)]
pub struct Increment {
    pub target: VarField,
}

impl Action<RecordingWorld> for Increment {
    fn start(&mut self, ctx: &mut NodeCtx<'_, RecordingWorld>) -> Result<ActionStatus, NodeFault> {
        let value = ctx.read_int(&self.target)?;
        ctx.write(&self.target, value + 1)?;
        Ok(ActionStatus::Success)
    }

    fn visit_fields(&mut self, visit: &mut dyn FnMut(&'static str, &mut VarField)) {
        visit("target", &mut self.target);
    }
}

pub fn increment(target: VarField) -> NodeKind<RecordingWorld> {
    NodeKind::action(Increment { target })
}
