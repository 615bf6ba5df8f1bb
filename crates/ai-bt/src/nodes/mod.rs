//! Node kinds.
//!
//! Every kind is a payload struct; [`NodeKind`] is the closed set the interpreter dispatches
//! over. Host behaviour plugs in through the [`Action`] and [`Determine`] leaf traits.

mod builtin;
mod composite;
mod leaf;
mod looping;
mod parallel;
mod random;
mod rollback;
mod wait;

use ai_core::{TickPhase, WorldMut};

use crate::{NodeCtx, NodeFault, NodeResult, RefVisitor, State};

pub use builtin::{Compare, CompareOp, SetVariable, Wait};
pub use composite::{Decision, Sequence};
pub use leaf::{
    Action, ActionClone, ActionHandle, ActionNode, ActionStatus, CancelToken, Determine,
    DetermineClone, DetermineNode,
};
pub use looping::{Loop, LoopMode};
pub use parallel::{Parallel, ParallelMode};
pub use random::{Probability, PseudoProbability};
pub use rollback::{Rollback, RollbackScope};
pub use wait::WaitCondition;

pub enum NodeKind<W>
where
    W: WorldMut + 'static,
{
    Sequence(Sequence),
    Decision(Decision),
    Loop(Loop),
    Probability(Probability),
    PseudoProbability(PseudoProbability),
    Parallel(Parallel),
    Rollback(Rollback),
    Wait(WaitCondition),
    Action(ActionNode<W>),
    Determine(DetermineNode<W>),
}

impl<W> NodeKind<W>
where
    W: WorldMut + 'static,
{
    pub fn action(behavior: impl Action<W> + 'static) -> Self {
        NodeKind::Action(ActionNode::new(behavior))
    }

    pub fn action_with_cadence(behavior: impl Action<W> + 'static, cadence: TickPhase) -> Self {
        NodeKind::Action(ActionNode::new(behavior).with_cadence(cadence))
    }

    pub fn determine(behavior: impl Determine<W> + 'static) -> Self {
        NodeKind::Determine(DetermineNode::new(behavior))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Decision(_) => "decision",
            NodeKind::Loop(_) => "loop",
            NodeKind::Probability(_) => "probability",
            NodeKind::PseudoProbability(_) => "pseudo_probability",
            NodeKind::Parallel(_) => "parallel",
            NodeKind::Rollback(_) => "rollback",
            NodeKind::Wait(_) => "wait",
            NodeKind::Action(_) => "action",
            NodeKind::Determine(_) => "determine",
        }
    }

    /// Tick phase in which a yielded node of this kind is resumed.
    pub fn resume_phase(&self) -> TickPhase {
        match self {
            NodeKind::Action(a) => a.cadence(),
            _ => TickPhase::Update,
        }
    }

    pub(crate) fn execute(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        match self {
            NodeKind::Sequence(n) => n.execute(ctx),
            NodeKind::Decision(n) => n.execute(ctx),
            NodeKind::Loop(n) => n.execute(ctx),
            NodeKind::Probability(n) => n.execute(ctx),
            NodeKind::PseudoProbability(n) => n.execute(ctx),
            NodeKind::Parallel(n) => n.execute(ctx),
            NodeKind::Rollback(n) => n.execute(ctx),
            NodeKind::Wait(n) => n.execute(ctx),
            NodeKind::Action(n) => n.execute(ctx),
            NodeKind::Determine(n) => n.execute(ctx),
        }
    }

    /// Re-enter a node that yielded.
    pub(crate) fn resume(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        match self {
            NodeKind::Wait(n) => n.resume(ctx),
            NodeKind::Action(n) => n.resume(ctx),
            // Only waits and actions yield; anything else starts over.
            other => other.execute(ctx),
        }
    }

    pub(crate) fn receive_return_from_child(
        &mut self,
        ctx: &mut NodeCtx<'_, W>,
        success: bool,
    ) -> NodeResult {
        match self {
            NodeKind::Sequence(n) => n.receive(ctx, success),
            NodeKind::Decision(n) => n.receive(ctx, success),
            NodeKind::Loop(n) => n.receive(ctx, success),
            NodeKind::Wait(n) => n.receive(success),
            NodeKind::Probability(_)
            | NodeKind::PseudoProbability(_)
            | NodeKind::Parallel(_)
            | NodeKind::Rollback(_) => Ok(State::from_bool(success)),
            NodeKind::Action(_) | NodeKind::Determine(_) => Err(NodeFault::Reported(ctx.node_id())),
        }
    }

    /// Completion delivered to a node waiting on async work.
    pub(crate) fn poll_async(&mut self) -> Option<Result<bool, NodeFault>> {
        match self {
            NodeKind::Action(n) => n.poll(),
            _ => None,
        }
    }

    pub(crate) fn async_ready(&self) -> bool {
        match self {
            NodeKind::Action(n) => n.is_ready(),
            _ => false,
        }
    }

    /// Interruption hook. Flow nodes keep no external resources; they reinitialise on entry.
    pub(crate) fn stop(&mut self, ctx: &mut NodeCtx<'_, W>) {
        if let NodeKind::Action(n) = self {
            n.stop(ctx);
        }
    }

    pub(crate) fn pause(&mut self, ctx: &mut NodeCtx<'_, W>) {
        if let NodeKind::Action(n) = self {
            n.pause(ctx);
        }
    }

    pub(crate) fn unpause(&mut self, ctx: &mut NodeCtx<'_, W>) {
        if let NodeKind::Action(n) = self {
            n.unpause(ctx);
        }
    }

    /// Visit every node reference and variable field of this kind.
    pub fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        match self {
            NodeKind::Sequence(n) => n.visit_refs(visitor),
            NodeKind::Decision(n) => n.visit_refs(visitor),
            NodeKind::Loop(n) => n.visit_refs(visitor),
            NodeKind::Probability(n) => n.visit_refs(visitor),
            NodeKind::PseudoProbability(n) => n.visit_refs(visitor),
            NodeKind::Parallel(n) => n.visit_refs(visitor),
            NodeKind::Rollback(n) => n.visit_refs(visitor),
            NodeKind::Wait(n) => n.visit_refs(visitor),
            NodeKind::Action(n) => n.visit_fields(&mut |field, var| visitor.var(field, var)),
            NodeKind::Determine(n) => n.visit_fields(&mut |field, var| visitor.var(field, var)),
        }
    }
}

impl<W> Clone for NodeKind<W>
where
    W: WorldMut + 'static,
{
    fn clone(&self) -> Self {
        match self {
            NodeKind::Sequence(n) => NodeKind::Sequence(n.clone()),
            NodeKind::Decision(n) => NodeKind::Decision(n.clone()),
            NodeKind::Loop(n) => NodeKind::Loop(n.clone()),
            NodeKind::Probability(n) => NodeKind::Probability(n.clone()),
            NodeKind::PseudoProbability(n) => NodeKind::PseudoProbability(n.clone()),
            NodeKind::Parallel(n) => NodeKind::Parallel(n.clone()),
            NodeKind::Rollback(n) => NodeKind::Rollback(n.clone()),
            NodeKind::Wait(n) => NodeKind::Wait(n.clone()),
            NodeKind::Action(n) => NodeKind::Action(n.clone()),
            NodeKind::Determine(n) => NodeKind::Determine(n.clone()),
        }
    }
}

macro_rules! kind_from {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl<W> From<$payload> for NodeKind<W>
            where
                W: WorldMut + 'static,
            {
                fn from(value: $payload) -> Self {
                    NodeKind::$variant(value)
                }
            }
        )*
    };
}

kind_from!(
    Sequence => Sequence,
    Decision => Decision,
    Loop => Loop,
    Probability => Probability,
    PseudoProbability => PseudoProbability,
    Parallel => Parallel,
    Rollback => Rollback,
    WaitCondition => Wait,
);

impl<W> From<ActionNode<W>> for NodeKind<W>
where
    W: WorldMut + 'static,
{
    fn from(value: ActionNode<W>) -> Self {
        NodeKind::Action(value)
    }
}

impl<W> From<DetermineNode<W>> for NodeKind<W>
where
    W: WorldMut + 'static,
{
    fn from(value: DetermineNode<W>) -> Self {
        NodeKind::Determine(value)
    }
}
