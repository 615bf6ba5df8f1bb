use ai_core::{
    GlobalVariables, SplitMix64, TickContext, TickPhase, Value, VarField, VariableError,
    VariableTable, WorldMut,
};

use crate::nodes::{ActionHandle, ParallelMode, RollbackScope};
use crate::{NodeFault, NodeHandle, NodeId, NodeRef, State};

/// Engine work a node asks for by returning `State::NoReturnYet`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Request {
    Descend(NodeHandle),
    Parallel {
        branches: Vec<NodeHandle>,
        mode: ParallelMode,
    },
    Rollback {
        target: NodeHandle,
        scope: RollbackScope,
    },
}

/// Everything a node may touch during one invocation.
///
/// Leaves read and write variables through [`NodeCtx::read`] / [`NodeCtx::write`] and reach the
/// host only through the world; flow nodes additionally delegate to children.
pub struct NodeCtx<'a, W>
where
    W: WorldMut + 'static,
{
    pub(crate) node: NodeId,
    pub(crate) tick: &'a TickContext,
    pub(crate) phase: TickPhase,
    pub(crate) agent: W::Agent,
    pub(crate) world: &'a mut W,
    pub(crate) locals: &'a mut VariableTable,
    pub(crate) globals: &'a GlobalVariables,
    pub(crate) rng: &'a mut SplitMix64,
    pub(crate) request: Option<Request>,
    pub(crate) action: Option<ActionHandle>,
}

impl<'a, W> NodeCtx<'a, W>
where
    W: WorldMut + 'static,
{
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn tick(&self) -> &TickContext {
        self.tick
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn agent(&self) -> W::Agent {
        self.agent
    }

    pub fn world(&self) -> &W {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut *self.world
    }

    pub fn rng(&mut self) -> &mut SplitMix64 {
        &mut *self.rng
    }

    pub fn locals(&self) -> &VariableTable {
        &*self.locals
    }

    pub fn globals(&self) -> &GlobalVariables {
        self.globals
    }

    /// Completion/cancellation handle of the action being invoked. `None` outside action hooks.
    pub fn action_handle(&self) -> Option<&ActionHandle> {
        self.action.as_ref()
    }

    pub fn read(&self, field: &VarField) -> Result<Value, VariableError> {
        field.read(&*self.locals, self.globals)
    }

    pub fn read_int(&self, field: &VarField) -> Result<i32, VariableError> {
        self.read(field)?.to_int()
    }

    pub fn read_float(&self, field: &VarField) -> Result<f32, VariableError> {
        self.read(field)?.to_float()
    }

    pub fn read_bool(&self, field: &VarField) -> Result<bool, VariableError> {
        self.read(field)?.to_bool()
    }

    pub fn write(&mut self, field: &VarField, value: impl Into<Value>) -> Result<(), VariableError> {
        field.write(&mut *self.locals, self.globals, value)
    }

    pub(crate) fn descend(&mut self, child: NodeHandle) -> State {
        self.request = Some(Request::Descend(child));
        State::NoReturnYet
    }

    pub(crate) fn descend_required(&mut self, field: &'static str, child: &NodeRef) -> Result<State, NodeFault> {
        match child.handle() {
            Some(h) => Ok(self.descend(h)),
            None => Err(self.unresolved(field)),
        }
    }

    pub(crate) fn unresolved(&self, field: &'static str) -> NodeFault {
        NodeFault::Unresolved {
            node: self.node,
            field,
        }
    }
}
