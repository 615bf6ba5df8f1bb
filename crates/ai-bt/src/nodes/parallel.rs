use ai_core::WorldMut;
use serde::{Deserialize, Serialize};

use crate::ctx::Request;
use crate::{NodeCtx, NodeHandle, NodeRef, NodeResult, RefVisitor, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParallelMode {
    /// Resolve when every branch finished; succeed only if all succeeded.
    WaitAll,
    /// Resolve with the result of the first branch to finish.
    WaitAny,
}

/// Runs every child on its own call stack, ticked alongside the stack that entered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parallel {
    pub branches: Vec<NodeRef>,
    pub mode: ParallelMode,
}

impl Parallel {
    pub fn new(mode: ParallelMode, branches: impl IntoIterator<Item = u64>) -> Self {
        Self {
            branches: branches.into_iter().map(NodeRef::new).collect(),
            mode,
        }
    }

    pub(crate) fn execute<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        let branches: Vec<NodeHandle> = self.branches.iter().filter_map(|b| b.handle()).collect();
        if branches.is_empty() {
            return Ok(State::from_bool(self.mode == ParallelMode::WaitAll));
        }
        ctx.request = Some(Request::Parallel {
            branches,
            mode: self.mode,
        });
        Ok(State::NoReturnYet)
    }

    pub(crate) fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        for b in self.branches.iter_mut() {
            visitor.child("branches", b);
        }
    }
}
