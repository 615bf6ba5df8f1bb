use ai_core::WorldMut;
use serde::{Deserialize, Serialize};

use crate::ctx::Request;
use crate::{NodeCtx, NodeResult, RawNodeRef, RefVisitor, State};

/// Which call stack a rollback unwinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackScope {
    /// The stack the rollback node runs on.
    Current,
    /// The tree's main stack, even when running on a service or parallel branch.
    Main,
}

/// Structured multi-level `break`: unwinds a call stack back to `target` and re-enters it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollback {
    pub target: RawNodeRef,
    pub scope: RollbackScope,
}

impl Rollback {
    pub fn new(target: u64) -> Self {
        Self {
            target: RawNodeRef::new(target),
            scope: RollbackScope::Current,
        }
    }

    pub fn on_main(mut self) -> Self {
        self.scope = RollbackScope::Main;
        self
    }

    pub(crate) fn execute<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        let Some(target) = self.target.handle() else {
            return Err(ctx.unresolved("target"));
        };
        ctx.request = Some(Request::Rollback {
            target,
            scope: self.scope,
        });
        Ok(State::NoReturnYet)
    }

    pub(crate) fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        visitor.raw("target", &mut self.target);
    }
}
