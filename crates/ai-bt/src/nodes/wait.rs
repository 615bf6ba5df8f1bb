use ai_core::WorldMut;

use crate::{NodeCtx, NodeRef, NodeResult, RefVisitor, State};

/// Re-runs a condition child once per tick until it returns `until`.
///
/// `until == true` is a wait-until, `until == false` a wait-while.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitCondition {
    pub condition: NodeRef,
    pub until: bool,
    checks: u32,
}

impl WaitCondition {
    pub fn until(condition: u64) -> Self {
        Self {
            condition: NodeRef::new(condition),
            until: true,
            checks: 0,
        }
    }

    pub fn while_true(condition: u64) -> Self {
        Self {
            condition: NodeRef::new(condition),
            until: false,
            checks: 0,
        }
    }

    pub fn checks(&self) -> u32 {
        self.checks
    }

    pub(crate) fn execute<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        self.checks = 0;
        ctx.descend_required("condition", &self.condition)
    }

    pub(crate) fn resume<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        ctx.descend_required("condition", &self.condition)
    }

    pub(crate) fn receive(&mut self, success: bool) -> NodeResult {
        self.checks = self.checks.saturating_add(1);
        if success == self.until {
            Ok(State::Success)
        } else {
            Ok(State::Yield)
        }
    }

    pub(crate) fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        visitor.child("condition", &mut self.condition);
    }
}
