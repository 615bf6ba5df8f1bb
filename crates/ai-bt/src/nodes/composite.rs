use ai_core::WorldMut;

use crate::{NodeCtx, NodeRef, NodeResult, RefVisitor, State};

/// Runs every child in order and succeeds if **any** child succeeded.
///
/// This is not the short-circuiting AND most behaviour-tree libraries call a sequence: every
/// child always runs, and the result is the OR of their results ("did anything take effect").
/// Unresolved children are skipped. An empty sequence fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    pub children: Vec<NodeRef>,
    index: usize,
    any_success: bool,
}

impl Sequence {
    pub fn new(children: impl IntoIterator<Item = u64>) -> Self {
        Self {
            children: children.into_iter().map(NodeRef::new).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn execute<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        self.index = 0;
        self.any_success = false;
        Ok(self.advance(ctx))
    }

    pub(crate) fn receive<W: WorldMut + 'static>(
        &mut self,
        ctx: &mut NodeCtx<'_, W>,
        success: bool,
    ) -> NodeResult {
        self.any_success |= success;
        self.index += 1;
        Ok(self.advance(ctx))
    }

    fn advance<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> State {
        while let Some(child) = self.children.get(self.index) {
            if let Some(h) = child.handle() {
                return ctx.descend(h);
            }
            self.index += 1;
        }
        State::from_bool(self.any_success)
    }

    pub(crate) fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        for child in self.children.iter_mut() {
            visitor.child("children", child);
        }
    }
}

/// Classic selector: the first child that succeeds wins; fails when every child fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    pub children: Vec<NodeRef>,
    index: usize,
}

impl Decision {
    pub fn new(children: impl IntoIterator<Item = u64>) -> Self {
        Self {
            children: children.into_iter().map(NodeRef::new).collect(),
            index: 0,
        }
    }

    pub(crate) fn execute<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        self.index = 0;
        Ok(self.advance(ctx))
    }

    pub(crate) fn receive<W: WorldMut + 'static>(
        &mut self,
        ctx: &mut NodeCtx<'_, W>,
        success: bool,
    ) -> NodeResult {
        if success {
            return Ok(State::Success);
        }
        self.index += 1;
        Ok(self.advance(ctx))
    }

    fn advance<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> State {
        while let Some(child) = self.children.get(self.index) {
            if let Some(h) = child.handle() {
                return ctx.descend(h);
            }
            self.index += 1;
        }
        State::Failed
    }

    pub(crate) fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        for child in self.children.iter_mut() {
            visitor.child("children", child);
        }
    }
}
