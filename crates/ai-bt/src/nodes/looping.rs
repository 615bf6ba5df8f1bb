use ai_core::{VarField, WorldMut};

use crate::{NodeCtx, NodeRef, NodeResult, RefVisitor, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Test the condition before every pass.
    While,
    /// Run `count` passes; an optional condition can end the loop early.
    For,
    /// Run one pass, then test the condition before every further pass.
    DoWhile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopStage {
    Condition,
    Body(usize),
}

/// Repeats a body list while a condition holds or for a fixed count.
///
/// A condition that returns false ends the loop with `Success`. An empty body just re-tests the
/// condition within the same tick; the interpreter's step budget bounds a loop that never ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub mode: LoopMode,
    pub condition: NodeRef,
    pub count: VarField,
    pub body: Vec<NodeRef>,
    stage: LoopStage,
    iteration: u32,
    limit: u32,
}

impl Loop {
    pub fn new(mode: LoopMode, condition: Option<u64>, body: impl IntoIterator<Item = u64>) -> Self {
        Self {
            mode,
            condition: condition.map(NodeRef::new).unwrap_or_default(),
            count: VarField::constant(0),
            body: body.into_iter().map(NodeRef::new).collect(),
            stage: LoopStage::Condition,
            iteration: 0,
            limit: 0,
        }
    }

    pub fn repeat(count: impl Into<VarField>, body: impl IntoIterator<Item = u64>) -> Self {
        Self::new(LoopMode::For, None, body).with_count(count)
    }

    pub fn with_count(mut self, count: impl Into<VarField>) -> Self {
        self.count = count.into();
        self
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub(crate) fn execute<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        self.iteration = 0;
        self.limit = match self.mode {
            LoopMode::For => ctx.read_int(&self.count)?.max(0) as u32,
            LoopMode::While | LoopMode::DoWhile => 0,
        };
        self.next_pass(ctx)
    }

    pub(crate) fn receive<W: WorldMut + 'static>(
        &mut self,
        ctx: &mut NodeCtx<'_, W>,
        success: bool,
    ) -> NodeResult {
        let from = match self.stage {
            LoopStage::Condition if !success => return Ok(State::Success),
            LoopStage::Condition => 0,
            LoopStage::Body(i) => i + 1,
        };

        if let Some(state) = self.run_body_from(from, ctx) {
            return Ok(state);
        }
        self.iteration = self.iteration.saturating_add(1);
        self.next_pass(ctx)
    }

    fn next_pass<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        let has_body = self.body.iter().any(|b| b.handle().is_some());

        loop {
            if self.mode == LoopMode::For {
                if self.iteration >= self.limit {
                    return Ok(State::Success);
                }
                if !has_body && self.condition.handle().is_none() {
                    self.iteration = self.limit;
                    return Ok(State::Success);
                }
            }

            let test_condition = !(self.mode == LoopMode::DoWhile && self.iteration == 0);
            if test_condition {
                match self.condition.handle() {
                    Some(h) => {
                        self.stage = LoopStage::Condition;
                        return Ok(ctx.descend(h));
                    }
                    None if self.mode != LoopMode::For => return Err(ctx.unresolved("condition")),
                    None => {}
                }
            }

            if let Some(state) = self.run_body_from(0, ctx) {
                return Ok(state);
            }
            self.iteration = self.iteration.saturating_add(1);
        }
    }

    fn run_body_from<W: WorldMut + 'static>(&mut self, from: usize, ctx: &mut NodeCtx<'_, W>) -> Option<State> {
        let (i, h) = self
            .body
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(i, b)| b.handle().map(|h| (i, h)))?;
        self.stage = LoopStage::Body(i);
        Some(ctx.descend(h))
    }

    pub(crate) fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        visitor.child("condition", &mut self.condition);
        visitor.var("count", &mut self.count);
        for b in self.body.iter_mut() {
            visitor.child("body", b);
        }
    }
}
