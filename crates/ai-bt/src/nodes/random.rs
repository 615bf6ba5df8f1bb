use ai_core::{pick_weighted, VarField, WorldMut};

use crate::{NodeCtx, NodeFault, NodeHandle, NodeResult, RefVisitor, State, WeightedRef};

/// Resolved entries of a weighted list with their current weights.
fn draw_pool<W: WorldMut + 'static>(
    branches: &[WeightedRef],
    ctx: &NodeCtx<'_, W>,
) -> Result<Vec<(usize, NodeHandle, u32)>, NodeFault> {
    let mut pool = Vec::with_capacity(branches.len());
    for (i, branch) in branches.iter().enumerate() {
        let Some(h) = branch.node.handle() else {
            continue;
        };
        let weight = ctx.read_int(&branch.weight)?;
        if weight < 0 {
            return Err(NodeFault::NegativeWeight {
                node: ctx.node_id(),
                weight,
            });
        }
        pool.push((i, h, weight as u32));
    }
    Ok(pool)
}

fn pick<W: WorldMut + 'static>(
    pool: &[(usize, NodeHandle, u32)],
    ctx: &mut NodeCtx<'_, W>,
) -> Option<(usize, NodeHandle)> {
    let weights: Vec<u32> = pool.iter().map(|&(_, _, w)| w).collect();
    let k = pick_weighted(ctx.rng(), &weights)?;
    Some((pool[k].0, pool[k].1))
}

/// Runs exactly one child, chosen by weighted draw each time the node is entered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Probability {
    pub branches: Vec<WeightedRef>,
    last: Option<usize>,
}

impl Probability {
    pub fn new(branches: impl IntoIterator<Item = WeightedRef>) -> Self {
        Self {
            branches: branches.into_iter().collect(),
            last: None,
        }
    }

    /// Index into `branches` of the most recent draw.
    pub fn last_choice(&self) -> Option<usize> {
        self.last
    }

    pub(crate) fn execute<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        let pool = draw_pool(&self.branches, ctx)?;
        match pick(&pool, ctx) {
            Some((i, h)) => {
                self.last = Some(i);
                Ok(ctx.descend(h))
            }
            None => Ok(State::Failed),
        }
    }

    pub(crate) fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        for b in self.branches.iter_mut() {
            visitor.child("branches", &mut b.node);
            visitor.var("weight", &mut b.weight);
        }
    }
}

/// Weighted draw that avoids long streaks.
///
/// Once the same branch has been chosen `max_consecutive` times in a row, it is left out of the
/// next draw (as long as another branch exists). A `max_consecutive` of zero disables the limit.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoProbability {
    pub branches: Vec<WeightedRef>,
    pub max_consecutive: VarField,
    previous: Option<usize>,
    repeats: u32,
}

impl PseudoProbability {
    pub fn new(branches: impl IntoIterator<Item = WeightedRef>, max_consecutive: impl Into<VarField>) -> Self {
        Self {
            branches: branches.into_iter().collect(),
            max_consecutive: max_consecutive.into(),
            previous: None,
            repeats: 0,
        }
    }

    pub fn last_choice(&self) -> Option<usize> {
        self.previous
    }

    pub fn repeats(&self) -> u32 {
        self.repeats
    }

    pub(crate) fn execute<W: WorldMut + 'static>(&mut self, ctx: &mut NodeCtx<'_, W>) -> NodeResult {
        let max = ctx.read_int(&self.max_consecutive)?.max(0) as u32;
        let mut pool = draw_pool(&self.branches, ctx)?;

        if let Some(prev) = self.previous {
            // Excluding the streak must not leave only zero-weight branches to draw from.
            let all_zero = pool.iter().all(|&(_, _, w)| w == 0);
            let alternative = pool.iter().any(|&(i, _, w)| i != prev && (w > 0 || all_zero));
            if max > 0 && self.repeats >= max && alternative {
                pool.retain(|&(i, _, _)| i != prev);
            }
        }

        let Some((i, h)) = pick(&pool, ctx) else {
            return Ok(State::Failed);
        };

        if self.previous == Some(i) {
            self.repeats = self.repeats.saturating_add(1);
        } else {
            self.previous = Some(i);
            self.repeats = 1;
        }
        Ok(ctx.descend(h))
    }

    pub(crate) fn visit_refs(&mut self, visitor: &mut dyn RefVisitor) {
        for b in self.branches.iter_mut() {
            visitor.child("branches", &mut b.node);
            visitor.var("weight", &mut b.weight);
        }
        visitor.var("max_consecutive", &mut self.max_consecutive);
    }
}
