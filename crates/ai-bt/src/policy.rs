use ai_core::{Policy, TickContext, TickPhase, WorldMut};

use crate::{TreeInstance, TreeStatus};

/// Drive an instance from a [`ai_core::Brain`]: finished trees start over on the next update,
/// like a policy that is consulted every think tick.
impl<W> Policy<W> for TreeInstance<W>
where
    W: WorldMut + 'static,
{
    fn tick(&mut self, phase: TickPhase, ctx: &TickContext, agent: W::Agent, world: &mut W) {
        if phase == TickPhase::Update && matches!(self.status(), TreeStatus::Idle | TreeStatus::Completed(_)) {
            if let Err(err) = self.start() {
                tracing::error!(tree = %self.name(), %err, "tree failed to start");
                return;
            }
        }
        if let Err(err) = self.tick_phase(phase, ctx, agent, world) {
            tracing::error!(tree = %self.name(), %err, "tree tick failed");
        }
    }
}
