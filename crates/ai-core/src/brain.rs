use crate::{AgentId, TickContext, TickPhase, WorldMut};

/// Something that decides what an agent does, driven by the host loop.
pub trait Policy<W>: 'static
where
    W: WorldMut + 'static,
{
    fn tick(&mut self, phase: TickPhase, ctx: &TickContext, agent: W::Agent, world: &mut W);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrainConfig {
    pub think_every_ticks: u32,
    pub think_offset_ticks: u32,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            think_every_ticks: 1,
            think_offset_ticks: 0,
        }
    }
}

impl BrainConfig {
    /// Spread agents across frames: the offset is derived from the agent's stable id.
    pub fn deterministic(agent: impl AgentId, think_every_ticks: u32) -> Self {
        let every = think_every_ticks.max(1);
        let offset = (agent.stable_id() % (every as u64)) as u32;
        Self {
            think_every_ticks: every,
            think_offset_ticks: offset,
        }
    }

    pub fn should_think(&self, tick: u64) -> bool {
        let every = self.think_every_ticks.max(1) as u64;
        ((tick + (self.think_offset_ticks as u64)) % every) == 0
    }
}

/// One agent and the policy driving it.
pub struct Brain<W>
where
    W: WorldMut + 'static,
{
    pub agent: W::Agent,
    pub config: BrainConfig,
    pub policy: Box<dyn Policy<W>>,
}

impl<W> Brain<W>
where
    W: WorldMut + 'static,
{
    pub fn new(agent: W::Agent, policy: Box<dyn Policy<W>>) -> Self {
        Self {
            agent,
            config: BrainConfig::default(),
            policy,
        }
    }

    pub fn with_config(mut self, config: BrainConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward one host callback to the policy. Decimated frames are skipped for every phase.
    pub fn tick(&mut self, phase: TickPhase, ctx: &TickContext, world: &mut W) {
        if self.config.should_think(ctx.tick) {
            self.policy.tick(phase, ctx, self.agent, world);
        }
    }
}

/// Tick every brain for `phase` in stable agent order.
pub fn tick_brains<W>(phase: TickPhase, ctx: &TickContext, world: &mut W, brains: &mut [Brain<W>])
where
    W: WorldMut + 'static,
{
    brains.sort_by_key(|b| b.agent.stable_id());
    for brain in brains.iter_mut() {
        brain.tick(phase, ctx, world);
    }
}
