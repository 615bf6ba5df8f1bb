use core::fmt::Debug;

/// Stable identifier for an agent.
///
/// Deterministic simulation requires a stable ordering (`Ord`) and a stable numeric id for
/// seeding and trace output.
pub trait AgentId: Copy + Ord + Eq + Debug {
    fn stable_id(self) -> u64;
}

macro_rules! impl_agent_id {
    ($($t:ty),*) => {
        $(
            impl AgentId for $t {
                fn stable_id(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_agent_id!(u16, u32, u64, usize);

/// Read-only host access.
///
/// The interpreter never calls host APIs itself. Leaf nodes reach the host (movement, animation,
/// physics queries, ...) through this type, so the host decides which capabilities it exposes by
/// adding methods or extension traits on its own world type.
pub trait WorldView {
    type Agent: AgentId;
}

/// Write access / effect sink.
pub trait WorldMut: WorldView {}
