//! Deterministic, engine-agnostic AI kernel primitives.
//!
//! Tick and RNG plumbing shared by the decision layers, plus the typed value/variable model that
//! behaviour graphs bind their fields to.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod brain;
pub mod error;
pub mod rng;
pub mod tick;
pub mod value;
pub mod variable;
pub mod world;

pub use brain::{tick_brains, Brain, BrainConfig, Policy};
pub use error::VariableError;
pub use rng::{pick_weighted, DeterministicRng, SplitMix64};
pub use tick::{TickContext, TickPhase};
pub use value::{HostObject, Value, VarType, Vec2, Vec3};
pub use variable::{GlobalVariables, VarField, VarId, VarRef, VarScope, Variable, VariableTable};
pub use world::{AgentId, WorldMut, WorldView};
