//! Umbrella crate that re-exports the `ai-*` building blocks.
//!
//! `ai::bt` is the behaviour-graph interpreter; `ai::core` holds the tick, RNG, variable and
//! brain primitives it runs on, and `ai::tools` the deterministic trace events it emits.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use ai_core as core;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use ai_tools as tools;

#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub use ai_bt as bt;

/// Commonly used items, for `use ai::prelude::*`.
#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub mod prelude {
    pub use ai_bt::{
        Action, ActionStatus, Determine, ErrorPolicy, Node, NodeCtx, NodeFault, NodeKind, Prototype,
        TreeBuilder, TreeConfig, TreeError, TreeInstance, TreeStatus,
    };
    pub use ai_core::{
        Brain, GlobalVariables, TickContext, TickPhase, Value, VarField, VarId, VarType, Variable,
        WorldMut, WorldView,
    };
}
